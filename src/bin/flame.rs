// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error, ResultExt};
use flame::config::{
    DEFAULT_OUTPUT, GAMMA, MAX_HEIGHT, MAX_SAMPLES, MAX_THREADS, MAX_TIMEOUT, MAX_WIDTH,
    WARMUP_ITERATIONS, WORLD_HEIGHT, WORLD_WIDTH, WORLD_X, WORLD_Y,
};
use flame::{render_flame, FlameConfig, SeedSource, Transformation, Variation, WorldRect};
use image::ColorType;
use itertools::Itertools;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_size(s: &str) -> Result<(), String> {
    match parse_pair::<usize>(s, 'x') {
        Some((w, h)) if w >= 1 && w <= MAX_WIDTH && h >= 1 && h <= MAX_HEIGHT => Ok(()),
        Some(_) => Err(format!(
            "Image size must be between 1x1 and {}x{}",
            MAX_WIDTH, MAX_HEIGHT
        )),
        None => Err("Could not parse output image size".to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const SAMPLES: &str = "samples";
const WARMUP: &str = "warmup";
const THREADS: &str = "threads";
const ORIGIN: &str = "origin";
const EXTENT: &str = "extent";
const VARIATIONS: &str = "variations";
const GAMMA_ARG: &str = "gamma";
const FLOOR: &str = "floor";
const SEED: &str = "seed";
const TIMEOUT: &str = "timeout";

fn args<'a>(defaults: &'a Defaults) -> ArgMatches<'a> {
    App::new("flame")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Fractal flame renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value(DEFAULT_OUTPUT)
                .help("Output file; the extension picks the format"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_size(&s))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(SAMPLES)
                .long(SAMPLES)
                .short("n")
                .takes_value(true)
                .default_value("1000000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_SAMPLES,
                        "Could not parse sample count",
                        &format!("Sample count must be between 1 and {}", MAX_SAMPLES),
                    )
                })
                .help("Number of points to plot"),
        )
        .arg(
            Arg::with_name(WARMUP)
                .long(WARMUP)
                .short("w")
                .takes_value(true)
                .default_value(&defaults.warmup)
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        10_000,
                        "Could not parse warm-up count",
                        "Warm-up count must be between 0 and 10000",
                    )
                })
                .help("Steps each walk takes before it starts plotting"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value(&defaults.threads)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of threads to use in each stage"),
        )
        .arg(
            Arg::with_name(ORIGIN)
                .long(ORIGIN)
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value(&defaults.origin)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse world origin"))
                .help("Corner of the world that maps to the first pixel"),
        )
        .arg(
            Arg::with_name(EXTENT)
                .long(EXTENT)
                .takes_value(true)
                .default_value(&defaults.extent)
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse world extent"))
                .help("Width and height of the world"),
        )
        .arg(
            Arg::with_name(VARIATIONS)
                .long("variation")
                .short("x")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .required(true)
                .possible_values(&defaults.variations)
                .help("A transformation to include; repeat to add more"),
        )
        .arg(
            Arg::with_name(GAMMA_ARG)
                .long(GAMMA_ARG)
                .short("g")
                .takes_value(true)
                .default_value(&defaults.gamma)
                .validator(|s| {
                    validate_range(
                        &s,
                        0.1,
                        10.0,
                        "Could not parse gamma",
                        "Gamma must be between 0.1 and 10",
                    )
                })
                .help("Display gamma"),
        )
        .arg(
            Arg::with_name(FLOOR)
                .long(FLOOR)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0.0,
                        1.0,
                        "Could not parse noise floor",
                        "Noise floor must be between 0 and 1",
                    )
                })
                .help("Black out pixels dimmer than this fraction of the brightest"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .validator(|s| {
                    u64::from_str(&s)
                        .map(|_| ())
                        .map_err(|_| "Could not parse seed".to_string())
                })
                .help("Fixed random seed, for reproducible renders"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .long(TIMEOUT)
                .takes_value(true)
                .default_value(&defaults.timeout)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        24 * 60 * 60,
                        "Could not parse timeout",
                        "Timeout must be between 1 and 86400 seconds",
                    )
                })
                .help("Seconds each stage may run before the render is abandoned"),
        )
        .get_matches()
}

// Default values clap borrows for the lifetime of the matches.
struct Defaults {
    warmup: String,
    threads: String,
    origin: String,
    extent: String,
    gamma: String,
    timeout: String,
    variations: Vec<&'static str>,
}

impl Defaults {
    fn new() -> Self {
        Defaults {
            warmup: WARMUP_ITERATIONS.to_string(),
            threads: num_cpus::get().min(MAX_THREADS).to_string(),
            origin: format!("{},{}", WORLD_X, WORLD_Y),
            extent: format!("{},{}", WORLD_WIDTH, WORLD_HEIGHT),
            gamma: GAMMA.to_string(),
            timeout: MAX_TIMEOUT.as_secs().to_string(),
            variations: Variation::names(),
        }
    }
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, Error> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing value for --{}", name))?;
    T::from_str(raw).map_err(|_| format_err!("could not parse --{} value '{}'", name, raw))
}

fn pair<T: FromStr>(matches: &ArgMatches, name: &str, separator: char) -> Result<(T, T), Error> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing value for --{}", name))?;
    parse_pair(raw, separator)
        .ok_or_else(|| format_err!("could not parse --{} value '{}'", name, raw))
}

fn configure(matches: &ArgMatches) -> Result<(FlameConfig, Vec<Variation>), Error> {
    let (width, height) = pair::<usize>(matches, SIZE, 'x')?;
    let (x, y) = pair::<f64>(matches, ORIGIN, ',')?;
    let (world_width, world_height) = pair::<f64>(matches, EXTENT, ',')?;
    let world = WorldRect::new(x, y, world_width, world_height)?;

    let variations = matches
        .values_of(VARIATIONS)
        .ok_or_else(|| format_err!("at least one --variation is required"))?
        .map(|name| Variation::from_str(name).map_err(|e| format_err!("{}", e)))
        .collect::<Result<Vec<_>, _>>()?;

    let seeds = match matches.value_of(SEED) {
        Some(_) => SeedSource::Fixed(value(matches, SEED)?),
        None => SeedSource::Time,
    };
    let noise_floor = match matches.value_of(FLOOR) {
        Some(_) => Some(value(matches, FLOOR)?),
        None => None,
    };

    let config = FlameConfig {
        width,
        height,
        samples: value(matches, SAMPLES)?,
        warmup: value(matches, WARMUP)?,
        threads: value(matches, THREADS)?,
        world,
        gamma: value(matches, GAMMA_ARG)?,
        noise_floor,
        seeds,
        timeout: Duration::from_secs(value(matches, TIMEOUT)?),
    };
    Ok((config, variations))
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), Error> {
    let path = Path::new(outfile);
    image::save_buffer(path, pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))
        .with_context(|_| format!("could not write {}", outfile))?;
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let (config, variations) = configure(matches)?;
    let output = matches.value_of(OUTPUT).unwrap_or(DEFAULT_OUTPUT);
    info!(
        width = config.width,
        height = config.height,
        samples = config.samples,
        threads = config.threads,
        variations = %variations.iter().join(", "),
        "image is generating"
    );

    let transformations: Vec<Box<dyn Transformation>> = variations
        .into_iter()
        .map(|v| Box::new(v) as Box<dyn Transformation>)
        .collect();
    let (canvas, _) = render_flame(&config, &transformations)?;

    write_image(output, &canvas.to_luma8(), (canvas.width(), canvas.height()))?;
    info!(output, "image generated successfully");
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let defaults = Defaults::new();
    let matches = args(&defaults);
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        for cause in e.iter_causes() {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
