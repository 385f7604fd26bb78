// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;

use criterion::Criterion;
use flame::{
    apply_tone_mapping, render, DensityCanvas, GammaLogCorrection, RenderOptions, SeedSource,
    Stage, Timeouts, Transformation, Variation, WorldRect,
};
use std::time::Duration;

fn transformations() -> Vec<Box<dyn Transformation>> {
    vec![
        Box::new(Variation::Heart),
        Box::new(Variation::Sinusoidal),
        Box::new(Variation::Swirl),
    ]
}

fn options() -> RenderOptions {
    RenderOptions {
        seeds: SeedSource::Fixed(1),
        timeout: Duration::from_secs(600),
    }
}

fn bench_render(c: &mut Criterion) {
    c.bench_function_over_inputs(
        "render 200k samples",
        |b, &&threads| {
            let transformations = transformations();
            b.iter(|| {
                let canvas = DensityCanvas::new(320, 180).unwrap();
                render(
                    &canvas,
                    WorldRect::default(),
                    &transformations,
                    200_000,
                    50,
                    threads,
                    &options(),
                )
                .unwrap()
            })
        },
        &[1, 4],
    );
}

fn bench_tonemap(c: &mut Criterion) {
    let transformations = transformations();
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(GammaLogCorrection::default())];
    c.bench_function_over_inputs(
        "tone map 1920x1080",
        move |b, &&threads| {
            let mut canvas = DensityCanvas::new(1920, 1080).unwrap();
            render(
                &canvas,
                WorldRect::default(),
                &transformations,
                500_000,
                50,
                4,
                &options(),
            )
            .unwrap();
            b.iter(|| {
                apply_tone_mapping(&mut canvas, &stages, threads, &Timeouts::default()).unwrap()
            })
        },
        &[1, 4],
    );
}

criterion_group!(benches, bench_render, bench_tonemap);
criterion_main!(benches);
