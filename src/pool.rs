// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs one scoped thread per work item and waits for all of them
//! against a deadline.
//!
//! Each worker reports on a channel when it finishes, or when it dies,
//! so the coordinator learns about a panic straight away instead of at
//! the deadline.  When the deadline passes or a worker dies, the
//! coordinator calls `abort` (which is how the caller tells its workers
//! to stop) and then joins everybody; the scope guarantees no worker
//! outlives the call.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::panic::resume_unwind;
use std::thread;
use std::time::{Duration, Instant};

/// Why the pool did not produce a result for every item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolError {
    /// Not every worker reported before the deadline.
    TimedOut,
    /// The worker with this index panicked.
    Panicked(usize),
}

// Reports a worker's end, including an end by unwinding.
struct Finished {
    index: usize,
    done: Sender<(usize, bool)>,
}

impl Drop for Finished {
    fn drop(&mut self) {
        let _ = self.done.send((self.index, !thread::panicking()));
    }
}

enum Waited {
    AllDone,
    TimedOut,
    Died,
}

fn wait_for(done: &Receiver<(usize, bool)>, workers: usize, timeout: Duration) -> Waited {
    let deadline = Instant::now().checked_add(timeout);
    for _ in 0..workers {
        let message = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                done.recv_timeout(left)
            }
            None => done.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match message {
            Ok((_, true)) => {}
            Ok((_, false)) | Err(RecvTimeoutError::Disconnected) => return Waited::Died,
            Err(RecvTimeoutError::Timeout) => return Waited::TimedOut,
        }
    }
    Waited::AllDone
}

/// Run `work(index, item)` for every item on its own thread.  Returns
/// the results in item order, or the reason some are missing.
pub fn run<I, T, W, A>(
    items: Vec<I>,
    timeout: Duration,
    abort: A,
    work: W,
) -> Result<Vec<T>, PoolError>
where
    I: Send,
    T: Send,
    W: Fn(usize, I) -> T + Sync,
    A: Fn(),
{
    let workers = items.len();
    let (done_tx, done_rx) = channel::unbounded();
    let (waited, joined) = crossbeam::scope(|spawner| {
        let work = &work;
        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let finished = Finished {
                    index,
                    done: done_tx.clone(),
                };
                spawner.spawn(move |_| {
                    let _finished = finished;
                    work(index, item)
                })
            })
            .collect();
        drop(done_tx);

        let waited = wait_for(&done_rx, workers, timeout);
        match waited {
            Waited::AllDone => {}
            _ => abort(),
        }
        let joined: Vec<thread::Result<T>> = handles.into_iter().map(|h| h.join()).collect();
        (waited, joined)
    })
    .unwrap_or_else(|panic| resume_unwind(panic));

    let mut results = Vec::with_capacity(workers);
    for (index, outcome) in joined.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(result),
            Err(_) => return Err(PoolError::Panicked(index)),
        }
    }
    match waited {
        Waited::TimedOut => Err(PoolError::TimedOut),
        _ => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::sleep;

    const LONG: Duration = Duration::from_secs(10);

    #[test]
    fn results_come_back_in_item_order() {
        let results = run(vec![3, 1, 2], LONG, || {}, |index, item| (index, item * 10));
        assert_eq!(results, Ok(vec![(0, 30), (1, 10), (2, 20)]));
    }

    #[test]
    fn the_deadline_aborts_and_reports_a_timeout() {
        let stop = AtomicBool::new(false);
        let results = run(
            vec![(); 2],
            Duration::from_millis(50),
            || stop.store(true, Ordering::SeqCst),
            |_, _| {
                while !stop.load(Ordering::SeqCst) {
                    sleep(Duration::from_millis(5));
                }
            },
        );
        assert_eq!(results, Err(PoolError::TimedOut));
    }

    #[test]
    fn a_panicking_worker_is_named() {
        let aborted = AtomicBool::new(false);
        let results = run(
            vec![0, 1, 2],
            LONG,
            || aborted.store(true, Ordering::SeqCst),
            |_, item| {
                if item == 1 {
                    panic!("worker one fails");
                }
                item
            },
        );
        assert_eq!(results, Err(PoolError::Panicked(1)));
        assert!(aborted.load(Ordering::SeqCst));
    }
}
