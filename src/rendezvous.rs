// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A cyclic barrier that also reduces.  Every participant arrives with
//! its local maximum; when the last one arrives, all of them are
//! released together holding the global maximum.  A participant that
//! waits longer than the timeout breaks the barrier, and a broken
//! barrier stays broken: everybody already waiting, and everybody who
//! arrives later, gets an error instead of a value.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// The accumulator's value before anyone has arrived.  Every local
/// maximum the tone mapper produces is at least zero.
pub const SENTINEL: f64 = -1.0;

/// Why a wait did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Broken {
    /// This participant gave up waiting and broke the barrier.
    TimedOut,
    /// Somebody else broke the barrier, or it was aborted.
    Aborted,
}

#[derive(Debug)]
struct State {
    arrived: usize,
    generation: u64,
    accumulator: f64,
    released: f64,
    broken: bool,
}

/// A reusable max-reducing barrier for a fixed number of participants.
#[derive(Debug)]
pub struct Rendezvous {
    parties: usize,
    timeout: Duration,
    state: Mutex<State>,
    released: Condvar,
}

impl Rendezvous {
    /// A barrier for `parties` participants, each of which will wait at
    /// most `timeout` for the others.
    pub fn new(parties: usize, timeout: Duration) -> Self {
        assert!(parties > 0, "a rendezvous needs at least one party");
        Rendezvous {
            parties,
            timeout,
            state: Mutex::new(State {
                arrived: 0,
                generation: 0,
                accumulator: SENTINEL,
                released: SENTINEL,
                broken: false,
            }),
            released: Condvar::new(),
        }
    }

    // A participant that panicked while holding the lock can only have
    // been inside this module, and every critical section here leaves
    // the state consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arrive with a local value and block until every participant has
    /// arrived.  Returns the largest value any of them brought.
    pub fn wait(&self, local: f64) -> Result<f64, Broken> {
        let mut state = self.lock();
        if state.broken {
            return Err(Broken::Aborted);
        }
        if local > state.accumulator {
            state.accumulator = local;
        }
        state.arrived += 1;

        if state.arrived == self.parties {
            state.released = state.accumulator;
            state.accumulator = SENTINEL;
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            let global = state.released;
            drop(state);
            self.released.notify_all();
            return Ok(global);
        }

        let generation = state.generation;
        let (mut state, timeout) = self
            .released
            .wait_timeout_while(state, self.timeout, |s| {
                s.generation == generation && !s.broken
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.generation != generation {
            return Ok(state.released);
        }
        if state.broken {
            return Err(Broken::Aborted);
        }
        debug_assert!(timeout.timed_out());
        state.broken = true;
        drop(state);
        self.released.notify_all();
        Err(Broken::TimedOut)
    }

    /// Break the barrier from outside, releasing every waiter with an
    /// error.
    pub fn abort(&self) {
        self.lock().broken = true;
        self.released.notify_all();
    }

    /// True once a wait has timed out or the barrier was aborted.
    pub fn is_broken(&self) -> bool {
        self.lock().broken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const LONG: Duration = Duration::from_secs(10);

    #[test]
    fn single_party_passes_straight_through() {
        let barrier = Rendezvous::new(1, LONG);
        assert_eq!(barrier.wait(2.5), Ok(2.5));
        assert_eq!(barrier.wait(0.5), Ok(0.5));
    }

    #[test]
    fn everyone_receives_the_global_maximum() {
        let barrier = Rendezvous::new(4, LONG);
        let results = crossbeam::scope(|spawner| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let barrier = &barrier;
                    spawner.spawn(move |_| barrier.wait(i as f64))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        })
        .unwrap();
        assert_eq!(results, vec![Ok(3.0); 4]);
    }

    #[test]
    fn generations_do_not_leak_into_each_other() {
        let barrier = Rendezvous::new(2, LONG);
        let results = crossbeam::scope(|spawner| {
            let barrier = &barrier;
            let a = spawner.spawn(move |_| (barrier.wait(5.0), barrier.wait(1.0)));
            let b = spawner.spawn(move |_| (barrier.wait(2.0), barrier.wait(0.0)));
            (a.join().unwrap(), b.join().unwrap())
        })
        .unwrap();
        assert_eq!(results.0, (Ok(5.0), Ok(1.0)));
        assert_eq!(results.1, (Ok(5.0), Ok(1.0)));
    }

    #[test]
    fn a_missing_party_breaks_the_barrier_for_everyone() {
        let barrier = Rendezvous::new(3, Duration::from_millis(50));
        let results = crossbeam::scope(|spawner| {
            let barrier = &barrier;
            let early: Vec<_> = (0..2)
                .map(|_| spawner.spawn(move |_| barrier.wait(1.0)))
                .collect();
            let late = spawner.spawn(move |_| {
                sleep(Duration::from_millis(300));
                barrier.wait(9.0)
            });
            let mut results: Vec<_> = early.into_iter().map(|h| h.join().unwrap()).collect();
            results.push(late.join().unwrap());
            results
        })
        .unwrap();
        assert!(results.iter().all(|r| r.is_err()));
        assert!(results.contains(&Err(Broken::TimedOut)));
        assert_eq!(results[2], Err(Broken::Aborted));
        assert!(barrier.is_broken());
    }

    #[test]
    fn abort_releases_waiters() {
        let barrier = Rendezvous::new(2, LONG);
        let result = crossbeam::scope(|spawner| {
            let barrier = &barrier;
            let waiter = spawner.spawn(move |_| barrier.wait(1.0));
            sleep(Duration::from_millis(50));
            barrier.abort();
            waiter.join().unwrap()
        })
        .unwrap();
        assert_eq!(result, Err(Broken::Aborted));
    }
}
