// barrier.rs -- Reusable stage barrier with cooperative shutdown.
//
// A frame passes four barriers. Every worker arrives at each one, and the
// last arrival releases the whole generation:
//
//   worker 0 (controller) ──acquire──▶│──gray──▶│──edge──▶│──publish──▶│
//   worker 1              ───────────▶│──gray──▶│──edge──▶│───────────▶│
//                                    B1        B2        B3           B4
//
// Shutdown is a flag, not an extra pass. The controller raises it and then
// arrives as usual. The arrival that completes the generation reads the
// flag once and every party of that generation gets the same answer, so
// nobody is left waiting on a barrier the others have abandoned.
//
// abort() is the unwind path: it wakes all current waiters and makes every
// later wait return at once, so one panicking worker cannot deadlock the
// rest.
//
// NEW RUST CONCEPTS:
// - parking_lot::Condvar::wait takes `&mut MutexGuard` instead of consuming
//   it, so the wait loop keeps the same guard variable.
// - #[must_use] on Release makes ignoring a shutdown a compiler warning.

use parking_lot::{Condvar, Mutex};

/// Outcome of one barrier wait, identical for every party of a generation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Continue with the next stage.
    Proceed,
    /// Leave the frame loop.
    Shutdown,
}

impl Release {
    #[inline]
    pub fn is_shutdown(self) -> bool {
        self == Release::Shutdown
    }
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    shutdown_requested: bool,
    aborted: bool,
    /// Outcome handed to the most recently released generation.
    last_release: Release,
}

/// Barrier for a fixed number of parties, reused for every stage of every
/// frame.
#[derive(Debug)]
pub struct StageBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl StageBarrier {
    /// # Panics
    /// Panics if `parties == 0`.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier needs at least one party");
        StageBarrier {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                shutdown_requested: false,
                aborted: false,
                last_release: Release::Proceed,
            }),
            released: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until all parties have arrived.
    pub fn wait(&self) -> Release {
        let mut state = self.state.lock();
        if state.aborted {
            return Release::Shutdown;
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            state.last_release = if state.shutdown_requested {
                Release::Shutdown
            } else {
                Release::Proceed
            };
            self.released.notify_all();
            return state.last_release;
        }

        while state.generation == generation && !state.aborted {
            self.released.wait(&mut state);
        }
        if state.generation == generation {
            // Woken by abort() before the generation completed.
            Release::Shutdown
        } else {
            // The next generation cannot complete without this party, so
            // last_release still belongs to ours.
            state.last_release
        }
    }

    /// Make the next released generation (and every one after it) return
    /// [`Release::Shutdown`]. The caller must still arrive at that barrier.
    pub fn request_shutdown(&self) {
        self.state.lock().shutdown_requested = true;
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.state.lock().shutdown_requested
    }

    /// Release all current and future waiters with [`Release::Shutdown`].
    pub fn abort(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        state.shutdown_requested = true;
        self.released.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }
}
