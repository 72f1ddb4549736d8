//! Streaming centroid tracker.
//!
//! Keeps a running componentwise sum and count of every live vector so the
//! graph's entry point can periodically be re-seated near the data medoid
//! without a full scan. Long-run cancellation error is bounded by the
//! magnitude of the surviving vectors and is acceptable here; no
//! compensated summation is used.

use std::sync::Mutex;

const DEFAULT_INTERVAL: u64 = 10_000;

#[derive(Debug)]
struct MedoidState {
    sum: Vec<f32>,
    n: u64,
    countdown: u64,
}

/// Running `(Σx, n)` over the live vector multiset, with a countdown that
/// signals when the entry point should be recomputed.
///
/// `add`/`sub`/`centroid` serialize on an internal mutex so concurrent
/// writers above may call in; the critical sections are O(dims).
#[derive(Debug)]
pub struct StreamingMedoid {
    interval: u64,
    state: Mutex<MedoidState>,
}

impl StreamingMedoid {
    /// Create a tracker for `dims`-dimensional vectors. `recompute_every`
    /// of 0 selects the default interval of 10 000 mutations.
    #[must_use]
    pub fn new(dims: usize, recompute_every: u64) -> Self {
        let interval = if recompute_every == 0 {
            DEFAULT_INTERVAL
        } else {
            recompute_every
        };
        Self {
            interval,
            state: Mutex::new(MedoidState {
                sum: vec![0.0; dims],
                n: 0,
                countdown: interval,
            }),
        }
    }

    /// Fold a newly inserted vector into the running sum.
    pub fn add(&self, x: &[f32]) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert_eq!(x.len(), state.sum.len());
        for (s, v) in state.sum.iter_mut().zip(x) {
            *s += v;
        }
        state.n += 1;
        state.countdown = state.countdown.saturating_sub(1);
    }

    /// Remove a physically deleted vector from the running sum.
    pub fn sub(&self, x: &[f32]) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert_eq!(x.len(), state.sum.len());
        for (s, v) in state.sum.iter_mut().zip(x) {
            *s -= v;
        }
        state.n -= 1;
        state.countdown = state.countdown.saturating_sub(1);
    }

    /// True when the countdown has fired and a recompute is due.
    #[must_use]
    pub fn should_recompute(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .countdown
            == 0
    }

    /// Current centroid `Σx / n`; resets the countdown.
    #[must_use]
    pub fn centroid(&self) -> Vec<f32> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert!(state.n > 0);
        let scale = 1.0 / state.n as f32;
        let c = state.sum.iter().map(|s| s * scale).collect();
        state.countdown = self.interval;
        c
    }

    /// Number of live vectors currently folded into the sum.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).n
    }

    /// Snapshot of the running componentwise sum.
    #[must_use]
    pub fn sum(&self) -> Vec<f32> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sum
            .clone()
    }
}
