//! Deterministic CPU-bound stand-in for per-item processing.

use std::hint::black_box;

/// Burns a fixed amount of floating-point work per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkSimulator {
    workload: u32,
}

impl WorkSimulator {
    /// Simulator performing `workload` iterations per call.
    #[inline]
    #[must_use]
    pub const fn new(workload: u32) -> Self {
        Self { workload }
    }

    /// Iterations performed per call.
    #[inline]
    #[must_use]
    pub const fn workload(&self) -> u32 {
        self.workload
    }

    /// Run the workload once.
    ///
    /// The accumulated value is returned so callers (and tests) can observe
    /// that the work happened; it is the same for every call with the same
    /// workload. A workload of zero does nothing.
    #[inline]
    pub fn simulate(&self) -> f64 {
        let mut acc = 0.0;
        for j in 0..self.workload {
            let q = f64::from(black_box(j)) % 123.0;
            let w = (q + 2.0) / 2.0;
            let e = w * 3.0;
            acc += e + w;
        }
        black_box(acc)
    }
}
