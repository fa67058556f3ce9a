//! Reduce raw traces to the scalar leakage the attack correlates against.
use ndarray::{Array1, ArrayView1, ArrayView2};
use num_traits::AsPrimitive;
use std::ops::Range;

use crate::util::Progress;

/// Selects the most negative-going excursion in the last part of a trace, where the last round
/// of the cipher is expected to run.
///
/// The leakage is returned negated: it is the maximum of the negated samples. Correlation signs
/// downstream rely on this convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRoundPeak {
    /// The window is the last `1 / window_divisor` of the trace
    window_divisor: usize,
}

impl LastRoundPeak {
    /// # Panics
    /// Panic if `window_divisor` is 0.
    pub fn new(window_divisor: usize) -> Self {
        assert!(window_divisor > 0);

        Self { window_divisor }
    }

    /// Return the range of samples searched in a trace of `num_samples` samples.
    ///
    /// The window holds at least one sample.
    pub fn window(&self, num_samples: usize) -> Range<usize> {
        let round_size = (num_samples / self.window_divisor).max(1);

        num_samples.saturating_sub(round_size)..num_samples
    }

    /// Return the leakage value of a trace.
    ///
    /// # Panics
    /// Panic if `trace` is empty.
    pub fn apply<T: AsPrimitive<f32>>(&self, trace: ArrayView1<T>) -> f32 {
        let window = self.window(trace.len());

        let mut max = -trace[window.start].as_();
        for i in window {
            let x = -trace[i].as_();
            if max < x {
                max = x;
            }
        }

        max
    }
}

impl Default for LastRoundPeak {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Compute the leakage value of every trace.
pub fn leakages<T: AsPrimitive<f32>>(
    traces: ArrayView2<T>,
    extractor: &LastRoundPeak,
    progress: &dyn Progress,
) -> Array1<f32> {
    progress.start("Selecting power points", traces.shape()[0]);
    let leakages = traces
        .rows()
        .into_iter()
        .map(|trace| {
            let leakage = extractor.apply(trace);
            progress.inc(1);
            leakage
        })
        .collect();
    progress.finish();

    leakages
}
