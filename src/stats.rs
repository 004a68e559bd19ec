//! Statistics over the metrics held by a window.
//!
//! [`Statistics`] supplies every accessor as a default method on top of two
//! primitives: an iterator over the metrics in arrival order and their count.
//! The base [`Window`](crate::Window) buffer and the owned [`WindowStats`]
//! snapshot both implement it, so the same arithmetic serves live buffers and
//! copies taken across a lock.
//!
//! All accessors are read-only: repeated calls without an intervening write
//! return identical results.
//!
//! # Empty windows
//!
//! - `sum`, `mean`, `percentile` and `median` return `0.0`.
//! - `variance` and `std_dev` return `NaN` (a `0 / 0`); check [`Statistics::count`]
//!   first when a window may be empty.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Running statistics over an ordered set of metrics.
pub trait Statistics {
    /// Metrics in arrival order.
    fn metrics(&self) -> impl Iterator<Item = f64> + '_;

    /// Number of samples currently held.
    fn count(&self) -> usize;

    fn sum(&self) -> f64 {
        self.metrics().sum()
    }

    /// Arithmetic mean; `0.0` for an empty window.
    #[allow(clippy::cast_precision_loss)]
    fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum() / n as f64,
        }
    }

    /// Population variance (divides by `N`); `NaN` for an empty window.
    #[allow(clippy::cast_precision_loss)]
    fn variance(&self) -> f64 {
        let mean = self.mean();
        let squares: f64 = self.metrics().map(|x| (x - mean).powi(2)).sum();
        squares / self.count() as f64
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Ascending copy of the metrics. The window itself keeps arrival order.
    fn sorted(&self) -> Vec<f64> {
        let mut values: Vec<OrderedFloat<f64>> = self.metrics().map(OrderedFloat).collect();
        values.sort_unstable();
        values.into_iter().map(|v| v.0).collect()
    }

    /// Fractional rank of the `p`th percentile: `(p / 100) * N + 0.5`.
    #[allow(clippy::cast_precision_loss)]
    fn rank(&self, p: f64) -> f64 {
        (p / 100.0) * self.count() as f64 + 0.5
    }

    /// The `p`th percentile, interpolated between the nearest ranks around
    /// [`rank`](Statistics::rank). `p` is clamped into `[0, 100]`.
    fn percentile(&self, p: f64) -> f64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        interpolate(&self.sorted(), self.rank(p))
    }

    fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    /// All headline statistics in one record.
    fn summary(&self) -> Summary {
        Summary {
            count: self.count(),
            sum: self.sum(),
            mean: self.mean(),
            variance: self.variance(),
            std_dev: self.std_dev(),
            median: self.median(),
        }
    }
}

/// Linear interpolation between `sorted[floor]` and `sorted[ceil]` where the
/// bracket is `[floor(r - 1), ceil(r + 1)]` around `r = rank - 1`, clamped to
/// the slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn interpolate(sorted: &[f64], rank: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let rank = rank - 1.0;
    if rank == 1.0 || rank == n as f64 {
        return sorted[rank as usize - 1];
    }

    let last = (n - 1) as f64;
    let floor = (rank - 1.0).floor().clamp(0.0, last);
    let ceil = (rank + 1.0).ceil().clamp(0.0, last);
    let (lo, hi) = (sorted[floor as usize], sorted[ceil as usize]);
    if ceil == floor {
        return lo;
    }
    lo + (hi - lo) * ((rank - floor) / (ceil - floor))
}

/// Headline statistics of a window at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub median: f64,
}

/// Owned copy of a window's metrics in arrival order.
///
/// Returned by [`WindowPolicy::stats`](crate::WindowPolicy::stats) so that
/// statistics can be computed without holding on to the window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowStats {
    values: Vec<f64>,
}

impl WindowStats {
    #[must_use]
    pub const fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Metrics in arrival order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<f64> for WindowStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Statistics for WindowStats {
    fn metrics(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    fn count(&self) -> usize {
        self.values.len()
    }
}
