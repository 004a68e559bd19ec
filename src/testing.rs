//! Testing utilities for code built on windows and averages.
//!
//! - [`SampleBuilder`]: fluent construction of sample sequences
//! - [`write_all`]: feed a sequence into any [`WindowPolicy`]
//! - [`collect_events`] / [`drain`]: read what an [`Output::channel`] received
//! - [`assert_metrics_approx_eq`]: float-tolerant comparison of metric series
//!
//! Deterministic time comes from [`ManualClock`](crate::ManualClock) and
//! [`ManualTimer`](crate::ManualTimer).
//!
//! ```
//! use window_stats::testing::*;
//! use window_stats::{EventWindow, Statistics};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut win = EventWindow::sliding(10)?;
//! write_all(&mut win, SampleBuilder::new().add_metrics(&[15.0, 20.0, 35.0, 40.0, 50.0]).build())?;
//! assert_eq!(win.window().sum(), 160.0);
//! # Ok(())
//! # }
//! ```
//!
//! [`Output::channel`]: crate::Output::channel

use crate::output::Event;
use crate::sample::Sample;
use crate::window::{TimestampMs, WindowPolicy};
use anyhow::Result;
use std::sync::mpsc::Receiver;

pub use crate::output::drain;

/// A fluent builder for sample sequences.
///
/// ```
/// use window_stats::testing::SampleBuilder;
///
/// let data = SampleBuilder::new()
///     .add_range(1..=3)
///     .add_repeated(9.0, 2)
///     .add_timed(1_000, 4.0)
///     .build();
///
/// assert_eq!(data.len(), 6);
/// assert_eq!(data[5].time, Some(1_000));
/// ```
#[derive(Debug, Default)]
pub struct SampleBuilder {
    data: Vec<Sample>,
}

impl SampleBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    #[must_use]
    pub fn add_metric(mut self, metric: f64) -> Self {
        self.data.push(Sample::new(metric));
        self
    }

    #[must_use]
    pub fn add_metrics(mut self, metrics: &[f64]) -> Self {
        self.data.extend(metrics.iter().copied().map(Sample::new));
        self
    }

    /// Add one sample per integer in `range`.
    #[must_use]
    pub fn add_range(mut self, range: std::ops::RangeInclusive<i32>) -> Self {
        self.data.extend(range.map(|i| Sample::new(f64::from(i))));
        self
    }

    #[must_use]
    pub fn add_repeated(mut self, metric: f64, count: usize) -> Self {
        self.data.extend(std::iter::repeat_n(Sample::new(metric), count));
        self
    }

    /// Add a sample with an explicit observation time.
    #[must_use]
    pub fn add_timed(mut self, time: TimestampMs, metric: f64) -> Self {
        self.data.push(Sample::new(metric).with_time(time));
        self
    }

    /// Add an arbitrary sample.
    #[must_use]
    pub fn add_sample(mut self, sample: Sample) -> Self {
        self.data.push(sample);
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<Sample> {
        self.data
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Plain samples for `metrics`, in order.
#[must_use]
pub fn samples(metrics: &[f64]) -> Vec<Sample> {
    SampleBuilder::new().add_metrics(metrics).build()
}

/// Write every sample into `window`, stopping at the first error.
///
/// # Errors
///
/// The first error returned by [`WindowPolicy::write`].
pub fn write_all<W, I>(window: &mut W, samples: I) -> Result<()>
where
    W: WindowPolicy + ?Sized,
    I: IntoIterator<Item = Sample>,
{
    samples.into_iter().try_for_each(|s| window.write(s))
}

/// Every event currently queued on `rx`, including a trailing
/// [`Event::End`].
pub fn collect_events<T>(rx: &Receiver<Event<T>>) -> Vec<Event<T>> {
    rx.try_iter().collect()
}

/// Assert two metric series are equal within `epsilon`, element by element.
///
/// # Panics
///
/// Panics if the series differ in length or any pair differs by more than
/// `epsilon`.
///
/// ```
/// use window_stats::testing::assert_metrics_approx_eq;
///
/// assert_metrics_approx_eq(&[0.1 + 0.2, 1.0], &[0.3, 1.0], 1e-12);
/// ```
pub fn assert_metrics_approx_eq(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Series length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= epsilon,
            "Series mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}\n  Full expected: {expected:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Metrics of emitted records, for comparing against expected series.
#[must_use]
pub fn metrics_of(records: &[Sample]) -> Vec<f64> {
    records.iter().map(|r| r.metric).collect()
}
