//! Running sum over any window.

use crate::metrics::{MetricsCollector, OUTPUTS_EMITTED, RecordExt, Recorder, SAMPLES_WRITTEN};
use crate::output::Output;
use crate::sample::Sample;
use crate::stats::{Statistics, WindowStats};
use crate::window::WindowPolicy;
use anyhow::Result;
use tracing::trace;

/// Wraps a window and re-emits each written sample with `metric` replaced by
/// the wrapped window's current sum. Every other field passes through.
///
/// The wrapped window still emits on its own output, if it has one.
///
/// ```
/// use window_stats::{EventWindow, Output, Sample, WindowPolicy, WindowSum};
/// use window_stats::output::drain;
///
/// # fn main() -> anyhow::Result<()> {
/// let (out, rx) = Output::channel();
/// let mut sum = WindowSum::new(EventWindow::sliding(2)?).with_output(out);
/// for m in [1.0, 2.0, 3.0] {
///     sum.write(Sample::new(m).with_field("host", "a"))?;
/// }
/// let sums: Vec<f64> = drain(&rx).iter().map(|s| s.metric).collect();
/// assert_eq!(sums, vec![1.0, 3.0, 5.0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WindowSum<W: WindowPolicy> {
    window: W,
    last: Option<Sample>,
    output: Output<Sample>,
    metrics: Option<Recorder>,
}

impl<W: WindowPolicy> WindowSum<W> {
    pub fn new(window: W) -> Self {
        Self {
            window,
            last: None,
            output: Output::discard(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Output<Sample>) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, collector: MetricsCollector, label: impl Into<String>) -> Self {
        self.metrics = Some(Recorder::new(collector, label));
        self
    }

    /// The wrapped window.
    pub const fn window(&self) -> &W {
        &self.window
    }

    /// The last emitted record.
    pub const fn last(&self) -> Option<&Sample> {
        self.last.as_ref()
    }

    /// Unwrap into the inner window.
    pub fn into_inner(self) -> W {
        self.window
    }

    /// Current sum of the wrapped window.
    pub fn sum(&self) -> f64 {
        self.window.stats().sum()
    }
}

impl<W: WindowPolicy> WindowPolicy for WindowSum<W> {
    fn write(&mut self, sample: Sample) -> Result<()> {
        self.window.write(sample.clone())?;
        self.metrics.count(SAMPLES_WRITTEN, 1);

        let mut out = sample;
        out.metric = self.sum();
        trace!(sum = out.metric, "window sum emit");
        self.last = Some(out.clone());
        self.output.data(out);
        self.metrics.count(OUTPUTS_EMITTED, 1);
        Ok(())
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.window.snapshot()
    }

    fn stats(&self) -> WindowStats {
        self.window.stats()
    }

    fn len(&self) -> usize {
        self.window.len()
    }

    fn end(&mut self) {
        self.output.end();
    }
}
