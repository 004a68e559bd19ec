//! Simple, weighted and exponential moving averages.
//!
//! A [`MovingAverage`] owns at most one window chosen at construction
//! ([`WindowSource`]) and, on every write, emits the written sample with
//! `metric` replaced by the average and `meta.variance` / `meta.stdDev` taken
//! from the window. Exponential averages run without a window.
//!
//! | kind | value |
//! |---|---|
//! | simple | window mean |
//! | weighted | `Σ metric[i] * weights[i + W - N] / (N (N + 1) / 2)` over the `N` retained samples and `W` weights |
//! | exponential | first write: the raw metric; then `alpha * metric + (1 - alpha) * previous` |
//!
//! ```
//! use window_stats::{Average, MovingAverage, Output, Sample, TimeServices, WindowPolicy, WindowSource};
//! use window_stats::output::drain;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (out, rx) = Output::channel();
//! let mut avg = MovingAverage::new(Average::simple(), WindowSource::Size(3), &TimeServices::system())?
//!     .with_output(out);
//! for m in [3.0, 6.0, 9.0, 12.0] {
//!     avg.write(Sample::new(m))?;
//! }
//! let means: Vec<f64> = drain(&rx).iter().map(|s| s.metric).collect();
//! assert_eq!(means, vec![3.0, 4.5, 6.0, 9.0]);
//! # Ok(())
//! # }
//! ```

use crate::error::WindowError;
use crate::event_window::EventWindow;
use crate::metrics::{MetricsCollector, OUTPUTS_EMITTED, RecordExt, Recorder, SAMPLES_WRITTEN};
use crate::output::Output;
use crate::sample::Sample;
use crate::stats::{Statistics, WindowStats};
use crate::time_window::{TimeServices, TimeWindow};
use crate::window::WindowPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace};

/// Default EWMA decay, `1 - e^(-5/60)`: a one-minute load-average style
/// smoothing constant for five-second samples.
pub const M1_ALPHA: f64 = 0.079_955_585_370_676_71;

/// Averaging algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AverageKind {
    Simple,
    Weighted,
    Exponential,
}

impl FromStr for AverageKind {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "weighted" => Ok(Self::Weighted),
            "exponential" => Ok(Self::Exponential),
            other => Err(WindowError::InvalidAverageType(other.to_string())),
        }
    }
}

impl fmt::Display for AverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Weighted => "weighted",
            Self::Exponential => "exponential",
        })
    }
}

/// Averaging configuration: the kind plus its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Average {
    #[serde(rename = "type")]
    pub kind: AverageKind,
    /// EWMA decay; defaults to [`M1_ALPHA`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    /// Weight table for weighted averages. The last `N` weights apply to the
    /// `N` retained samples, oldest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl Average {
    #[must_use]
    pub const fn simple() -> Self {
        Self { kind: AverageKind::Simple, alpha: None, weights: None }
    }

    #[must_use]
    pub const fn weighted(weights: Vec<f64>) -> Self {
        Self { kind: AverageKind::Weighted, alpha: None, weights: Some(weights) }
    }

    #[must_use]
    pub const fn exponential() -> Self {
        Self { kind: AverageKind::Exponential, alpha: None, weights: None }
    }

    #[must_use]
    pub const fn exponential_with_alpha(alpha: f64) -> Self {
        Self { kind: AverageKind::Exponential, alpha: Some(alpha), weights: None }
    }

    /// Effective EWMA decay.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha.unwrap_or(M1_ALPHA)
    }

    /// Check the parameters the kind requires.
    ///
    /// # Errors
    ///
    /// [`WindowError::MissingWeights`] for a weighted average without weights,
    /// [`WindowError::InvalidAlpha`] for an alpha outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.kind == AverageKind::Weighted
            && self.weights.as_ref().is_none_or(Vec::is_empty)
        {
            return Err(WindowError::MissingWeights.into());
        }
        if let Some(alpha) = self.alpha
            && !(alpha > 0.0 && alpha <= 1.0)
        {
            return Err(WindowError::InvalidAlpha(alpha).into());
        }
        Ok(())
    }
}

impl From<AverageKind> for Average {
    fn from(kind: AverageKind) -> Self {
        Self { kind, alpha: None, weights: None }
    }
}

/// Factory producing the owned window lazily.
pub type WindowFactory = Box<dyn FnOnce() -> Box<dyn WindowPolicy> + Send>;

/// Where a moving average gets its window from.
pub enum WindowSource {
    /// A sliding [`EventWindow`] of this many samples.
    Size(usize),
    /// A sliding [`TimeWindow`] of this duration.
    Duration(Duration),
    /// A caller-built window.
    Window(Box<dyn WindowPolicy>),
    /// A factory invoked once at construction.
    Factory(WindowFactory),
    /// No window; only valid for exponential averages.
    None,
}

impl fmt::Debug for WindowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(n) => f.debug_tuple("Size").field(n).finish(),
            Self::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Self::Window(w) => f.debug_tuple("Window").field(w).finish(),
            Self::Factory(_) => f.write_str("Factory"),
            Self::None => f.write_str("None"),
        }
    }
}

/// The bound the owned window was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Size(usize),
    Duration(Duration),
    Custom,
    Windowless,
}

/// Moving average over an owned window.
#[derive(Debug)]
pub struct MovingAverage {
    average: Average,
    window: Option<Box<dyn WindowPolicy>>,
    bound: Bound,
    last: Option<Sample>,
    output: Output<Sample>,
    metrics: Option<Recorder>,
}

impl MovingAverage {
    /// Build an average of kind `average` over the window from `source`.
    /// Exponential averages never create a window, whatever the source.
    ///
    /// # Errors
    ///
    /// Invalid average parameters (see [`Average::validate`]),
    /// [`WindowError::MissingWindow`] when a non-exponential average gets
    /// [`WindowSource::None`], and window construction errors.
    pub fn new(average: Average, source: WindowSource, services: &TimeServices) -> Result<Self> {
        average.validate()?;

        let (window, bound): (Option<Box<dyn WindowPolicy>>, Bound) =
            if average.kind == AverageKind::Exponential {
                (None, Bound::Windowless)
            } else {
                match source {
                    WindowSource::Size(size) => {
                        (Some(Box::new(EventWindow::sliding(size)?)), Bound::Size(size))
                    }
                    WindowSource::Duration(duration) => (
                        Some(Box::new(TimeWindow::sliding(duration, services)?)),
                        Bound::Duration(duration),
                    ),
                    WindowSource::Window(window) => (Some(window), Bound::Custom),
                    WindowSource::Factory(factory) => (Some(factory()), Bound::Custom),
                    WindowSource::None => {
                        return Err(WindowError::MissingWindow {
                            kind: average.kind.to_string(),
                        }
                        .into());
                    }
                }
            };

        debug!(kind = %average.kind, ?bound, "moving average created");
        Ok(Self {
            average,
            window,
            bound,
            last: None,
            output: Output::discard(),
            metrics: None,
        })
    }

    /// Simple moving average over the last `size` samples.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroSize`] when `size` is zero.
    pub fn simple(size: usize) -> Result<Self> {
        Self::new(Average::simple(), WindowSource::Size(size), &TimeServices::system())
    }

    /// Windowless exponential average.
    ///
    /// # Errors
    ///
    /// [`WindowError::InvalidAlpha`] for an alpha outside `(0, 1]`.
    pub fn exponential(alpha: Option<f64>) -> Result<Self> {
        let average = Average { kind: AverageKind::Exponential, alpha, weights: None };
        Self::new(average, WindowSource::None, &TimeServices::system())
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

    #[must_use]
    pub const fn average(&self) -> &Average {
        &self.average
    }

    /// The owned window, if any.
    #[must_use]
    pub fn window(&self) -> Option<&dyn WindowPolicy> {
        self.window.as_deref()
    }

    /// Count bound, when the window was built from a size.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self.bound {
            Bound::Size(n) => Some(n),
            _ => None,
        }
    }

    /// Time bound, when the window was built from a duration.
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        match self.bound {
            Bound::Duration(d) => Some(d),
            _ => None,
        }
    }

    /// The last emitted record.
    #[must_use]
    pub const fn last(&self) -> Option<&Sample> {
        self.last.as_ref()
    }

    fn window_stats(&self) -> WindowStats {
        self.window.as_ref().map(|w| w.stats()).unwrap_or_default()
    }

    /// The average for `sample` given the current window contents.
    ///
    /// # Errors
    ///
    /// [`WindowError::MissingWeights`] / [`WindowError::InsufficientWeights`]
    /// when the weight table cannot cover the window.
    pub fn calculate(&self, sample: &Sample) -> Result<f64> {
        match self.average.kind {
            AverageKind::Simple => Ok(self.window_stats().mean()),
            AverageKind::Weighted => self.weighted_average(),
            AverageKind::Exponential => Ok(self.exponential_average(sample)),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn weighted_average(&self) -> Result<f64> {
        let weights = self.average.weights.as_deref().ok_or(WindowError::MissingWeights)?;
        let stats = self.window_stats();
        let n = stats.count();
        if n == 0 {
            return Ok(0.0);
        }
        if weights.len() < n {
            return Err(WindowError::InsufficientWeights { needed: n, available: weights.len() }.into());
        }

        let aligned = &weights[weights.len() - n..];
        let total: f64 = stats.metrics().zip(aligned).map(|(x, w)| x * w).sum();
        Ok(total / ((n * (n + 1)) as f64 / 2.0))
    }

    fn exponential_average(&self, sample: &Sample) -> f64 {
        match &self.last {
            None => sample.metric,
            Some(prev) => {
                let alpha = self.average.alpha();
                alpha.mul_add(sample.metric, (1.0 - alpha) * prev.metric)
            }
        }
    }
}

impl WindowPolicy for MovingAverage {
    fn write(&mut self, sample: Sample) -> Result<()> {
        if let Some(window) = self.window.as_mut() {
            window.write(sample.clone())?;
        }
        self.metrics.count(SAMPLES_WRITTEN, 1);

        let value = self.calculate(&sample)?;
        let mut out = sample;
        out.metric = value;
        if self.window.is_some() {
            let stats = self.window_stats();
            out.meta.insert("variance".to_string(), Value::from(stats.variance()));
            out.meta.insert("stdDev".to_string(), Value::from(stats.std_dev()));
        }

        trace!(kind = %self.average.kind, value, "moving average emit");
        self.last = Some(out.clone());
        self.output.data(out);
        self.metrics.count(OUTPUTS_EMITTED, 1);
        Ok(())
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.window.as_ref().map(|w| w.snapshot()).unwrap_or_default()
    }

    fn stats(&self) -> WindowStats {
        self.window_stats()
    }

    fn len(&self) -> usize {
        self.window.as_ref().map_or(0, |w| w.len())
    }

    fn end(&mut self) {
        self.output.end();
    }
}
