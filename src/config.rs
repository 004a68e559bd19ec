//! Option structs for building windows and averages from configuration.
//!
//! Keys follow the JSON shape windows are usually configured with:
//!
//! ```json
//! { "size": 10, "fixed": false }
//! { "duration": 60000, "fixed": true, "sum": true }
//! { "type": "simple", "size": 10 }
//! { "average": { "type": "weighted", "weights": [1, 2, 3, 4] }, "size": 4 }
//! { "average": "exponential" }
//! ```
//!
//! `size` and `duration` are mutually exclusive. `duration` is in
//! milliseconds. A pre-built window cannot be expressed in JSON; pass it to
//! [`MovingAverageOptions::build_with_window`] instead.

use crate::error::WindowError;
use crate::event_window::EventWindow;
use crate::moving_average::{Average, AverageKind, MovingAverage, WindowSource};
use crate::output::Output;
use crate::time_window::{TimeServices, TimeWindow};
use crate::window::{WindowData, WindowPolicy};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

fn reject(err: WindowError) -> anyhow::Error {
    warn!(%err, "rejecting window options");
    err.into()
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| reject(WindowError::Config(e.to_string())))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_json(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Options for a standalone count- or time-bound window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOptions {
    /// Count bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Time bound in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Batch (`true`) or sliding (`false`) eviction.
    #[serde(default)]
    pub fixed: bool,
    /// Emit the running count instead of the buffer (time windows only).
    #[serde(default)]
    pub sum: bool,
}

impl WindowOptions {
    /// # Errors
    ///
    /// [`WindowError::Config`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// # Errors
    ///
    /// I/O errors, or [`WindowError::Config`] on malformed JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path.as_ref())
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        match self.duration {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }

    /// # Errors
    ///
    /// [`WindowError::ConflictingBounds`] when both bounds are set,
    /// [`WindowError::MissingBound`] when neither is, zero bounds, and
    /// [`WindowError::Config`] for `sum` on a count-bound window.
    pub fn validate(&self) -> Result<()> {
        match (self.size, self.duration) {
            (Some(_), Some(_)) => Err(reject(WindowError::ConflictingBounds)),
            (None, None) => Err(reject(WindowError::MissingBound)),
            (Some(0), None) => Err(reject(WindowError::ZeroSize)),
            (None, Some(0)) => Err(reject(WindowError::ZeroDuration)),
            (Some(_), None) if self.sum => Err(reject(WindowError::Config(
                "options.sum applies to time windows only".to_string(),
            ))),
            _ => Ok(()),
        }
    }

    /// Build the count-bound window these options describe.
    ///
    /// # Errors
    ///
    /// [`WindowError::MissingSize`] without a size, plus [`validate`](Self::validate) failures.
    pub fn event_window(&self) -> Result<EventWindow> {
        let Some(size) = self.size else {
            return Err(reject(WindowError::MissingSize));
        };
        self.validate()?;
        EventWindow::new(size, self.fixed)
    }

    /// Build the time-bound window these options describe.
    ///
    /// # Errors
    ///
    /// [`WindowError::MissingDuration`] without a duration, plus
    /// [`validate`](Self::validate) and timer failures.
    pub fn time_window(&self, services: &TimeServices) -> Result<TimeWindow> {
        let Some(duration) = self.duration() else {
            return Err(reject(WindowError::MissingDuration));
        };
        self.validate()?;
        Ok(TimeWindow::new(duration, self.fixed, services)?.with_sum(self.sum))
    }

    /// Build whichever window the bound selects, wired to `output`.
    ///
    /// # Errors
    ///
    /// [`validate`](Self::validate) and construction failures.
    pub fn build(
        &self,
        output: Output<WindowData>,
        services: &TimeServices,
    ) -> Result<Box<dyn WindowPolicy>> {
        self.validate()?;
        if self.size.is_some() {
            Ok(Box::new(self.event_window()?.with_output(output)))
        } else {
            Ok(Box::new(self.time_window(services)?.with_output(output)))
        }
    }
}

/// The `average` key: a bare type name or a full object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AverageSpec {
    Kind(String),
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<f64>>,
    },
}

impl AverageSpec {
    /// # Errors
    ///
    /// [`WindowError::InvalidAverageType`] for an unknown type name and the
    /// parameter checks of [`Average::validate`].
    pub fn resolve(&self) -> Result<Average> {
        let average = match self {
            Self::Kind(kind) => Average::from(kind.parse::<AverageKind>().map_err(reject)?),
            Self::Detailed { kind, alpha, weights } => Average {
                kind: kind.parse().map_err(reject)?,
                alpha: *alpha,
                weights: weights.clone(),
            },
        };
        average.validate()?;
        Ok(average)
    }
}

/// Options for a [`MovingAverage`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<AverageSpec>,
    /// Shorthand for `average` when only the type is needed.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl MovingAverageOptions {
    /// # Errors
    ///
    /// [`WindowError::Config`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// # Errors
    ///
    /// I/O errors, or [`WindowError::Config`] on malformed JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path.as_ref())
    }

    /// The averaging configuration, preferring `average` over `type`.
    ///
    /// # Errors
    ///
    /// [`WindowError::Config`] when neither is present, and the failures of
    /// [`AverageSpec::resolve`].
    pub fn resolve_average(&self) -> Result<Average> {
        match (&self.average, &self.kind) {
            (Some(spec), _) => spec.resolve(),
            (None, Some(kind)) => AverageSpec::Kind(kind.clone()).resolve(),
            (None, None) => Err(reject(WindowError::Config(
                "options.average or options.type is required".to_string(),
            ))),
        }
    }

    /// # Errors
    ///
    /// [`WindowError::ConflictingBounds`] when both bounds are set, and the
    /// failures of [`resolve_average`](Self::resolve_average).
    pub fn validate(&self) -> Result<Average> {
        let average = self.resolve_average()?;
        if self.size.is_some() && self.duration.is_some() {
            return Err(reject(WindowError::ConflictingBounds));
        }
        Ok(average)
    }

    /// Build the average with a window from `size` or `duration`.
    ///
    /// # Errors
    ///
    /// [`validate`](Self::validate) failures, [`WindowError::MissingWindow`]
    /// for a non-exponential average without a bound, and window errors.
    pub fn build(&self, services: &TimeServices) -> Result<MovingAverage> {
        let average = self.validate()?;
        let source = match (self.size, self.duration) {
            (Some(size), _) => WindowSource::Size(size),
            (None, Some(ms)) => WindowSource::Duration(Duration::from_millis(ms)),
            (None, None) => WindowSource::None,
        };
        MovingAverage::new(average, source, services).inspect_err(|err| {
            warn!(%err, "moving average construction failed");
        })
    }

    /// Build the average over a caller-supplied window.
    ///
    /// # Errors
    ///
    /// [`WindowError::ConflictingBounds`] when `size` or `duration` is also
    /// set, and [`validate`](Self::validate) failures.
    pub fn build_with_window(&self, window: Box<dyn WindowPolicy>) -> Result<MovingAverage> {
        let average = self.validate()?;
        if self.size.is_some() || self.duration.is_some() {
            return Err(reject(WindowError::ConflictingBounds));
        }
        MovingAverage::new(average, WindowSource::Window(window), &TimeServices::system())
    }
}
