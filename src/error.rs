//! Error types for window construction and sample handling.
//!
//! All fallible operations in this crate return [`anyhow::Result`]. The
//! concrete failure is always a [`WindowError`], so callers that need to react
//! to a specific misconfiguration can downcast:
//!
//! ```
//! use window_stats::{EventWindow, WindowError};
//!
//! let err = EventWindow::sliding(0).unwrap_err();
//! assert!(matches!(err.downcast_ref::<WindowError>(), Some(WindowError::ZeroSize)));
//! ```

use thiserror::Error;

/// Misconfiguration and malformed-input errors.
///
/// These are fatal to the instance that raised them: rebuild it with valid
/// options instead of retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("options.size is required")]
    MissingSize,
    #[error("options.duration is required")]
    MissingDuration,
    #[error("options.size must be greater than zero")]
    ZeroSize,
    #[error("options.duration must be greater than zero")]
    ZeroDuration,
    #[error("either options.size or options.duration is required")]
    MissingBound,
    #[error("options.size and options.duration are mutually exclusive")]
    ConflictingBounds,
    #[error("average type {kind} requires either options.size, options.duration or options.window")]
    MissingWindow { kind: String },
    #[error("invalid average type: {0}")]
    InvalidAverageType(String),
    #[error("weighted average requires average.weights")]
    MissingWeights,
    #[error("weighted average needs {needed} weights but only {available} are configured")]
    InsufficientWeights { needed: usize, available: usize },
    #[error("average.alpha must be in (0, 1], got {0}")]
    InvalidAlpha(f64),
    #[error("sample is missing the required `metric` field")]
    MissingMetric,
    #[error("sample `metric` field is not a number")]
    NonNumericMetric,
    #[error("invalid configuration: {0}")]
    Config(String),
}
