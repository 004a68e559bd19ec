//! # window-stats
//!
//! A **streaming statistics** library: keep a bounded window of recent numeric
//! samples (bounded by count or by elapsed time) and derive running statistics
//! and moving averages over it, emitting a derived value on every write or on
//! every window period.
//!
//! ## Key Features
//!
//! - **Count-bound windows** - fixed batches or sliding buffers ([`EventWindow`])
//! - **Time-bound windows** - sliding by observation time or drained by a timer ([`TimeWindow`])
//! - **Statistics** - sum, mean, variance, standard deviation, percentiles, rank ([`Statistics`])
//! - **Running sums** - re-emit each sample with the window sum ([`WindowSum`])
//! - **Moving averages** - simple, weighted, exponential ([`MovingAverage`])
//! - **Explicit outputs** - channel, callback or discard, delivered in write order ([`Output`])
//! - **Injected time** - clock and timer services, with manual versions for tests
//!
//! ## Quick Start
//!
//! ```
//! use window_stats::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (out, rx) = Output::channel();
//! let mut win = EventWindow::sliding(10)?.with_output(out);
//!
//! for m in [15.0, 20.0, 35.0, 40.0, 50.0] {
//!     win.write(Sample::new(m))?;
//! }
//!
//! let stats = win.stats();
//! assert_eq!(stats.sum(), 160.0);
//! assert_eq!(stats.mean(), 32.0);
//! assert_eq!(stats.median(), 30.0);
//! assert_eq!(stats.percentile(80.0), 46.25);
//!
//! // One emission per write, each a copy of the buffer.
//! assert_eq!(output::drain(&rx).len(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Samples
//!
//! A [`Sample`] carries a required `metric`, an optional observation `time`,
//! a `meta` map, and any other fields, which adapters pass through.
//!
//! ### Windows
//!
//! [`Window`] is the base buffer plus statistics. The [`WindowPolicy`] trait
//! (`write`, `snapshot`, `stats`, `len`, `end`) is implemented by the eviction
//! policies and by the adapters layered on them:
//!
//! | type | bound | emits |
//! |---|---|---|
//! | [`EventWindow`] sliding | last `size` samples | buffer copy per write |
//! | [`EventWindow`] fixed | batches of `size` | the batch when full |
//! | [`TimeWindow`] sliding | samples younger than `duration` | buffer copy (or count) per write |
//! | [`TimeWindow`] fixed | one `duration` period | buffer (or count) per timer tick |
//! | [`WindowSum`] | wrapped window | sample with `metric` = window sum |
//! | [`MovingAverage`] | owned window | sample with `metric` = average |
//!
//! ### Outputs
//!
//! Produced values go to an [`Output`]: an mpsc channel, a callback, or
//! nowhere. [`Event::End`] follows the last value once `end()` is called.
//!
//! ### Time
//!
//! Time windows take a [`TimeServices`] bundle: a [`Clock`] for stamping
//! samples and a [`TimerService`] for fixed-window ticks. Use
//! [`TimeServices::system`] in production and [`ManualClock`] /
//! [`ManualTimer`] in tests.
//!
//! ## Concurrency
//!
//! Writes are synchronous and single-producer. The only asynchronous element
//! is the fixed time window's timer; each tick drains, emits and resets as one
//! unit under the window's lock, and ticks never overlap.
//!
//! ## Module Overview
//!
//! - [`window`] - base buffer and the [`WindowPolicy`] trait
//! - [`stats`] - the [`Statistics`] accessors
//! - [`event_window`] / [`time_window`] - eviction policies
//! - [`window_sum`] / [`moving_average`] - adapters
//! - [`config`] - serde option structs and builders
//! - [`metrics`] - counters per window
//! - [`testing`] - helpers for tests

pub mod clock;
pub mod config;
pub mod error;
pub mod event_window;
pub mod metrics;
pub mod moving_average;
pub mod output;
pub mod sample;
pub mod stats;
pub mod testing;
pub mod time_window;
pub mod timer;
pub mod window;
pub mod window_sum;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AverageSpec, MovingAverageOptions, WindowOptions};
pub use error::WindowError;
pub use event_window::EventWindow;
pub use moving_average::{Average, AverageKind, M1_ALPHA, MovingAverage, WindowSource};
pub use output::{Event, Output};
pub use sample::Sample;
pub use stats::{Statistics, Summary, WindowStats};
pub use time_window::{TimeServices, TimeWindow};
pub use timer::{ManualTimer, ThreadTimer, TimerHandle, TimerService};
pub use window::{TimestampMs, Window, WindowData, WindowPolicy};
pub use window_sum::WindowSum;
