//! Time-bound windows.
//!
//! A [`TimeWindow`] retains samples observed within the last `duration`:
//!
//! - **Sliding**: every write stamps the sample with its observation time
//!   (its own `time`, else the clock), appends it, evicts from the front every
//!   sample whose age relative to that time is at least `duration`, and emits
//!   the retained samples.
//! - **Fixed**: writes only append. An injected [`TimerService`] ticks every
//!   `duration`; each tick drains the buffer, emits it, and resets.
//!
//! In **sum mode** the window emits the running count of retained samples
//! ([`WindowData::Count`]) instead of copying the buffer.
//!
//! ```
//! use std::time::Duration;
//! use window_stats::{ManualClock, ManualTimer, Output, Sample, TimeServices, TimeWindow, WindowPolicy};
//! use window_stats::output::drain;
//!
//! # fn main() -> anyhow::Result<()> {
//! let clock = ManualClock::new(0);
//! let timer = ManualTimer::new();
//! let services = TimeServices::manual(clock.clone(), timer.clone());
//!
//! let (out, rx) = Output::channel();
//! let mut win = TimeWindow::fixed(Duration::from_secs(1), &services)?.with_output(out);
//! win.write(Sample::new(1.0))?;
//! win.write(Sample::new(2.0))?;
//! assert!(drain(&rx).is_empty());
//!
//! timer.advance(Duration::from_secs(1));
//! let batches = drain(&rx);
//! assert_eq!(batches[0].count(), 2);
//! assert!(win.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::error::WindowError;
use crate::metrics::{
    MetricsCollector, OUTPUTS_EMITTED, RecordExt, Recorder, SAMPLES_EVICTED, SAMPLES_WRITTEN,
    TIMER_TICKS,
};
use crate::output::Output;
use crate::sample::Sample;
use crate::stats::WindowStats;
use crate::timer::{ManualTimer, ThreadTimer, TimerHandle, TimerService};
use crate::window::{TimestampMs, Window, WindowData, WindowPolicy};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// The clock and timer a time window is driven by.
#[derive(Clone, Debug)]
pub struct TimeServices {
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<dyn TimerService>,
}

impl TimeServices {
    pub fn new(clock: Arc<dyn Clock>, timer: Arc<dyn TimerService>) -> Self {
        Self { clock, timer }
    }

    /// Wall clock and background-thread timers.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadTimer))
    }

    /// Deterministic services; keep clones of `clock` and `timer` to drive them.
    #[must_use]
    pub fn manual(clock: ManualClock, timer: ManualTimer) -> Self {
        Self::new(Arc::new(clock), Arc::new(timer))
    }
}

impl Default for TimeServices {
    fn default() -> Self {
        Self::system()
    }
}

#[derive(Debug)]
struct TimeState {
    window: Window,
    /// Running count of retained samples.
    value: usize,
    sum: bool,
    output: Output<WindowData>,
    metrics: Option<Recorder>,
}

impl TimeState {
    /// Evict samples aged `duration_ms` or more at `now`.
    fn trim(&mut self, now: TimestampMs, duration_ms: i64) -> usize {
        let evicted = self
            .window
            .evict_while(|s| now.saturating_sub(s.time.unwrap_or(now)) >= duration_ms);
        if evicted > 0 {
            self.value = self.value.saturating_sub(evicted);
            self.metrics.count(SAMPLES_EVICTED, evicted as u64);
            trace!(evicted, now, "time window evicted");
        }
        evicted
    }

    fn current(&self) -> WindowData {
        if self.sum {
            WindowData::Count(self.value)
        } else {
            WindowData::Samples(self.window.snapshot())
        }
    }

    fn emit(&mut self, data: WindowData) {
        self.output.data(data);
        self.metrics.count(OUTPUTS_EMITTED, 1);
    }

    /// Drain, emit, reset. One timer tick.
    fn flush(&mut self) {
        let drained = self.window.len();
        let data = if self.sum {
            WindowData::Count(self.value)
        } else {
            WindowData::Samples(self.window.take())
        };
        self.window.clear();
        self.value = 0;
        debug!(drained, "time window tick");
        self.metrics.count(TIMER_TICKS, 1);
        self.metrics.count(SAMPLES_EVICTED, drained as u64);
        self.metrics.buffer_len(0);
        self.emit(data);
    }
}

fn lock(state: &Mutex<TimeState>) -> MutexGuard<'_, TimeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Window bounded by elapsed time.
///
/// Dropping a fixed window cancels its timer.
#[derive(Debug)]
pub struct TimeWindow {
    state: Arc<Mutex<TimeState>>,
    duration: Duration,
    fixed: bool,
    clock: Arc<dyn Clock>,
    timer_service: Arc<dyn TimerService>,
    timer: Option<TimerHandle>,
}

impl TimeWindow {
    /// Create a window over `duration`. Fixed windows start their timer
    /// immediately.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroDuration`] for a zero duration, or any error from
    /// the timer service.
    pub fn new(duration: Duration, fixed: bool, services: &TimeServices) -> Result<Self> {
        if duration.is_zero() {
            return Err(WindowError::ZeroDuration.into());
        }
        let mut win = Self {
            state: Arc::new(Mutex::new(TimeState {
                window: Window::new(),
                value: 0,
                sum: false,
                output: Output::discard(),
                metrics: None,
            })),
            duration,
            fixed,
            clock: Arc::clone(&services.clock),
            timer_service: Arc::clone(&services.timer),
            timer: None,
        };
        debug!(?duration, fixed, "time window created");
        if fixed {
            win.reset_duration()?;
        }
        Ok(win)
    }

    /// Sliding window evicting on every write.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroDuration`] for a zero duration.
    pub fn sliding(duration: Duration, services: &TimeServices) -> Result<Self> {
        Self::new(duration, false, services)
    }

    /// Fixed window drained by a timer every `duration`.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroDuration`] for a zero duration, or any error from
    /// the timer service.
    pub fn fixed(duration: Duration, services: &TimeServices) -> Result<Self> {
        Self::new(duration, true, services)
    }

    /// Emit the running count instead of the buffer.
    #[must_use]
    pub fn with_sum(self, sum: bool) -> Self {
        lock(&self.state).sum = sum;
        self
    }

    /// Preload the buffer. Samples keep their own `time`; unstamped ones are
    /// stamped with the current clock time.
    #[must_use]
    pub fn with_data<I: IntoIterator<Item = Sample>>(self, samples: I) -> Self {
        let now = self.clock.now_ms();
        {
            let mut state = lock(&self.state);
            for mut sample in samples {
                sample.time.get_or_insert(now);
                state.window.push(sample);
                state.value += 1;
            }
        }
        self
    }

    #[must_use]
    pub fn with_output(self, output: Output<WindowData>) -> Self {
        lock(&self.state).output = output;
        self
    }

    #[must_use]
    pub fn with_metrics(self, collector: MetricsCollector, label: impl Into<String>) -> Self {
        lock(&self.state).metrics = Some(Recorder::new(collector, label));
        self
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        self.fixed
    }

    #[must_use]
    pub fn is_sum(&self) -> bool {
        lock(&self.state).sum
    }

    /// Running count of retained samples.
    #[must_use]
    pub fn value(&self) -> usize {
        lock(&self.state).value
    }

    #[must_use]
    pub fn is_timer_active(&self) -> bool {
        self.timer.as_ref().is_some_and(TimerHandle::is_active)
    }

    /// Durations past `i64::MAX` ms saturate; nothing is ever that old.
    fn duration_ms(&self) -> i64 {
        i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX)
    }

    /// Trim to `now` and return what the window would emit at that time.
    pub fn value_now(&mut self, now: TimestampMs) -> WindowData {
        let duration_ms = self.duration_ms();
        let mut state = lock(&self.state);
        if state.window.is_empty() {
            return if state.sum {
                WindowData::Count(0)
            } else {
                WindowData::Samples(Vec::new())
            };
        }
        state.trim(now, duration_ms);
        state.metrics.buffer_len(state.window.len());
        state.current()
    }

    /// (Re)start the periodic timer, cancelling any running one. Only fixed
    /// windows use a timer; on a sliding window this does nothing.
    ///
    /// # Errors
    ///
    /// Propagates failures from the timer service.
    pub fn reset_duration(&mut self) -> Result<()> {
        self.cancel();
        if !self.fixed {
            return Ok(());
        }
        let state = Arc::clone(&self.state);
        let handle = self.timer_service.start(
            self.duration,
            Box::new(move || lock(&state).flush()),
        )?;
        debug!(duration = ?self.duration, "time window timer started");
        self.timer = Some(handle);
        Ok(())
    }

    /// Stop the periodic timer. No further ticks are emitted.
    pub fn cancel(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
            debug!("time window timer cancelled");
        }
    }
}

impl Clone for TimeWindow {
    /// An independent snapshot: same duration, buffer, fixed and sum flags,
    /// and running count. The copy has no output and no running timer.
    fn clone(&self) -> Self {
        let state = lock(&self.state);
        Self {
            state: Arc::new(Mutex::new(TimeState {
                window: state.window.clone(),
                value: state.value,
                sum: state.sum,
                output: Output::discard(),
                metrics: None,
            })),
            duration: self.duration,
            fixed: self.fixed,
            clock: Arc::clone(&self.clock),
            timer_service: Arc::clone(&self.timer_service),
            timer: None,
        }
    }
}

impl WindowPolicy for TimeWindow {
    fn write(&mut self, mut sample: Sample) -> Result<()> {
        let now = *sample.time.get_or_insert_with(|| self.clock.now_ms());
        let duration_ms = self.duration_ms();

        let mut state = lock(&self.state);
        state.window.push(sample);
        state.value += 1;
        state.metrics.count(SAMPLES_WRITTEN, 1);

        if !self.fixed {
            state.trim(now, duration_ms);
            let data = state.current();
            state.emit(data);
        }

        trace!(len = state.window.len(), "time window write");
        state.metrics.buffer_len(state.window.len());
        Ok(())
    }

    /// The buffer as of the last write or tick. A sliding window is trimmed
    /// only when written to; use [`TimeWindow::value_now`] for a view trimmed
    /// to the current time.
    fn snapshot(&self) -> Vec<Sample> {
        lock(&self.state).window.snapshot()
    }

    /// Statistics over the buffer as of the last write or tick (see
    /// [`snapshot`](WindowPolicy::snapshot)).
    fn stats(&self) -> WindowStats {
        lock(&self.state).window.stats()
    }

    fn len(&self) -> usize {
        lock(&self.state).window.len()
    }

    fn end(&mut self) {
        lock(&self.state).output.end();
    }
}
