//! Periodic timer services driving fixed time windows.
//!
//! A fixed [`TimeWindow`](crate::TimeWindow) never schedules anything on its
//! own: it asks an injected [`TimerService`] to call it back every period and
//! keeps the returned [`TimerHandle`]. Cancelling (or dropping) the handle
//! stops future ticks.
//!
//! - [`ThreadTimer`] ticks from a dedicated background thread.
//! - [`ManualTimer`] ticks only when the caller advances it, for deterministic
//!   tests.

use anyhow::Result;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Callback invoked on every tick.
pub type Tick = Box<dyn FnMut() + Send + 'static>;

/// Schedules a recurring callback.
pub trait TimerService: Send + Sync + fmt::Debug {
    /// Start calling `tick` every `period` until the returned handle is
    /// cancelled or dropped.
    ///
    /// # Errors
    ///
    /// Fails if the service cannot schedule the callback.
    fn start(&self, period: Duration, tick: Tick) -> Result<TimerHandle>;
}

/// Ownership of a running timer. Dropping the handle cancels the timer.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Stop future ticks. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").field("active", &self.is_active()).finish()
    }
}

/* ===================== ThreadTimer ===================== */

/// Ticks from a background thread per timer.
///
/// The thread waits on a stop channel with a timeout of one period; a timeout
/// is a tick, a disconnect (the handle was cancelled) ends the thread. A tick
/// already in progress runs to completion, so ticks never overlap.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadTimer;

impl TimerService for ThreadTimer {
    fn start(&self, period: Duration, mut tick: Tick) -> Result<TimerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        thread::Builder::new()
            .name("window-timer".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => tick(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(?period, "timer thread stopped");
            })?;
        debug!(?period, "timer thread started");
        Ok(TimerHandle::new(move || drop(stop_tx)))
    }
}

/* ===================== ManualTimer ===================== */

struct Registration {
    id: u64,
    period: Duration,
    elapsed: Duration,
    /// `None` while the callback is running outside the lock.
    tick: Option<Tick>,
}

#[derive(Default)]
struct ManualTimerInner {
    next_id: u64,
    timers: Vec<Registration>,
}

/// A timer service driven by explicit calls to [`advance`](ManualTimer::advance)
/// or [`fire`](ManualTimer::fire). Clones share the same registrations.
#[derive(Clone, Default)]
pub struct ManualTimer {
    inner: Arc<Mutex<ManualTimerInner>>,
}

impl ManualTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualTimerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance virtual time, ticking every timer once per whole period elapsed.
    pub fn advance(&self, by: Duration) {
        self.run_due(|timer| {
            timer.elapsed += by;
            if timer.period.is_zero() {
                return 0;
            }
            let due = timer.elapsed.as_nanos() / timer.period.as_nanos();
            timer.elapsed -= timer.period * u32::try_from(due).unwrap_or(u32::MAX);
            usize::try_from(due).unwrap_or(usize::MAX)
        });
    }

    /// Tick every active timer once, regardless of its period.
    pub fn fire(&self) {
        self.run_due(|timer| {
            timer.elapsed = Duration::ZERO;
            1
        });
    }

    /// Take the callbacks of every timer with ticks due, run them with the
    /// registry unlocked, then hand them back to timers that are still active.
    /// Ticks may therefore start or cancel timers on this service.
    fn run_due<F>(&self, mut due: F)
    where
        F: FnMut(&mut Registration) -> usize,
    {
        let mut pending: Vec<(u64, usize, Tick)> = Vec::new();
        for timer in &mut self.lock().timers {
            let count = due(timer);
            if count > 0
                && let Some(tick) = timer.tick.take()
            {
                pending.push((timer.id, count, tick));
            }
        }

        for (id, count, tick) in &mut pending {
            for _ in 0..*count {
                if !self.is_registered(*id) {
                    break;
                }
                tick();
            }
        }

        let mut cancelled = Vec::new();
        let mut inner = self.lock();
        for (id, _, tick) in pending {
            match inner.timers.iter_mut().find(|t| t.id == id) {
                Some(timer) => timer.tick = Some(tick),
                None => cancelled.push(tick),
            }
        }
        drop(inner);
        // Callbacks of timers cancelled mid-tick are dropped outside the lock.
        drop(cancelled);
    }

    fn is_registered(&self, id: u64) -> bool {
        self.lock().timers.iter().any(|t| t.id == id)
    }

    /// Number of timers that have been started and not cancelled.
    #[must_use]
    pub fn active(&self) -> usize {
        self.lock().timers.len()
    }
}

impl TimerService for ManualTimer {
    fn start(&self, period: Duration, tick: Tick) -> Result<TimerHandle> {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.timers.push(Registration { id, period, elapsed: Duration::ZERO, tick: Some(tick) });
        drop(inner);

        let shared = Arc::clone(&self.inner);
        Ok(TimerHandle::new(move || {
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .timers
                .retain(|t| t.id != id);
        }))
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer").field("active", &self.active()).finish()
    }
}
