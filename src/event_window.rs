//! Count-bound windows.
//!
//! An [`EventWindow`] holds at most `size` samples and runs in one of two
//! modes:
//!
//! - **Sliding**: every write appends, evicts the oldest sample once the
//!   buffer would exceed `size`, and emits a copy of the buffer.
//! - **Fixed**: writes accumulate silently; the write that brings the buffer
//!   to `size` emits the whole batch and clears the buffer.
//!
//! ```
//! use window_stats::{EventWindow, Output, Sample, Statistics, WindowPolicy};
//! use window_stats::output::drain;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (out, rx) = Output::channel();
//! let mut win = EventWindow::sliding(3)?.with_output(out);
//! for m in [1.0, 2.0, 3.0, 4.0] {
//!     win.write(Sample::new(m))?;
//! }
//! assert_eq!(win.window().sum(), 9.0);
//! assert_eq!(drain(&rx).len(), 4);
//! # Ok(())
//! # }
//! ```

use crate::error::WindowError;
use crate::metrics::{
    MetricsCollector, OUTPUTS_EMITTED, RecordExt, Recorder, SAMPLES_EVICTED, SAMPLES_WRITTEN,
};
use crate::output::Output;
use crate::sample::Sample;
use crate::stats::WindowStats;
use crate::window::{Window, WindowData, WindowPolicy};
use anyhow::Result;
use tracing::{debug, trace};

/// Window bounded by a sample count.
#[derive(Debug)]
pub struct EventWindow {
    window: Window,
    size: usize,
    fixed: bool,
    output: Output<WindowData>,
    metrics: Option<Recorder>,
}

impl EventWindow {
    /// # Errors
    ///
    /// [`WindowError::ZeroSize`] when `size` is zero.
    pub fn new(size: usize, fixed: bool) -> Result<Self> {
        if size == 0 {
            return Err(WindowError::ZeroSize.into());
        }
        debug!(size, fixed, "event window created");
        Ok(Self {
            window: Window::new(),
            size,
            fixed,
            output: Output::discard(),
            metrics: None,
        })
    }

    /// Sliding window of the last `size` samples.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroSize`] when `size` is zero.
    pub fn sliding(size: usize) -> Result<Self> {
        Self::new(size, false)
    }

    /// Batches of exactly `size` samples.
    ///
    /// # Errors
    ///
    /// [`WindowError::ZeroSize`] when `size` is zero.
    pub fn fixed(size: usize) -> Result<Self> {
        Self::new(size, true)
    }

    #[must_use]
    pub fn with_output(mut self, output: Output<WindowData>) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, collector: MetricsCollector, label: impl Into<String>) -> Self {
        self.metrics = Some(Recorder::new(collector, label));
        self
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// The live buffer, for statistics.
    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    fn emit(&mut self, data: WindowData) {
        trace!(count = data.count(), "event window emit");
        self.output.data(data);
        self.metrics.count(OUTPUTS_EMITTED, 1);
    }
}

impl WindowPolicy for EventWindow {
    fn write(&mut self, sample: Sample) -> Result<()> {
        self.window.push(sample);
        self.metrics.count(SAMPLES_WRITTEN, 1);

        if self.fixed {
            if self.window.len() >= self.size {
                let batch = self.window.take();
                self.metrics.count(SAMPLES_EVICTED, batch.len() as u64);
                self.emit(WindowData::Samples(batch));
            }
        } else {
            if self.window.len() > self.size {
                self.window.pop_front();
                self.metrics.count(SAMPLES_EVICTED, 1);
            }
            let snapshot = self.window.snapshot();
            self.emit(WindowData::Samples(snapshot));
        }

        trace!(len = self.window.len(), "event window write");
        self.metrics.buffer_len(self.window.len());
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
