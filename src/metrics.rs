//! Operational counters for windows, sums and averages.
//!
//! A [`MetricsCollector`] is a cheap, cloneable handle to shared counters and
//! gauges. Attach it to any window with `with_metrics(collector, label)`; the
//! window then records under `<label>.<name>`:
//!
//! | name | kind | meaning |
//! |---|---|---|
//! | `samples_written` | counter | samples accepted by `write` |
//! | `outputs_emitted` | counter | values delivered to the output |
//! | `samples_evicted` | counter | samples dropped by the eviction policy |
//! | `timer_ticks` | counter | fixed time window ticks |
//! | `buffer_len` | gauge | buffer length after the last mutation |
//!
//! # Example
//!
//! ```
//! use window_stats::{EventWindow, Sample, WindowPolicy};
//! use window_stats::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let metrics = MetricsCollector::new();
//! let mut win = EventWindow::sliding(2)?.with_metrics(metrics.clone(), "latency");
//! for m in [1.0, 2.0, 3.0] {
//!     win.write(Sample::new(m))?;
//! }
//! assert_eq!(metrics.counter("latency.samples_written"), 3);
//! assert_eq!(metrics.counter("latency.samples_evicted"), 1);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SAMPLES_WRITTEN: &str = "samples_written";
pub const OUTPUTS_EMITTED: &str = "outputs_emitted";
pub const SAMPLES_EVICTED: &str = "samples_evicted";
pub const TIMER_TICKS: &str = "timer_ticks";
pub const BUFFER_LEN: &str = "buffer_len";

#[derive(Debug, Default)]
struct MetricsInner {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
}

/// Thread-safe container of named counters and gauges.
#[derive(Clone, Debug, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsInner>>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `value` to a counter, creating it at zero if needed.
    pub fn increment_counter(&self, name: &str, value: u64) {
        *self.lock().counters.entry(name.to_string()).or_insert(0) += value;
    }

    /// Overwrite a counter.
    pub fn set_counter(&self, name: &str, value: u64) {
        self.lock().counters.insert(name.to_string(), value);
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        self.lock().gauges.insert(name.to_string(), value);
    }

    /// Current counter value; `0` if never recorded.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.lock().gauges.get(name).copied()
    }

    /// Every metric by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        let inner = self.lock();
        inner
            .counters
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .chain(inner.gauges.iter().map(|(k, v)| (k.clone(), json!(v))))
            .collect()
    }

    /// Every metric as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.snapshot().into_iter().collect::<Map<_, _>>())
    }

    /// Print all metrics to stdout in name order.
    pub fn print(&self) {
        println!("\n========== Window Metrics ==========");
        for (name, value) in self.snapshot() {
            println!("{name}: {value}");
        }
        println!("====================================\n");
    }

    /// Save all metrics to a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or written to.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}

/// A collector bound to one label; what windows hold internally.
#[derive(Clone, Debug)]
pub(crate) struct Recorder {
    collector: MetricsCollector,
    label: String,
}

impl Recorder {
    pub(crate) fn new(collector: MetricsCollector, label: impl Into<String>) -> Self {
        Self { collector, label: label.into() }
    }

    fn key(&self, name: &str) -> String {
        format!("{}.{name}", self.label)
    }

    pub(crate) fn count(&self, name: &str, value: u64) {
        if value > 0 {
            self.collector.increment_counter(&self.key(name), value);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn buffer_len(&self, len: usize) {
        self.collector.set_gauge(&self.key(BUFFER_LEN), len as f64);
    }
}

/// Record on an optional recorder.
pub(crate) trait RecordExt {
    fn count(&self, name: &str, value: u64);
    fn buffer_len(&self, len: usize);
}

impl RecordExt for Option<Recorder> {
    fn count(&self, name: &str, value: u64) {
        if let Some(r) = self {
            r.count(name, value);
        }
    }

    fn buffer_len(&self, len: usize) {
        if let Some(r) = self {
            r.buffer_len(len);
        }
    }
}
