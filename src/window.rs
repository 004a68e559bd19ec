//! The base window buffer and the policy trait every window implements.
//!
//! [`Window`] is an ordered buffer of [`Sample`]s (insertion order is arrival
//! order) with the [`Statistics`] accessors on top. It has no eviction policy
//! of its own; [`EventWindow`](crate::EventWindow) and
//! [`TimeWindow`](crate::TimeWindow) own a `Window` and decide when samples
//! leave it. Adapters such as [`WindowSum`](crate::WindowSum) and
//! [`MovingAverage`](crate::MovingAverage) compose over any [`WindowPolicy`].

use crate::sample::Sample;
use crate::stats::{Statistics, WindowStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::collections::vec_deque;
use std::fmt;

/// Milliseconds since UNIX epoch (UTC).
pub type TimestampMs = i64;

/// Ordered buffer of samples with statistics over their metrics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Window {
    data: VecDeque<Sample>,
}

impl Window {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A window preloaded with `samples` in the given order.
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        Self { data: samples.into_iter().collect() }
    }

    #[inline]
    pub fn push(&mut self, sample: Sample) {
        self.data.push_back(sample);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The oldest sample.
    #[must_use]
    pub fn front(&self) -> Option<&Sample> {
        self.data.front()
    }

    /// Remove and return the oldest sample.
    pub fn pop_front(&mut self) -> Option<Sample> {
        self.data.pop_front()
    }

    /// Evict from the front while `expired` holds for the oldest sample.
    /// Returns the number of samples evicted.
    pub fn evict_while<F>(&mut self, mut expired: F) -> usize
    where
        F: FnMut(&Sample) -> bool,
    {
        let mut evicted = 0;
        while self.data.front().is_some_and(&mut expired) {
            self.data.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Drain every sample, leaving the window empty.
    pub fn take(&mut self) -> Vec<Sample> {
        self.data.drain(..).collect()
    }

    /// Copy of the current contents in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Sample> {
        self.data.iter().cloned().collect()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Sample> {
        self.data.iter()
    }

    /// Owned copy of the metrics for statistics away from the buffer.
    #[must_use]
    pub fn stats(&self) -> WindowStats {
        self.metrics().collect()
    }
}

impl Statistics for Window {
    fn metrics(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().map(|s| s.metric)
    }

    fn count(&self) -> usize {
        self.data.len()
    }
}

impl<'a> IntoIterator for &'a Window {
    type Item = &'a Sample;
    type IntoIter = vec_deque::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// What a window emits: the retained samples, or just their count when the
/// window runs in sum mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowData {
    Samples(Vec<Sample>),
    Count(usize),
}

impl WindowData {
    /// The samples, unless this is a count.
    #[must_use]
    pub fn samples(&self) -> Option<&[Sample]> {
        match self {
            Self::Samples(s) => Some(s),
            Self::Count(_) => None,
        }
    }

    /// Number of samples represented.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Samples(s) => s.len(),
            Self::Count(n) => *n,
        }
    }

    /// Metrics of the carried samples (empty for a count).
    #[must_use]
    pub fn metrics(&self) -> Vec<f64> {
        self.samples()
            .map(|s| s.iter().map(|x| x.metric).collect())
            .unwrap_or_default()
    }
}

/// An eviction policy over a [`Window`].
///
/// Writes run to completion synchronously. Instances are single-producer:
/// callers sharing one window across threads must serialize writes.
pub trait WindowPolicy: Send + fmt::Debug {
    /// Append `sample`, evict per policy, and emit whatever the policy emits.
    ///
    /// # Errors
    ///
    /// Implementations fail only on malformed input.
    fn write(&mut self, sample: Sample) -> Result<()>;

    /// Copy of the current buffer contents.
    fn snapshot(&self) -> Vec<Sample>;

    /// Statistics over the current buffer contents.
    fn stats(&self) -> WindowStats;

    /// Number of samples currently retained.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emit the terminal event. No further writes are expected.
    fn end(&mut self);
}

impl<W: WindowPolicy + ?Sized> WindowPolicy for Box<W> {
    fn write(&mut self, sample: Sample) -> Result<()> {
        (**self).write(sample)
    }

    fn snapshot(&self) -> Vec<Sample> {
        (**self).snapshot()
    }

    fn stats(&self) -> WindowStats {
        (**self).stats()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn end(&mut self) {
        (**self).end();
    }
}
