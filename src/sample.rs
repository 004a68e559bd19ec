//! The `Sample` record written into windows.
//!
//! A sample is an open record: the numeric `metric` is required, `time` and
//! `meta` are optional, and any other JSON fields ride along untouched so that
//! adapters such as [`WindowSum`](crate::WindowSum) and
//! [`MovingAverage`](crate::MovingAverage) can pass them through.

use crate::error::WindowError;
use crate::window::TimestampMs;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The observed value all statistics are computed over.
    pub metric: f64,
    /// Observation time in milliseconds since the UNIX epoch. Time windows
    /// stamp samples that arrive without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimestampMs>,
    /// Derived annotations (moving averages store `variance`/`stdDev` here).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    /// Every other field of the incoming record.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Sample {
    #[inline]
    #[must_use]
    pub fn new(metric: f64) -> Self {
        Self {
            metric,
            time: None,
            meta: Map::new(),
            fields: Map::new(),
        }
    }

    /// Set an explicit observation time.
    #[must_use]
    pub fn with_time(mut self, time: TimestampMs) -> Self {
        self.time = Some(time);
        self
    }

    /// Attach a pass-through field.
    #[must_use]
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Look up a pass-through field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Build a sample from an arbitrary JSON record.
    ///
    /// # Errors
    ///
    /// [`WindowError::MissingMetric`] when the record has no `metric` field and
    /// [`WindowError::NonNumericMetric`] when it is present but not a number.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(WindowError::MissingMetric.into());
        };
        match map.get("metric") {
            None | Some(Value::Null) => return Err(WindowError::MissingMetric.into()),
            Some(Value::Number(_)) => {}
            Some(_) => return Err(WindowError::NonNumericMetric.into()),
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Parse a sample from a JSON document.
    ///
    /// # Errors
    ///
    /// Fails on invalid JSON or for the reasons listed on [`Sample::from_value`].
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Serialize back into a JSON record.
    ///
    /// # Errors
    ///
    /// Fails only if a flattened field collides with a reserved key in a way
    /// `serde_json` cannot represent.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<f64> for Sample {
    fn from(metric: f64) -> Self {
        Self::new(metric)
    }
}

impl TryFrom<Value> for Sample {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_are_preserved() {
        let sample = Sample::from_value(json!({ "metric": 3.5, "host": "a", "time": 10 })).unwrap();
        assert_eq!(sample.metric, 3.5);
        assert_eq!(sample.time, Some(10));
        assert_eq!(sample.field("host"), Some(&json!("a")));

        let back = sample.to_value().unwrap();
        assert_eq!(back["host"], json!("a"));
        assert_eq!(back["metric"], json!(3.5));
    }

    #[test]
    fn missing_metric_is_rejected() {
        let err = Sample::from_value(json!({ "host": "a" })).unwrap_err();
        assert_eq!(err.downcast_ref::<WindowError>(), Some(&WindowError::MissingMetric));

        let err = Sample::from_json(r#"{"metric": "high"}"#).unwrap_err();
        assert_eq!(err.downcast_ref::<WindowError>(), Some(&WindowError::NonNumericMetric));
    }
}
