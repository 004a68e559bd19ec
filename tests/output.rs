//! Tests for output delivery and samples read from JSON.

use serde_json::json;
use std::sync::mpsc;
use window_stats::testing::{collect_events, drain, metrics_of, write_all};
use window_stats::*;

#[test]
fn test_discard_output_is_default() -> anyhow::Result<()> {
    let out: Output<Sample> = Output::default();
    assert!(out.is_discard());

    let mut avg = MovingAverage::simple(2)?;
    avg.write(Sample::new(1.0))?;
    assert_eq!(avg.last().map(|s| s.metric), Some(1.0));
    Ok(())
}

#[test]
fn test_existing_sender() -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut sum = WindowSum::new(EventWindow::sliding(5)?).with_output(Output::from_sender(tx));

    sum.write(Sample::new(2.0))?;
    sum.write(Sample::new(3.0))?;

    assert_eq!(metrics_of(&drain(&rx)), vec![2.0, 5.0]);
    Ok(())
}

#[test]
fn test_dropped_receiver_does_not_fail_writes() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::sliding(2)?.with_output(out);
    drop(rx);

    win.write(Sample::new(1.0))?;
    win.end();
    assert_eq!(win.len(), 1);
    Ok(())
}

#[test]
fn test_drain_stops_at_end() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::sliding(2)?.with_output(out);

    win.write(Sample::new(1.0))?;
    win.end();
    let values = drain(&rx);
    assert_eq!(values.len(), 1);
    assert!(collect_events(&rx).is_empty());
    Ok(())
}

#[test]
fn test_json_records_flow_through() -> anyhow::Result<()> {
    let records = [
        json!({ "metric": 1, "host": "a", "time": 100 }),
        json!({ "metric": 2.5, "host": "b", "time": 200 }),
    ];
    let parsed = records
        .into_iter()
        .map(Sample::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (out, rx) = Output::channel();
    let mut sum = WindowSum::new(EventWindow::sliding(2)?).with_output(out);
    write_all(&mut sum, parsed)?;

    let emitted: Vec<serde_json::Value> = drain(&rx)
        .iter()
        .map(Sample::to_value)
        .collect::<anyhow::Result<_>>()?;
    assert_eq!(emitted[1], json!({ "metric": 3.5, "host": "b", "time": 200 }));
    Ok(())
}

#[test]
fn test_json_without_metric_is_rejected() {
    let err = Sample::from_json(r#"{ "value": 3 }"#).unwrap_err();
    assert_eq!(err.downcast_ref::<WindowError>(), Some(&WindowError::MissingMetric));
}
