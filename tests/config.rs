//! Tests for building windows and averages from JSON options.

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use window_stats::testing::{drain, metrics_of, samples, write_all};
use window_stats::*;

fn manual_services() -> (ManualTimer, TimeServices) {
    let timer = ManualTimer::new();
    let services = TimeServices::manual(ManualClock::new(0), timer.clone());
    (timer, services)
}

fn window_error(err: &anyhow::Error) -> Option<&WindowError> {
    err.downcast_ref::<WindowError>()
}

#[test]
fn test_parse_window_options() -> anyhow::Result<()> {
    let opts = WindowOptions::from_json_str(r#"{ "duration": 60000, "fixed": true, "sum": true }"#)?;

    assert_eq!(opts.size, None);
    assert_eq!(opts.duration(), Some(Duration::from_secs(60)));
    assert!(opts.fixed);
    assert!(opts.sum);
    opts.validate()?;
    Ok(())
}

#[test]
fn test_window_options_defaults() -> anyhow::Result<()> {
    let opts = WindowOptions::from_json_str(r#"{ "size": 10 }"#)?;

    assert!(!opts.fixed);
    assert!(!opts.sum);
    let win = opts.event_window()?;
    assert_eq!(win.size(), 10);
    assert!(!win.is_fixed());
    Ok(())
}

#[test]
fn test_window_options_rejections() -> anyhow::Result<()> {
    let both = WindowOptions::from_json_str(r#"{ "size": 10, "duration": 1000 }"#)?;
    assert_eq!(window_error(&both.validate().unwrap_err()), Some(&WindowError::ConflictingBounds));

    let neither = WindowOptions::default();
    assert_eq!(window_error(&neither.validate().unwrap_err()), Some(&WindowError::MissingBound));

    let zero = WindowOptions { size: Some(0), ..WindowOptions::default() };
    assert_eq!(window_error(&zero.validate().unwrap_err()), Some(&WindowError::ZeroSize));

    let zero = WindowOptions { duration: Some(0), ..WindowOptions::default() };
    assert_eq!(window_error(&zero.validate().unwrap_err()), Some(&WindowError::ZeroDuration));

    let counted_sum = WindowOptions { size: Some(3), sum: true, ..WindowOptions::default() };
    assert!(matches!(window_error(&counted_sum.validate().unwrap_err()), Some(WindowError::Config(_))));
    Ok(())
}

#[test]
fn test_constructors_require_their_bound() {
    let (_, services) = manual_services();
    let timed = WindowOptions { duration: Some(1_000), ..WindowOptions::default() };
    assert_eq!(window_error(&timed.event_window().unwrap_err()), Some(&WindowError::MissingSize));

    let counted = WindowOptions { size: Some(5), ..WindowOptions::default() };
    assert_eq!(
        window_error(&counted.time_window(&services).unwrap_err()),
        Some(&WindowError::MissingDuration)
    );
}

#[test]
fn test_oversized_duration_retains_samples() -> anyhow::Result<()> {
    let (_, services) = manual_services();
    let opts = WindowOptions::from_json_str(r#"{ "duration": 18446744073709551615 }"#)?;
    let mut win = opts.time_window(&services)?;

    win.write(Sample::new(1.0).with_time(5))?;
    win.write(Sample::new(2.0).with_time(6))?;

    assert_eq!(win.len(), 2);
    assert_eq!(win.value_now(i64::MAX).count(), 2);
    Ok(())
}

#[test]
fn test_malformed_json_is_a_config_error() {
    let err = WindowOptions::from_json_str(r#"{ "size": "ten" }"#).unwrap_err();
    assert!(matches!(window_error(&err), Some(WindowError::Config(_))));
}

#[test]
fn test_build_selects_window_by_bound() -> anyhow::Result<()> {
    let (timer, services) = manual_services();

    let (out, rx) = Output::channel();
    let opts = WindowOptions::from_json_str(r#"{ "size": 2, "fixed": true }"#)?;
    let mut counted = opts.build(out, &services)?;
    write_all(&mut counted, samples(&[1.0, 2.0]))?;
    assert_eq!(drain(&rx)[0].metrics(), vec![1.0, 2.0]);

    let (out, rx) = Output::channel();
    let opts = WindowOptions::from_json_str(r#"{ "duration": 500, "fixed": true, "sum": true }"#)?;
    let mut timed = opts.build(out, &services)?;
    write_all(&mut timed, samples(&[1.0, 2.0, 3.0]))?;
    timer.advance(Duration::from_millis(500));
    assert_eq!(drain(&rx), vec![WindowData::Count(3)]);
    Ok(())
}

#[test]
fn test_average_type_shorthand() -> anyhow::Result<()> {
    let opts = MovingAverageOptions::from_json_str(r#"{ "type": "simple", "size": 3 }"#)?;
    let (out, rx) = Output::channel();
    let mut avg = opts.build(&TimeServices::system())?.with_output(out);

    write_all(&mut avg, samples(&[3.0, 6.0, 9.0, 12.0]))?;
    assert_eq!(metrics_of(&drain(&rx)), vec![3.0, 4.5, 6.0, 9.0]);
    Ok(())
}

#[test]
fn test_average_object_with_weights() -> anyhow::Result<()> {
    let opts = MovingAverageOptions::from_json_str(
        r#"{ "average": { "type": "weighted", "weights": [1, 2, 3] }, "size": 3 }"#,
    )?;
    let average = opts.validate()?;
    assert_eq!(average.kind, AverageKind::Weighted);
    assert_eq!(average.weights.as_deref(), Some(&[1.0, 2.0, 3.0][..]));

    let avg = opts.build(&TimeServices::system())?;
    assert_eq!(avg.size(), Some(3));
    Ok(())
}

#[test]
fn test_average_string_form() -> anyhow::Result<()> {
    let opts = MovingAverageOptions::from_json_str(r#"{ "average": "exponential" }"#)?;
    let avg = opts.build(&TimeServices::system())?;

    assert_eq!(avg.average().kind, AverageKind::Exponential);
    assert!(avg.window().is_none());
    Ok(())
}

#[test]
fn test_average_object_with_alpha() -> anyhow::Result<()> {
    let opts = MovingAverageOptions::from_json_str(
        r#"{ "average": { "type": "exponential", "alpha": 0.25 } }"#,
    )?;
    assert_eq!(opts.resolve_average()?.alpha(), 0.25);

    let bad = MovingAverageOptions::from_json_str(
        r#"{ "average": { "type": "exponential", "alpha": 2 } }"#,
    )?;
    let err = bad.resolve_average().unwrap_err();
    assert_eq!(window_error(&err), Some(&WindowError::InvalidAlpha(2.0)));
    Ok(())
}

#[test]
fn test_average_rejections() -> anyhow::Result<()> {
    let unknown = MovingAverageOptions::from_json_str(r#"{ "type": "median", "size": 3 }"#)?;
    assert_eq!(
        window_error(&unknown.validate().unwrap_err()),
        Some(&WindowError::InvalidAverageType("median".to_string()))
    );

    let missing = MovingAverageOptions::from_json_str(r#"{ "size": 3 }"#)?;
    assert!(matches!(window_error(&missing.validate().unwrap_err()), Some(WindowError::Config(_))));

    let both = MovingAverageOptions::from_json_str(r#"{ "type": "simple", "size": 3, "duration": 100 }"#)?;
    assert_eq!(window_error(&both.validate().unwrap_err()), Some(&WindowError::ConflictingBounds));

    let no_window = MovingAverageOptions::from_json_str(r#"{ "type": "weighted", "average": { "type": "simple" } }"#)?;
    assert_eq!(
        window_error(&no_window.build(&TimeServices::system()).unwrap_err()),
        Some(&WindowError::MissingWindow { kind: "simple".to_string() })
    );
    Ok(())
}

#[test]
fn test_build_with_window() -> anyhow::Result<()> {
    let opts = MovingAverageOptions::from_json_str(r#"{ "type": "simple" }"#)?;
    let avg = opts.build_with_window(Box::new(EventWindow::sliding(4)?))?;
    assert!(avg.window().is_some());

    let sized = MovingAverageOptions::from_json_str(r#"{ "type": "simple", "size": 4 }"#)?;
    let err = sized.build_with_window(Box::new(EventWindow::sliding(4)?)).unwrap_err();
    assert_eq!(window_error(&err), Some(&WindowError::ConflictingBounds));
    Ok(())
}

#[test]
fn test_duration_average_from_options() -> anyhow::Result<()> {
    let (_, services) = manual_services();
    let opts = MovingAverageOptions::from_json_str(r#"{ "type": "simple", "duration": 1000 }"#)?;
    let avg = opts.build(&services)?;

    assert_eq!(avg.duration(), Some(Duration::from_secs(1)));
    assert_eq!(avg.size(), None);
    Ok(())
}

#[test]
fn test_options_from_path() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, r#"{{ "average": {{ "type": "simple" }}, "size": 5 }}"#)?;

    let opts = MovingAverageOptions::from_path(file.path())?;
    assert_eq!(opts.size, Some(5));
    assert_eq!(opts.resolve_average()?, Average::simple());

    let mut file = NamedTempFile::new()?;
    writeln!(file, r#"{{ "size": 5, "fixed": true }}"#)?;
    let opts = WindowOptions::from_path(file.path())?;
    assert!(opts.event_window()?.is_fixed());
    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let err = WindowOptions::from_path("/nonexistent/window.json").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/window.json"));
}

#[test]
fn test_options_serialize_back() -> anyhow::Result<()> {
    let opts = WindowOptions { size: Some(4), fixed: true, ..WindowOptions::default() };
    let json = serde_json::to_value(&opts)?;

    assert_eq!(json, serde_json::json!({ "size": 4, "fixed": true, "sum": false }));
    Ok(())
}
