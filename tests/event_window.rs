//! Tests for count-bound windows.

use window_stats::testing::{SampleBuilder, collect_events, drain, samples, write_all};
use window_stats::*;

#[test]
fn test_sliding_keeps_last_size_samples() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::sliding(3)?.with_output(out);

    write_all(&mut win, SampleBuilder::new().add_range(1..=5).build())?;

    let emitted = drain(&rx);
    assert_eq!(emitted.len(), 5);
    assert_eq!(emitted[0].metrics(), vec![1.0]);
    assert_eq!(emitted[2].metrics(), vec![1.0, 2.0, 3.0]);
    assert_eq!(emitted[4].metrics(), vec![3.0, 4.0, 5.0]);
    assert!(emitted.iter().all(|d| d.count() <= 3));
    assert_eq!(win.window().sum(), 12.0);
    Ok(())
}

#[test]
fn test_emissions_are_copies() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::sliding(2)?.with_output(out);

    win.write(Sample::new(1.0))?;
    let first = drain(&rx);
    win.write(Sample::new(2.0))?;
    win.write(Sample::new(3.0))?;

    // The earlier emission is unaffected by later writes and evictions.
    assert_eq!(first[0].metrics(), vec![1.0]);
    assert_eq!(win.snapshot().len(), 2);
    Ok(())
}

#[test]
fn test_fixed_emits_full_batches() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::fixed(3)?.with_output(out);

    write_all(&mut win, samples(&[1.0, 2.0]))?;
    assert!(drain(&rx).is_empty());
    assert_eq!(win.len(), 2);

    win.write(Sample::new(3.0))?;
    let batches = drain(&rx);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].metrics(), vec![1.0, 2.0, 3.0]);
    assert!(win.is_empty());

    write_all(&mut win, samples(&[4.0, 5.0, 6.0, 7.0]))?;
    let batches = drain(&rx);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].metrics(), vec![4.0, 5.0, 6.0]);
    assert_eq!(win.len(), 1);
    Ok(())
}

#[test]
fn test_size_one_fixed_emits_every_write() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::fixed(1)?.with_output(out);

    write_all(&mut win, samples(&[1.0, 2.0]))?;
    let batches = drain(&rx);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].metrics(), vec![2.0]);
    Ok(())
}

#[test]
fn test_zero_size_is_rejected() {
    for fixed in [true, false] {
        let err = EventWindow::new(0, fixed).unwrap_err();
        assert_eq!(err.downcast_ref::<WindowError>(), Some(&WindowError::ZeroSize));
    }
}

#[test]
fn test_end_closes_output() -> anyhow::Result<()> {
    let (out, rx) = Output::channel();
    let mut win = EventWindow::sliding(2)?.with_output(out);

    win.write(Sample::new(1.0))?;
    win.end();

    let events = collect_events(&rx);
    assert_eq!(events.len(), 2);
    assert!(events[1].is_end());
    Ok(())
}

#[test]
fn test_callback_output() -> anyhow::Result<()> {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let out = Output::callback(move |event: Event<WindowData>| {
        if let Some(data) = event.into_data() {
            sink.lock().unwrap().push(data.count());
        }
    });

    let mut win = EventWindow::sliding(2)?.with_output(out);
    write_all(&mut win, samples(&[1.0, 2.0, 3.0]))?;

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2]);
    Ok(())
}

#[test]
fn test_accessors() -> anyhow::Result<()> {
    let win = EventWindow::fixed(4)?;
    assert_eq!(win.size(), 4);
    assert!(win.is_fixed());
    assert!(!EventWindow::sliding(4)?.is_fixed());
    Ok(())
}
