//! End-to-end tests for live streaming over a scripted serial device.
//!
//! These tests verify:
//! - Frames are decoded, averaged and published to the handoff slot
//! - Malformed lines are dropped without stopping the stream
//! - Start/stop are idempotent and always close the transport

mod common;

use common::{channel, record, wait_until, AfterScript};
use serialcam::profile::DeviceProfile;
use serialcam::stream::{StreamController, StreamExit, StreamSettings};
use std::sync::atomic::Ordering;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn settings(exposure: usize) -> StreamSettings {
    StreamSettings {
        exposure,
        idle_interval: Duration::from_millis(1),
        ..StreamSettings::default()
    }
}

fn agfa_controller(exposure: usize) -> StreamController {
    StreamController::new(DeviceProfile::agfa35().shape, settings(exposure)).unwrap()
}

#[test]
fn test_single_exposure_publishes_divided_frame() {
    let mut values: Vec<u32> = vec![256, 512, 0];
    values.extend((3..35).map(|i| i * 256 + 255));
    let (chan, closed) = channel(&[record("STREAM", &values)], AfterScript::Disconnect);

    let mut controller = agfa_controller(1);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));
    assert!(closed.load(Ordering::SeqCst));

    let published = controller.latest_frame().expect("frame should be published");
    let frame = &published.frame;
    assert_eq!(frame.width(), 7);
    assert_eq!(frame.height(), 5);
    assert_eq!(frame.get(0, 0), Some(1));
    assert_eq!(frame.get(0, 1), Some(2));
    assert_eq!(frame.get(0, 2), Some(0));
    for i in 3..35usize {
        assert_eq!(frame.get(i / 7, i % 7), Some(i as u16));
    }

    assert!(matches!(
        controller.last_exit(),
        Some(StreamExit::ChannelFailed(_))
    ));
    let report = controller.stop().expect("reader ran");
    assert!(matches!(report.exit, StreamExit::ChannelFailed(_)));
    assert_eq!(report.published, 1);
    assert!(controller.last_exit().is_none());
}

#[test]
fn test_two_frame_exposure_averages() {
    let lines = vec![record("STREAM", &[0u32; 35]), record("STREAM", &[510u32; 35])];
    let (chan, _closed) = channel(&lines, AfterScript::Disconnect);

    let mut controller = agfa_controller(2);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));

    let published = controller.take_frame().expect("averaged frame");
    // 510 / 256 = 1; mean(0, 1) = 0.5 rounds to 1
    assert!(published.frame.pixels().iter().all(|&p| p == 1));
    assert!(controller.take_frame().is_none());
    assert_eq!(controller.stop().unwrap().published, 1);
}

#[test]
fn test_partial_window_is_not_published() {
    let lines = vec![record("STREAM", &[1024u32; 35]), record("STREAM", &[1024u32; 35])];
    let (chan, _closed) = channel(&lines, AfterScript::Disconnect);

    let mut controller = agfa_controller(3);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));
    assert!(controller.latest_frame().is_none());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let good = record("STREAM", &[2560u32; 35]);
    let lines = vec![
        "Agfa35 Camera V2 Ready".to_string(),
        record("STREAM", &[1u32; 34]),
        "STREAM,1,2,x,STREAM".to_string(),
        record("IMAGE", &[1u32; 35]),
        good.clone(),
        "STREAM,garbage".to_string(),
        good,
    ];
    let (chan, _closed) = channel(&lines, AfterScript::Disconnect);

    let mut controller = agfa_controller(1);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));

    let report = controller.stop().unwrap();
    assert_eq!(report.lines, 7);
    assert_eq!(report.dropped, 5);
    assert_eq!(report.published, 2);

    let latest = controller.latest_frame().unwrap();
    assert_eq!(latest.sequence, 2);
    assert!(latest.frame.pixels().iter().all(|&p| p == 10));
}

#[test]
fn test_stop_closes_transport_and_is_idempotent() {
    let (chan, closed) = channel(&[], AfterScript::Silence);

    let mut controller = agfa_controller(1);
    controller.start(chan);
    assert!(controller.is_running());
    assert!(controller.last_exit().is_none());
    assert!(!closed.load(Ordering::SeqCst));

    let report = controller.stop().expect("reader ran");
    assert!(matches!(report.exit, StreamExit::Stopped));
    assert!(!controller.is_running());
    assert!(closed.load(Ordering::SeqCst));

    assert!(controller.stop().is_none());
}

#[test]
fn test_second_start_while_running_is_ignored() {
    let (first, first_closed) = channel(&[], AfterScript::Silence);
    let (second, second_closed) = channel(&[], AfterScript::Silence);

    let mut controller = agfa_controller(1);
    controller.start(first);
    controller.start(second);

    assert!(second_closed.load(Ordering::SeqCst));
    assert!(!first_closed.load(Ordering::SeqCst));
    assert!(controller.is_running());

    controller.stop();
    assert!(first_closed.load(Ordering::SeqCst));
}

#[test]
fn test_restart_after_disconnect() {
    let (chan, _) = channel(&[record("STREAM", &[256u32; 35])], AfterScript::Disconnect);
    let mut controller = agfa_controller(1);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));

    let (chan, _) = channel(&[record("STREAM", &[512u32; 35])], AfterScript::Disconnect);
    controller.start(chan);
    assert!(wait_until(WAIT, || !controller.is_running()));

    let latest = controller.latest_frame().unwrap();
    assert_eq!(latest.sequence, 2);
    assert!(latest.frame.pixels().iter().all(|&p| p == 2));
}

#[test]
fn test_exposure_changes_while_streaming() {
    let lines = vec![record("STREAM", &[256u32; 35]), record("STREAM", &[768u32; 35])];
    let (chan, closed) = channel(&lines, AfterScript::Loop);

    let mut controller = agfa_controller(1);
    controller.start(chan);
    assert!(wait_until(WAIT, || controller.latest_frame().is_some()));

    for n in [2, 5, 1, 20, 4, 2] {
        controller.set_exposure(n).unwrap();
        std::thread::sleep(Duration::from_millis(2));
    }
    let before = controller.slot().published_count();
    assert!(wait_until(WAIT, || controller.slot().published_count() > before));

    // With exposure 2 over alternating 1s and 3s every average is 2.
    let latest = controller.take_frame();
    assert!(wait_until(WAIT, || controller.latest_frame().is_some()));
    let fresh = controller.latest_frame().unwrap();
    assert!(latest.map_or(true, |l| fresh.sequence > l.sequence));
    assert!(fresh.frame.pixels().iter().all(|&p| p == 2));

    controller.stop();
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_drop_stops_reader() {
    let (chan, closed) = channel(&[], AfterScript::Silence);
    {
        let mut controller = agfa_controller(1);
        controller.start(chan);
    }
    assert!(closed.load(Ordering::SeqCst));
}
