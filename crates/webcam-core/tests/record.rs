//! End-to-end recordings against a synthetic source.
//!
//! These need the GStreamer base, good and ugly plugin sets (videotestsrc,
//! videoflip, x264enc, matroskamux/mp4mux), so they are ignored by default:
//! `cargo test -p webcam-core -- --ignored`. Start failures that happen while
//! the pipeline is built only need GStreamer core and always run.

use std::time::Duration;

use tempfile::tempdir;
use webcam_core::{
    CameraCaps, DemoDriver, GstRecordingService, Recorder, RecorderError, RecorderOptions,
};

fn test_source() -> RecorderOptions {
    RecorderOptions {
        source: Some("videotestsrc".to_string()),
        ..Default::default()
    }
}

#[test]
#[ignore]
fn records_mkv_from_test_source() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("test23.mkv");
    let caps = CameraCaps::new(1280, 720, 30, 1, "NV12");

    let recorder = Recorder::start(caps, &output, &test_source()).unwrap();
    assert!(recorder.is_recording());
    std::thread::sleep(Duration::from_millis(500));
    let summary = recorder.stop().unwrap();

    assert!(summary.finalized);
    assert!(summary.frame_count > 0);
    assert!(output.metadata().unwrap().len() > 0);
}

#[test]
#[ignore]
fn demo_driver_writes_mp4() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("test23.mp4");
    let caps = CameraCaps::new(1920, 1080, 30, 1, "YUY2");
    let driver = DemoDriver {
        iterations: 3,
        interval: Duration::from_millis(100),
        ..Default::default()
    };
    let mut out = Vec::new();

    let summary = driver
        .run(&GstRecordingService::new(test_source()), &caps, &output, &mut out)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    assert!(summary.finalized);
    assert!(output.exists());
}

#[test]
#[ignore]
fn dropped_recorder_still_finalizes() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("dropped.mkv");
    let caps = CameraCaps::new(640, 480, 15, 1, "I420");

    {
        let _recorder = Recorder::start(caps, &output, &test_source()).unwrap();
        std::thread::sleep(Duration::from_millis(300));
    }

    assert!(output.metadata().unwrap().len() > 0);
}

#[test]
fn missing_source_element_fails_start() {
    let dir = tempdir().unwrap();
    let options = RecorderOptions {
        source: Some("definitely-not-an-element".to_string()),
        ..Default::default()
    };
    let caps = CameraCaps::new(640, 480, 15, 1, "I420");

    let result = Recorder::start(caps, dir.path().join("x.mkv"), &options);
    assert!(matches!(result, Err(RecorderError::MissingElement(name)) if name == "definitely-not-an-element"));
}
