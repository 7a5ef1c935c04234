//! Recording handle.
//!
//! `Recorder::start` builds the pipeline, hands it to a session thread and
//! blocks until the camera is actually delivering. `Recorder::stop`
//! consumes the handle, finalizes the file and returns a summary. A handle
//! dropped without `stop` is stopped on drop, so the device and file are
//! always released.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use gstreamer as gst;
use gstreamer::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::caps::CameraCaps;
use crate::config::RecorderOptions;
use crate::error::{RecorderError, Result};
use crate::pipeline::{PipelinePlan, CAPS_FILTER_NAME};
use crate::session::{self, Session};
use crate::stats::{self, SharedStats};

/// What a finished recording produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub output: PathBuf,
    pub caps: CameraCaps,
    pub frame_count: u64,
    /// Presentation time of the last frame in seconds, `-1.0` if none.
    pub last_frame_time: f64,
    pub duration_ms: f64,
    pub started_at: DateTime<Utc>,
    /// End-of-stream reached the muxer, so the container was closed properly.
    pub finalized: bool,
}

/// A running recording.
pub struct Recorder {
    caps: CameraCaps,
    output: PathBuf,
    stats: SharedStats,
    cancel: CancellationToken,
    session: Option<JoinHandle<Result<RecordingSummary>>>,
}

impl Recorder {
    /// Start recording `caps` from the camera into `output`.
    ///
    /// Blocks until the pipeline reaches PLAYING or fails.
    pub fn start(
        caps: CameraCaps,
        output: impl Into<PathBuf>,
        options: &RecorderOptions,
    ) -> Result<Self> {
        let output = output.into();
        check_output_dir(&output)?;
        let plan = PipelinePlan::new(&caps, &output, options)?;

        gst::init()?;
        tracing::debug!("pipeline: {}", plan.describe());
        let pipeline = plan.build()?;

        let stats = stats::new_shared();
        install_frame_probe(&pipeline, &stats)?;

        let bus_rx = session::forward_bus(&pipeline)?;

        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let session = Session {
            pipeline,
            bus_rx,
            cancel: cancel.clone(),
            stats: stats.clone(),
            caps: caps.clone(),
            output: output.clone(),
            start_timeout: options.start_timeout(),
            stop_timeout: options.stop_timeout(),
        };

        let handle = std::thread::Builder::new()
            .name("webcam-recorder".to_string())
            .spawn(move || session::run(session, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Recorder {
                caps,
                output,
                stats,
                cancel,
                session: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(RecorderError::SessionLost)
            }
        }
    }

    /// Stop the recording and wait for the file to be finalized.
    pub fn stop(mut self) -> Result<RecordingSummary> {
        self.finish()
    }

    /// Whether the pipeline is currently PLAYING.
    pub fn is_recording(&self) -> bool {
        self.stats.is_recording()
    }

    /// Frames that passed the caps filter so far.
    pub fn frame_count(&self) -> u64 {
        self.stats.frame_count()
    }

    /// Presentation time of the latest frame in seconds, `-1.0` if none yet.
    pub fn last_frame_time(&self) -> f64 {
        self.stats.last_frame_time()
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn caps(&self) -> &CameraCaps {
        &self.caps
    }

    fn finish(&mut self) -> Result<RecordingSummary> {
        self.cancel.cancel();
        let handle = self.session.take().ok_or(RecorderError::SessionLost)?;
        handle.join().map_err(|_| RecorderError::SessionLost)?
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::warn!(
                "recorder for {} dropped without stop, stopping now",
                self.output.display()
            );
            if let Err(e) = self.finish() {
                tracing::error!("failed to stop recording: {}", e);
            }
        }
    }
}

/// A recording that is stopped at most once. After the stop its summary
/// stays available; a second stop reports `AlreadyStopped`.
#[derive(Debug)]
pub struct StopOnce<R> {
    running: Option<R>,
    summary: Option<RecordingSummary>,
}

impl<R> StopOnce<R> {
    pub fn new(running: R) -> Self {
        StopOnce {
            running: Some(running),
            summary: None,
        }
    }

    pub fn running(&self) -> Option<&R> {
        self.running.as_ref()
    }

    pub fn summary(&self) -> Option<&RecordingSummary> {
        self.summary.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.running.is_none()
    }

    /// Stop with `stop`. The recording counts as stopped even when `stop`
    /// fails.
    pub fn stop_with<F>(&mut self, stop: F) -> Result<&RecordingSummary>
    where
        F: FnOnce(R) -> Result<RecordingSummary>,
    {
        let running = self.running.take().ok_or(RecorderError::AlreadyStopped)?;
        Ok(self.summary.insert(stop(running)?))
    }

    /// Stop unless already stopped, as leaving a `with` block does.
    pub fn finish_with<F>(&mut self, stop: F) -> Result<()>
    where
        F: FnOnce(R) -> Result<RecordingSummary>,
    {
        if self.is_stopped() {
            return Ok(());
        }
        self.stop_with(stop).map(|_| ())
    }
}

impl StopOnce<Recorder> {
    pub fn frame_count(&self) -> u64 {
        match (&self.running, &self.summary) {
            (Some(r), _) => r.frame_count(),
            (None, Some(s)) => s.frame_count,
            (None, None) => 0,
        }
    }

    pub fn last_frame_time(&self) -> f64 {
        match (&self.running, &self.summary) {
            (Some(r), _) => r.last_frame_time(),
            (None, Some(s)) => s.last_frame_time,
            (None, None) => -1.0,
        }
    }
}

/// The output's directory has to exist; the file itself is created by the
/// sink once the pipeline starts.
fn check_output_dir(output: &Path) -> Result<()> {
    if output.is_dir() {
        return Err(RecorderError::OutputPath {
            path: output.to_path_buf(),
            reason: "is a directory".to_string(),
        });
    }
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(RecorderError::OutputPath {
            path: output.to_path_buf(),
            reason: format!("directory {} does not exist", dir.display()),
        });
    }
    Ok(())
}

fn install_frame_probe(pipeline: &gst::Pipeline, stats: &SharedStats) -> Result<()> {
    let pad = pipeline
        .by_name(CAPS_FILTER_NAME)
        .and_then(|filter| filter.static_pad("src"))
        .ok_or_else(|| RecorderError::MissingElement(CAPS_FILTER_NAME.to_string()))?;

    let stats = stats.clone();
    pad.add_probe(gst::PadProbeType::BUFFER, move |_, info| {
        if let Some(buffer) = info.buffer() {
            stats.frame(buffer.pts().map(|pts| pts.seconds_f64()));
        }
        gst::PadProbeReturn::Ok
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_dir_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope").join("out.mkv");
        assert!(matches!(
            check_output_dir(&missing),
            Err(RecorderError::OutputPath { .. })
        ));
        assert!(check_output_dir(&dir.path().join("out.mkv")).is_ok());
        assert!(check_output_dir(Path::new("relative.mkv")).is_ok());
    }

    #[test]
    fn test_output_cannot_be_a_directory() {
        let dir = tempdir().unwrap();
        let err = check_output_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn test_start_rejects_bad_caps_without_spawning() {
        let dir = tempdir().unwrap();
        let caps = CameraCaps::new(1280, 720, 30, 1, "NOT_A_FORMAT");
        let result = Recorder::start(caps, dir.path().join("out.mkv"), &RecorderOptions::default());
        assert!(matches!(result, Err(RecorderError::UnsupportedFormat(_))));
        assert!(!dir.path().join("out.mkv").exists());
    }

    #[test]
    fn test_start_rejects_unknown_container() {
        let dir = tempdir().unwrap();
        let caps = CameraCaps::new(1280, 720, 30, 1, "NV12");
        let result = Recorder::start(caps, dir.path().join("out.avi"), &RecorderOptions::default());
        assert!(matches!(result, Err(RecorderError::UnsupportedContainer(_))));
    }

    fn summary(frames: u64) -> RecordingSummary {
        RecordingSummary {
            output: PathBuf::from("test23.mkv"),
            caps: CameraCaps::new(1280, 720, 30, 1, "NV12"),
            frame_count: frames,
            last_frame_time: frames as f64 / 30.0,
            duration_ms: 1000.0,
            started_at: Utc::now(),
            finalized: true,
        }
    }

    #[test]
    fn test_second_stop_is_rejected() {
        let mut handle = StopOnce::new(30u64);
        assert_eq!(handle.stop_with(|n| Ok(summary(n))).unwrap().frame_count, 30);
        assert!(handle.is_stopped());

        let err = handle.stop_with(|n| Ok(summary(n))).unwrap_err();
        assert!(matches!(err, RecorderError::AlreadyStopped));
        assert_eq!(err.to_string(), "recording already stopped");
        assert_eq!(handle.summary().unwrap().frame_count, 30);
    }

    #[test]
    fn test_failed_stop_still_counts_as_stopped() {
        let mut handle = StopOnce::new(());
        let err = handle.stop_with(|_| Err(RecorderError::SessionLost)).unwrap_err();
        assert!(matches!(err, RecorderError::SessionLost));
        assert!(handle.summary().is_none());
        assert!(matches!(
            handle.stop_with(|_| Ok(summary(0))),
            Err(RecorderError::AlreadyStopped)
        ));
    }

    #[test]
    fn test_finish_after_stop_is_a_no_op() {
        let mut handle = StopOnce::new(12u64);
        handle.stop_with(|n| Ok(summary(n))).unwrap();
        let mut called = false;
        handle
            .finish_with(|n| {
                called = true;
                Ok(summary(n))
            })
            .unwrap();
        assert!(!called);

        let mut fresh = StopOnce::new(5u64);
        fresh.finish_with(|n| Ok(summary(n))).unwrap();
        assert_eq!(fresh.summary().unwrap().frame_count, 5);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = RecordingSummary {
            output: PathBuf::from("test23.mkv"),
            caps: CameraCaps::new(1280, 720, 30, 1, "NV12"),
            frame_count: 300,
            last_frame_time: 9.966,
            duration_ms: 10_000.0,
            started_at: Utc::now(),
            finalized: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["frameCount"], 300);
        assert_eq!(json["output"], "test23.mkv");
        assert_eq!(json["finalized"], true);
    }
}
