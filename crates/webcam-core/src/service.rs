//! The start/stop contract the demo driver is written against.

use std::path::Path;

use crate::caps::CameraCaps;
use crate::config::RecorderOptions;
use crate::error::Result;
use crate::recorder::{Recorder, RecordingSummary};

/// Something that can record a camera to a file.
///
/// `start_recording` hands out a session token that `stop_recording`
/// consumes exactly once.
pub trait RecordingService {
    type Session;

    fn start_recording(&self, caps: &CameraCaps, output: &Path) -> Result<Self::Session>;

    fn stop_recording(&self, session: Self::Session) -> Result<RecordingSummary>;
}

/// GStreamer-backed service, one pipeline per session.
#[derive(Debug, Clone, Default)]
pub struct GstRecordingService {
    options: RecorderOptions,
}

impl GstRecordingService {
    pub fn new(options: RecorderOptions) -> Self {
        GstRecordingService { options }
    }

    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }
}

impl RecordingService for GstRecordingService {
    type Session = Recorder;

    fn start_recording(&self, caps: &CameraCaps, output: &Path) -> Result<Recorder> {
        Recorder::start(caps.clone(), output, &self.options)
    }

    fn stop_recording(&self, session: Recorder) -> Result<RecordingSummary> {
        session.stop()
    }
}
