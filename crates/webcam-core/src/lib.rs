//! Webcam recording on top of GStreamer.
//!
//! Build a [`CameraCaps`], call [`Recorder::start`] with an output path and
//! keep the handle while recording; [`Recorder::stop`] finalizes the file.
//! The pipeline runs on a background thread, so the caller is free to do
//! other work (or sleep) in between.

pub mod caps;
pub mod config;
pub mod demo;
pub mod devices;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod recorder;
pub mod service;
mod session;
pub mod stats;

pub use caps::CameraCaps;
pub use config::{DemoConfig, RecorderOptions, Rotation};
pub use demo::DemoDriver;
pub use devices::{list_cameras, CameraInfo};
pub use error::{RecorderError, Result};
pub use recorder::{Recorder, RecordingSummary, StopOnce};
pub use service::{GstRecordingService, RecordingService};

pub mod prelude {
    pub use crate::{CameraCaps, Recorder, RecorderOptions, RecordingService};
}
