//! Error types for the recording engine.

use std::path::PathBuf;

use gstreamer::prelude::*;
use thiserror::Error;

/// Everything that can go wrong between building caps and finalizing a file.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("invalid camera caps: {0}")]
    InvalidCaps(String),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported output container for {}: expected .mkv, .mp4, .mov or .ts", .0.display())]
    UnsupportedContainer(PathBuf),

    #[error("invalid rotation {0}: expected 0, 90, 180 or 270")]
    InvalidRotation(u32),

    #[error("output path {}: {reason}", path.display())]
    OutputPath { path: PathBuf, reason: String },

    #[error("failed to initialize GStreamer: {0}")]
    Init(#[from] gstreamer::glib::Error),

    #[error("GStreamer element '{0}' is not available, is its plugin installed?")]
    MissingElement(String),

    #[error("element error: {0}")]
    Element(#[from] gstreamer::glib::BoolError),

    #[error("pipeline state change failed: {0}")]
    StateChange(#[from] gstreamer::StateChangeError),

    #[error("pipeline error from {source_path}: {message}")]
    Pipeline {
        source_path: String,
        message: String,
        debug: Option<String>,
    },

    #[error("pipeline did not reach PLAYING within {0} ms")]
    StartTimeout(u64),

    #[error("recording already stopped")]
    AlreadyStopped,

    #[error("recording session ended unexpectedly")]
    SessionLost,

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    /// True for errors caused by the caller's arguments rather than the
    /// environment (missing plugins, busy devices, ...).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            RecorderError::InvalidCaps(_)
                | RecorderError::UnsupportedFormat(_)
                | RecorderError::UnsupportedContainer(_)
                | RecorderError::InvalidRotation(_)
        )
    }

    pub(crate) fn from_error_message(err: &gstreamer::message::Error) -> Self {
        RecorderError::Pipeline {
            source_path: err
                .src()
                .map(|s| s.path_string().to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }
    }
}

/// Result type alias using RecorderError
pub type Result<T> = std::result::Result<T, RecorderError>;
