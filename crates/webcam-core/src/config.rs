//! Recorder options and demo configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::caps::CameraCaps;
use crate::error::{RecorderError, Result};

/// Clockwise rotation applied before the tee, so it affects both the
/// recording and the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::Rotate0),
            90 => Ok(Rotation::Rotate90),
            180 => Ok(Rotation::Rotate180),
            270 => Ok(Rotation::Rotate270),
            other => Err(RecorderError::InvalidRotation(other)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Nick of the matching `videoflip` video-direction value.
    pub fn video_direction(self) -> &'static str {
        match self {
            Rotation::Rotate0 => "identity",
            Rotation::Rotate90 => "90r",
            Rotation::Rotate180 => "180",
            Rotation::Rotate270 => "90l",
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = RecorderError;

    fn try_from(degrees: u32) -> Result<Self> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> u32 {
        rotation.degrees()
    }
}

/// Knobs for a single recording, on top of the caps and output path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderOptions {
    /// Show a live preview window next to the recording.
    pub display: bool,

    pub rotation: Rotation,

    /// Encoder bitrate in kbit/s. `None` keeps the encoder default.
    pub bitrate_kbps: Option<u32>,

    /// Source element factory. `None` picks the platform camera source.
    pub source: Option<String>,

    /// How long `start` waits for the pipeline to reach PLAYING.
    pub start_timeout_ms: u64,

    /// How long `stop` waits for end-of-stream before forcing teardown.
    pub stop_timeout_ms: u64,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            display: false,
            rotation: Rotation::Rotate0,
            bitrate_kbps: None,
            source: None,
            start_timeout_ms: 10_000,
            stop_timeout_ms: 5_000,
        }
    }
}

impl RecorderOptions {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Configuration of the `webcam-demo` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub caps: CameraCaps,
    pub output: PathBuf,
    pub iterations: usize,
    pub interval_ms: u64,
    pub recorder: RecorderOptions,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            caps: CameraCaps::new(1280, 720, 30, 1, "NV12"),
            output: PathBuf::from("test23.mkv"),
            iterations: 10,
            interval_ms: 1_000,
            recorder: RecorderOptions::default(),
        }
    }
}

impl DemoConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rotation_degrees() {
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Rotate90);
        assert_eq!(Rotation::Rotate270.degrees(), 270);
        assert_eq!(Rotation::Rotate270.video_direction(), "90l");
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(RecorderError::InvalidRotation(45))
        ));
    }

    #[test]
    fn test_options_defaults_fill_missing_fields() {
        let options: RecorderOptions =
            serde_json::from_str(r#"{"display": true, "rotation": 180}"#).unwrap();
        assert!(options.display);
        assert_eq!(options.rotation, Rotation::Rotate180);
        assert_eq!(options.bitrate_kbps, None);
        assert_eq!(options.start_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_options_reject_bad_rotation() {
        let result: std::result::Result<RecorderOptions, _> =
            serde_json::from_str(r#"{"rotation": 45}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_demo_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.json");
        std::fs::write(
            &path,
            r#"{
                "caps": {"width":1920,"height":1080,"framerate_numerator":30,"framerate_denominator":1,"format":"YUY2"},
                "output": "test23.mp4",
                "recorder": {"bitrate_kbps": 8500}
            }"#,
        )
        .unwrap();

        let config = DemoConfig::from_json_file(&path).unwrap();
        assert_eq!(config.caps.format, "YUY2");
        assert_eq!(config.output, PathBuf::from("test23.mp4"));
        assert_eq!(config.iterations, 10);
        assert_eq!(config.recorder.bitrate_kbps, Some(8500));
    }

    #[test]
    fn test_demo_config_missing_file() {
        let dir = tempdir().unwrap();
        let result = DemoConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(RecorderError::Io(_))));
    }
}
