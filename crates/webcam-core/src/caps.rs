//! Requested capture mode.
//!
//! A `CameraCaps` is what the caller asks the camera for. It is validated
//! before any pipeline is built and rendered into a GStreamer caps string
//! for the capsfilter that sits right after the camera source.

use std::fmt;

use gstreamer_video::VideoFormat;
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

/// Media type of raw camera output.
pub const RAW_MEDIA_TYPE: &str = "video/x-raw";
/// Media type of motion-JPEG camera output.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

const JPEG_FORMAT_TAGS: [&str; 3] = ["MJPG", "MJPEG", "JPEG"];

/// Capture resolution, framerate and pixel format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCaps {
    pub width: i32,
    pub height: i32,
    pub framerate_numerator: i32,
    pub framerate_denominator: i32,
    pub format: String,
}

impl CameraCaps {
    pub fn new(
        width: i32,
        height: i32,
        framerate_numerator: i32,
        framerate_denominator: i32,
        format: impl Into<String>,
    ) -> Self {
        CameraCaps {
            width,
            height,
            framerate_numerator,
            framerate_denominator,
            format: format.into(),
        }
    }

    /// Check dimensions, framerate and format tag.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(RecorderError::InvalidCaps(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.framerate_numerator <= 0 || self.framerate_denominator <= 0 {
            return Err(RecorderError::InvalidCaps(format!(
                "framerate must be positive, got {}/{}",
                self.framerate_numerator, self.framerate_denominator
            )));
        }
        self.pixel_format().map(|_| ())
    }

    /// Frames per second as a float.
    pub fn framerate(&self) -> f64 {
        if self.framerate_denominator == 0 {
            return 0.0;
        }
        self.framerate_numerator as f64 / self.framerate_denominator as f64
    }

    /// Whether the camera delivers motion-JPEG that needs decoding.
    pub fn is_jpeg(&self) -> bool {
        matches!(self.pixel_format(), Ok(PixelFormat::Jpeg))
    }

    /// `video/x-raw` or `image/jpeg`.
    pub fn media_type(&self) -> &'static str {
        if self.is_jpeg() {
            JPEG_MEDIA_TYPE
        } else {
            RAW_MEDIA_TYPE
        }
    }

    /// Render the caps in GStreamer's textual form, e.g.
    /// `video/x-raw,format=NV12,width=1280,height=720,framerate=30/1`.
    pub fn to_caps_string(&self) -> Result<String> {
        self.validate()?;
        let dims = format!(
            "width={},height={},framerate={}/{}",
            self.width, self.height, self.framerate_numerator, self.framerate_denominator
        );
        Ok(match self.pixel_format()? {
            PixelFormat::Raw(format) => {
                format!("{},format={},{}", RAW_MEDIA_TYPE, format.to_str(), dims)
            }
            PixelFormat::Jpeg => format!("{},{}", JPEG_MEDIA_TYPE, dims),
        })
    }

    /// Build caps from a fixed GStreamer caps structure, as advertised by a
    /// device. Returns `None` for ranges, lists or media types we don't record.
    pub fn from_structure(s: &gstreamer::StructureRef) -> Option<Self> {
        let width = s.get::<i32>("width").ok()?;
        let height = s.get::<i32>("height").ok()?;
        let framerate = s.get::<gstreamer::Fraction>("framerate").ok()?;
        let format = match s.name().as_str() {
            RAW_MEDIA_TYPE => s.get::<&str>("format").ok()?.to_string(),
            JPEG_MEDIA_TYPE => "MJPG".to_string(),
            _ => return None,
        };
        let caps = CameraCaps::new(width, height, framerate.numer(), framerate.denom(), format);
        caps.validate().ok()?;
        Some(caps)
    }

    fn pixel_format(&self) -> Result<PixelFormat> {
        let tag = self.format.trim();
        if JPEG_FORMAT_TAGS
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
        {
            return Ok(PixelFormat::Jpeg);
        }
        // GStreamer names are mixed case (BGRx, xRGB, v210), so an exact
        // match wins and anything else is looked up ignoring case.
        let exact = VideoFormat::from_string(tag);
        let format = if matches!(exact, VideoFormat::Unknown | VideoFormat::Encoded) {
            VideoFormat::iter_raw().find(|f| f.to_str().as_str().eq_ignore_ascii_case(tag))
        } else {
            Some(exact)
        };
        format
            .map(PixelFormat::Raw)
            .ok_or_else(|| RecorderError::UnsupportedFormat(self.format.clone()))
    }
}

impl fmt::Display for CameraCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}/{} {}",
            self.width, self.height, self.framerate_numerator, self.framerate_denominator, self.format
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum PixelFormat {
    Raw(VideoFormat),
    Jpeg,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hd_nv12() -> CameraCaps {
        CameraCaps::new(1280, 720, 30, 1, "NV12")
    }

    #[test]
    fn test_valid_caps_render_raw_string() {
        let caps = hd_nv12();
        caps.validate().unwrap();
        assert_eq!(
            caps.to_caps_string().unwrap(),
            "video/x-raw,format=NV12,width=1280,height=720,framerate=30/1"
        );
        assert_eq!(caps.media_type(), RAW_MEDIA_TYPE);
    }

    #[test]
    fn test_lowercase_format_is_accepted() {
        let caps = CameraCaps::new(1920, 1080, 30, 1, "yuy2");
        assert!(caps.to_caps_string().unwrap().contains("format=YUY2"));
    }

    #[test]
    fn test_mixed_case_format_names_are_found() {
        let caps = CameraCaps::new(640, 480, 30, 1, "bgrx");
        assert_eq!(
            caps.to_caps_string().unwrap(),
            "video/x-raw,format=BGRx,width=640,height=480,framerate=30/1"
        );
        let caps = CameraCaps::new(640, 480, 30, 1, "XRGB");
        assert!(caps.to_caps_string().unwrap().contains("format=xRGB"));
        let caps = CameraCaps::new(640, 480, 30, 1, "V210");
        assert!(caps.to_caps_string().unwrap().contains("format=v210"));
    }

    #[test]
    fn test_mjpeg_uses_jpeg_media_type() {
        let caps = CameraCaps::new(1920, 1080, 30, 1, "MJPG");
        assert!(caps.is_jpeg());
        assert_eq!(
            caps.to_caps_string().unwrap(),
            "image/jpeg,width=1920,height=1080,framerate=30/1"
        );
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let caps = CameraCaps::new(0, 720, 30, 1, "NV12");
        assert!(matches!(caps.validate(), Err(RecorderError::InvalidCaps(_))));
        let caps = CameraCaps::new(1280, -1, 30, 1, "NV12");
        assert!(matches!(caps.validate(), Err(RecorderError::InvalidCaps(_))));
    }

    #[test]
    fn test_rejects_zero_denominator() {
        let caps = CameraCaps::new(1280, 720, 30, 0, "NV12");
        assert!(matches!(caps.validate(), Err(RecorderError::InvalidCaps(_))));
        assert_eq!(caps.framerate(), 0.0);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let caps = CameraCaps::new(1280, 720, 30, 1, "NOPE");
        assert!(matches!(
            caps.validate(),
            Err(RecorderError::UnsupportedFormat(f)) if f == "NOPE"
        ));
    }

    #[test]
    fn test_fractional_framerate() {
        let caps = CameraCaps::new(640, 480, 30000, 1001, "I420");
        assert!((caps.framerate() - 29.97).abs() < 0.01);
        assert_eq!(caps.to_string(), "640x480@30000/1001 I420");
    }

    #[test]
    fn test_caps_from_json() {
        let caps: CameraCaps = serde_json::from_str(
            r#"{"width":1920,"height":1080,"framerate_numerator":30,"framerate_denominator":1,"format":"YUY2"}"#,
        )
        .unwrap();
        assert_eq!(caps, CameraCaps::new(1920, 1080, 30, 1, "YUY2"));
    }

    #[test]
    fn test_from_fixed_structure() {
        gstreamer::init().unwrap();
        let s = gstreamer::Structure::builder(RAW_MEDIA_TYPE)
            .field("format", "YUY2")
            .field("width", 640i32)
            .field("height", 480i32)
            .field("framerate", gstreamer::Fraction::new(15, 1))
            .build();
        assert_eq!(
            CameraCaps::from_structure(&s),
            Some(CameraCaps::new(640, 480, 15, 1, "YUY2"))
        );
    }

    #[test]
    fn test_from_structure_skips_ranges() {
        gstreamer::init().unwrap();
        let s = gstreamer::Structure::builder(RAW_MEDIA_TYPE)
            .field("format", "YUY2")
            .field("width", gstreamer::IntRange::new(320, 1920))
            .field("height", 480i32)
            .field("framerate", gstreamer::Fraction::new(15, 1))
            .build();
        assert_eq!(CameraCaps::from_structure(&s), None);
    }
}
