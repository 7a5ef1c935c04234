//! Pipeline plan: the element graph for one recording.
//!
//! The plan is plain data so it can be inspected and logged before any
//! GStreamer object exists. `build` turns it into a `gst::Pipeline`:
//!
//! ```text
//! source ! capsfilter [! jpegdec] ! videoflip ! tee
//!   tee. ! queue ! videoconvert ! x264enc ! h264parse ! <muxer> ! filesink
//!   tee. ! queue ! videoconvert ! autovideosink          (display only)
//! ```

use std::fmt::Write as _;
use std::path::Path;

use gstreamer as gst;
use gstreamer::prelude::*;

use crate::caps::CameraCaps;
use crate::config::RecorderOptions;
use crate::error::{RecorderError, Result};

/// Name given to the pipeline object.
pub const PIPELINE_NAME: &str = "webcam-recorder";
/// Name of the capsfilter; the frame probe hangs off its src pad.
pub const CAPS_FILTER_NAME: &str = "capsfilter";

/// Output container, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Matroska,
    Mp4,
    QuickTime,
    MpegTs,
}

impl Container {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("mkv") => Ok(Container::Matroska),
            Some("mp4") => Ok(Container::Mp4),
            Some("mov") => Ok(Container::QuickTime),
            Some("ts") => Ok(Container::MpegTs),
            _ => Err(RecorderError::UnsupportedContainer(path.to_path_buf())),
        }
    }

    /// Muxer element factory.
    pub fn muxer(self) -> &'static str {
        match self {
            Container::Matroska => "matroskamux",
            Container::Mp4 => "mp4mux",
            Container::QuickTime => "qtmux",
            Container::MpegTs => "mpegtsmux",
        }
    }
}

/// Platform camera source element.
pub fn default_source_factory() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "v4l2src"
    }

    #[cfg(target_os = "windows")]
    {
        "mfvideosrc"
    }

    #[cfg(target_os = "macos")]
    {
        "avfvideosrc"
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "autovideosrc"
    }
}

/// One element of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub factory: String,
    pub name: String,
    /// Properties in their string form, applied with `property_from_str`.
    pub properties: Vec<(String, String)>,
}

impl ElementSpec {
    fn new(factory: impl Into<String>, name: impl Into<String>) -> Self {
        ElementSpec {
            factory: factory.into(),
            name: name.into(),
            properties: Vec::new(),
        }
    }

    fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.properties.push((key.to_string(), value.to_string()));
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn make(&self) -> Result<gst::Element> {
        let mut builder = gst::ElementFactory::make(&self.factory).name(self.name.as_str());
        for (key, value) in &self.properties {
            builder = builder.property_from_str(key, value);
        }
        builder.build().map_err(|e| {
            tracing::warn!("failed to create {} ({}): {}", self.name, self.factory, e);
            RecorderError::MissingElement(self.factory.clone())
        })
    }

    fn describe(&self, out: &mut String) {
        let _ = write!(out, "{} name={}", self.factory, self.name);
        for (key, value) in &self.properties {
            if value.contains(',') || value.contains(' ') {
                let _ = write!(out, " {}=\"{}\"", key, value);
            } else {
                let _ = write!(out, " {}={}", key, value);
            }
        }
    }
}

/// The full element graph for one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    /// Camera to tee, linked in order.
    pub capture: Vec<ElementSpec>,
    /// Tee to file, linked in order.
    pub record: Vec<ElementSpec>,
    /// Tee to preview window, when enabled.
    pub display: Option<Vec<ElementSpec>>,
    pub container: Container,
}

impl PipelinePlan {
    pub fn new(caps: &CameraCaps, output: &Path, options: &RecorderOptions) -> Result<Self> {
        let caps_string = caps.to_caps_string()?;
        let container = Container::from_path(output)?;
        let location = output.to_str().ok_or_else(|| RecorderError::OutputPath {
            path: output.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;

        let source = options
            .source
            .as_deref()
            .unwrap_or_else(|| default_source_factory());

        let mut capture = vec![
            ElementSpec::new(source, "source"),
            ElementSpec::new("capsfilter", CAPS_FILTER_NAME).with("caps", &caps_string),
        ];
        if caps.is_jpeg() {
            capture.push(ElementSpec::new("jpegdec", "jpegdec"));
        }
        capture.push(
            ElementSpec::new("videoflip", "rotate")
                .with("video-direction", options.rotation.video_direction()),
        );
        capture.push(ElementSpec::new("tee", "tee"));

        let mut encoder = ElementSpec::new("x264enc", "encoder")
            .with("tune", "zerolatency")
            .with("speed-preset", "ultrafast");
        if let Some(bitrate) = options.bitrate_kbps {
            encoder = encoder.with("bitrate", bitrate);
        }

        let record = vec![
            ElementSpec::new("queue", "record-queue").with("max-size-buffers", 1u32),
            ElementSpec::new("videoconvert", "record-convert"),
            encoder,
            ElementSpec::new("h264parse", "parser"),
            ElementSpec::new(container.muxer(), "muxer"),
            ElementSpec::new("filesink", "sink").with("location", location),
        ];

        let display = options.display.then(|| {
            vec![
                ElementSpec::new("queue", "display-queue"),
                ElementSpec::new("videoconvert", "display-convert"),
                ElementSpec::new("autovideosink", "display-sink"),
            ]
        });

        Ok(PipelinePlan {
            capture,
            record,
            display,
            container,
        })
    }

    /// Every element in the plan, capture chain first.
    pub fn elements(&self) -> impl Iterator<Item = &ElementSpec> {
        self.capture
            .iter()
            .chain(self.record.iter())
            .chain(self.display.iter().flatten())
    }

    /// `gst-launch-1.0` style rendering, for logs.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        describe_chain(&self.capture, &mut out);
        out.push_str("  tee. ! ");
        describe_chain(&self.record, &mut out);
        if let Some(display) = &self.display {
            out.push_str("  tee. ! ");
            describe_chain(display, &mut out);
        }
        out
    }

    /// Create, add and link every element. GStreamer must be initialized.
    pub fn build(&self) -> Result<gst::Pipeline> {
        let pipeline = gst::Pipeline::with_name(PIPELINE_NAME);

        let capture = make_chain(&self.capture)?;
        let record = make_chain(&self.record)?;
        pipeline.add_many(capture.iter().chain(record.iter()))?;
        gst::Element::link_many(capture.iter())?;

        let tee = capture
            .last()
            .ok_or_else(|| RecorderError::MissingElement("tee".to_string()))?;
        gst::Element::link_many(std::iter::once(tee).chain(record.iter()))?;

        if let Some(display) = &self.display {
            let display = make_chain(display)?;
            pipeline.add_many(display.iter())?;
            gst::Element::link_many(std::iter::once(tee).chain(display.iter()))?;
        }

        Ok(pipeline)
    }
}

fn make_chain(specs: &[ElementSpec]) -> Result<Vec<gst::Element>> {
    specs.iter().map(ElementSpec::make).collect()
}

fn describe_chain(specs: &[ElementSpec], out: &mut String) {
    for (i, spec) in specs.iter().enumerate() {
        if i > 0 {
            out.push_str(" ! ");
        }
        spec.describe(out);
    }
}
