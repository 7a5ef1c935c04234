//! Record the camera for a few seconds while printing a counter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use webcam_core::{DemoConfig, DemoDriver, GstRecordingService, Rotation};

/// CLI arguments; each one overrides the config file.
#[derive(Debug, Parser)]
#[command(name = "webcam-demo", version, about)]
struct Cli {
    /// JSON config file, see `DemoConfig`.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    fps_num: Option<i32>,
    #[arg(long)]
    fps_den: Option<i32>,
    /// Pixel format tag, e.g. NV12, YUY2, MJPG.
    #[arg(long)]
    format: Option<String>,
    /// Output file; the extension picks the container.
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Show a preview window while recording.
    #[arg(long, overrides_with = "no_display")]
    display: bool,
    /// Never show a preview window, even if the config asks for one.
    #[arg(long, overrides_with = "display")]
    no_display: bool,
    /// Rotation in degrees: 0, 90, 180 or 270.
    #[arg(long)]
    rotate: Option<u32>,
    /// Encoder bitrate in kbit/s.
    #[arg(long)]
    bitrate: Option<u32>,
    /// Source element, e.g. videotestsrc.
    #[arg(long)]
    source: Option<String>,
    /// List cameras and exit.
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn into_config(self) -> Result<DemoConfig> {
        let mut config = match &self.config {
            Some(path) => DemoConfig::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => DemoConfig::default(),
        };

        if let Some(v) = self.width {
            config.caps.width = v;
        }
        if let Some(v) = self.height {
            config.caps.height = v;
        }
        if let Some(v) = self.fps_num {
            config.caps.framerate_numerator = v;
        }
        if let Some(v) = self.fps_den {
            config.caps.framerate_denominator = v;
        }
        if let Some(v) = self.format {
            config.caps.format = v;
        }
        if let Some(v) = self.output {
            config.output = v;
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.interval_ms {
            config.interval_ms = v;
        }
        if self.display {
            config.recorder.display = true;
        } else if self.no_display {
            config.recorder.display = false;
        }
        if let Some(v) = self.rotate {
            config.recorder.rotation = Rotation::from_degrees(v)?;
        }
        if self.bitrate.is_some() {
            config.recorder.bitrate_kbps = self.bitrate;
        }
        if self.source.is_some() {
            config.recorder.source = self.source;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    webcam_core::logging::init();

    let cli = Cli::parse();
    if cli.list {
        for camera in webcam_core::list_cameras()? {
            println!("{} ({})", camera.name, camera.device_class);
            for mode in camera.modes {
                println!("    {}", mode);
            }
        }
        return Ok(());
    }

    let config = cli.into_config()?;
    let service = GstRecordingService::new(config.recorder.clone());
    let driver = DemoDriver::from_config(&config);

    let summary = driver
        .run(
            &service,
            &config.caps,
            &config.output,
            &mut std::io::stdout().lock(),
        )
        .with_context(|| format!("recording to {}", config.output.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
