//! Demo driver: start a recording, print a message once per interval, stop.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::caps::CameraCaps;
use crate::config::DemoConfig;
use crate::error::Result;
use crate::recorder::RecordingSummary;
use crate::service::RecordingService;

#[derive(Debug, Clone)]
pub struct DemoDriver {
    pub iterations: usize,
    pub interval: Duration,
    pub message: String,
}

impl Default for DemoDriver {
    fn default() -> Self {
        DemoDriver {
            iterations: 10,
            interval: Duration::from_secs(1),
            message: "Hello World Number ".to_string(),
        }
    }
}

impl DemoDriver {
    pub fn from_config(config: &DemoConfig) -> Self {
        DemoDriver {
            iterations: config.iterations,
            interval: Duration::from_millis(config.interval_ms),
            ..Default::default()
        }
    }

    /// Record while printing `iterations` numbered lines to `out`.
    ///
    /// The recording is stopped on every path once it has started; a failure
    /// while printing is returned after the stop.
    pub fn run<S, W>(
        &self,
        service: &S,
        caps: &CameraCaps,
        output: &Path,
        out: &mut W,
    ) -> Result<RecordingSummary>
    where
        S: RecordingService,
        W: Write,
    {
        let session = service.start_recording(caps, output)?;
        let looped = self.print_loop(out);
        let stopped = service.stop_recording(session);
        looped?;
        stopped
    }

    /// Message and counter are joined by a space, so the default message's
    /// trailing space gives `Hello World Number  3`.
    fn print_loop<W: Write>(&self, out: &mut W) -> Result<()> {
        for i in 0..self.iterations {
            writeln!(out, "{} {}", self.message, i)?;
            out.flush()?;
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
        Ok(())
    }
}
