//! Camera discovery through the GStreamer device monitor.

use gstreamer as gst;
use gstreamer::prelude::*;
use serde::{Deserialize, Serialize};

use crate::caps::CameraCaps;
use crate::error::Result;

/// A camera and the fixed modes it advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub name: String,
    pub device_class: String,
    pub modes: Vec<CameraCaps>,
}

/// List video sources currently attached.
pub fn list_cameras() -> Result<Vec<CameraInfo>> {
    gst::init()?;

    let monitor = gst::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);
    monitor.start()?;

    let cameras = monitor
        .devices()
        .iter()
        .map(|device| {
            let modes = device
                .caps()
                .map(|caps| modes_from_caps(&caps))
                .unwrap_or_default();
            CameraInfo {
                name: device.display_name().to_string(),
                device_class: device.device_class().to_string(),
                modes,
            }
        })
        .collect::<Vec<_>>();

    monitor.stop();
    tracing::debug!("found {} camera(s)", cameras.len());
    Ok(cameras)
}

/// Fixed, recordable modes in `caps`, without duplicates.
pub fn modes_from_caps(caps: &gst::CapsRef) -> Vec<CameraCaps> {
    let mut modes: Vec<CameraCaps> = Vec::new();
    for s in caps.iter() {
        if let Some(mode) = CameraCaps::from_structure(s) {
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
    }
    modes
}
