//! CPAL device wrappers for capture and playback.
//!
//! Both directions follow the same discipline: the real-time callback only
//! converts samples and touches a lock-free ring buffer. Everything else
//! (format conversion, networking, dispatch) happens on the tokio side.

mod input;
mod output;

pub(crate) use input::{CaptureDevice, CaptureStream};
pub(crate) use output::{PlaybackDevice, PlaybackStream};

use cpal::traits::{DeviceTrait, HostTrait};

/// Returns the names of all available input devices.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            Vec::new()
        }
    }
}

/// Returns the name of the default input device, if one exists.
pub fn default_input_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_input_device().and_then(|d| d.name().ok())
}
