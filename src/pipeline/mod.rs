//! Pipeline internals bridging the real-time callbacks and the session
//! controller.

mod capture;
mod playback;

pub(crate) use capture::{spawn_capture_bridge, CaptureBridgeConfig};
pub(crate) use playback::{playback_queue, PlaybackConsumer, PlaybackProducer};
