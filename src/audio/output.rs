//! CPAL output device wrapper for agent audio playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig};

use crate::error::AgentStreamError;
use crate::pipeline::PlaybackConsumer;

/// Wrapper around a CPAL audio output device.
///
/// The render callback pulls PCM16 samples from the playback queue and
/// writes silence on underrun; it never waits for the session side.
#[must_use]
pub(crate) struct PlaybackDevice {
    device: Device,
}

impl PlaybackDevice {
    /// Opens the default output device.
    pub fn open_default() -> Result<Self, AgentStreamError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AgentStreamError::NoDefaultOutputDevice)?;

        Ok(Self { device })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Starts playback at `sample_rate` and returns a running stream.
    ///
    /// The stream is requested at the wire rate directly; there is no
    /// resampling on the playback path. The returned `PlaybackStream` must
    /// be kept alive for audio to keep flowing.
    pub fn start_playback(
        &self,
        mut consumer: PlaybackConsumer,
        sample_rate: u32,
    ) -> Result<PlaybackStream, AgentStreamError> {
        let supported_config = self
            .device
            .default_output_config()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let channels = supported_config.channels();
        let config = CpalStreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Default,
        };

        let stream = match sample_format {
            SampleFormat::F32 => self
                .device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        consumer.render_f32(data, channels as usize);
                    },
                    |err| {
                        tracing::error!("playback stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| AgentStreamError::BackendError(e.to_string()))?,
            SampleFormat::I16 => self
                .device
                .build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        consumer.render_i16(data, channels as usize);
                    },
                    |err| {
                        tracing::error!("playback stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| AgentStreamError::BackendError(e.to_string()))?,
            format => {
                return Err(AgentStreamError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        tracing::info!(device = %self.name(), sample_rate, "playback started");

        Ok(PlaybackStream { _stream: stream })
    }
}

/// A running audio playback stream.
///
/// Playback continues while this struct is held. When dropped, the CPAL
/// stream is stopped and the output device released.
pub(crate) struct PlaybackStream {
    /// The underlying CPAL stream. Dropping this stops playback.
    _stream: Stream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_output() {
        let device = PlaybackDevice::open_default().unwrap();
        println!("Default output: {}", device.name());
    }
}
