//! CPAL input device wrapper for microphone capture.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig};
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;

use crate::error::AgentStreamError;
use crate::format::pcm;

/// Wrapper around a CPAL audio input device.
///
/// Handles device selection and stream construction; the capture callback
/// converts every sample to PCM16 and pushes it into the ring buffer without
/// blocking. When the ring is full the newest samples are dropped and
/// counted - the callback never stalls.
#[must_use]
pub(crate) struct CaptureDevice {
    device: Device,
}

impl CaptureDevice {
    /// Opens the default input device.
    pub fn open_default() -> Result<Self, AgentStreamError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AgentStreamError::NoDefaultInputDevice)?;

        Ok(Self { device })
    }

    /// Opens a specific input device by name.
    pub fn open_by_name(name: &str) -> Result<Self, AgentStreamError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self { device });
                }
            }
        }

        Err(AgentStreamError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the device's native capture format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), AgentStreamError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// Starts capturing audio and returns a running stream.
    ///
    /// The returned `CaptureStream` must be kept alive for capture to
    /// continue. Samples land in the returned ring buffer consumer in the
    /// device-native format; `dropped` counts samples lost to ring overflow.
    pub fn start_capture(
        &self,
        ring_capacity: usize,
        dropped: Arc<AtomicU64>,
    ) -> Result<(CaptureStream, ringbuf::HeapCons<i16>), AgentStreamError> {
        let ring_buffer = HeapRb::<i16>::new(ring_capacity);
        let (producer, consumer) = ring_buffer.split();

        let supported_config = self
            .device
            .default_input_config()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let cpal_config: CpalStreamConfig = supported_config.into();

        let stream = match sample_format {
            SampleFormat::I16 => self.build_i16_stream(&cpal_config, producer, dropped)?,
            SampleFormat::F32 => self.build_f32_stream(&cpal_config, producer, dropped)?,
            format => {
                return Err(AgentStreamError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        tracing::info!(device = %self.name(), "capture started");

        Ok((CaptureStream { _stream: stream }, consumer))
    }

    fn build_i16_stream(
        &self,
        config: &CpalStreamConfig,
        mut producer: ringbuf::HeapProd<i16>,
        dropped: Arc<AtomicU64>,
    ) -> Result<Stream, AgentStreamError> {
        let stream = self
            .device
            .build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    // Non-blocking push - drops the newest samples if full
                    let pushed = producer.push_slice(data);
                    if pushed < data.len() {
                        dropped.fetch_add((data.len() - pushed) as u64, Ordering::Relaxed);
                    }
                },
                |err| {
                    tracing::error!("capture stream error: {err}");
                },
                None,
            )
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        Ok(stream)
    }

    fn build_f32_stream(
        &self,
        config: &CpalStreamConfig,
        mut producer: ringbuf::HeapProd<i16>,
        dropped: Arc<AtomicU64>,
    ) -> Result<Stream, AgentStreamError> {
        let stream = self
            .device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        if producer.try_push(pcm::f32_to_i16(sample)).is_err() {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                },
                |err| {
                    tracing::error!("capture stream error: {err}");
                },
                None,
            )
            .map_err(|e| AgentStreamError::BackendError(e.to_string()))?;

        Ok(stream)
    }
}

/// A running audio capture stream.
///
/// Capture continues while this struct is held. When dropped, the CPAL
/// stream is stopped and the microphone is released.
pub(crate) struct CaptureStream {
    /// The underlying CPAL stream. Dropping this stops capture.
    _stream: Stream,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Device tests require actual audio hardware and are skipped in CI
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_device() {
        let device = CaptureDevice::open_default().unwrap();
        println!("Default device: {}", device.name());
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_native_config() {
        let device = CaptureDevice::open_default().unwrap();
        let (rate, channels) = device.native_config().unwrap();
        assert!(rate > 0);
        assert!(channels > 0);
    }
}
