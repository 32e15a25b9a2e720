//! Capture bridge task - reads from the capture ring, converts format, and
//! forwards frames toward the upstream send path.
//!
//! The real-time callback only pushes device-native samples into the ring;
//! this task runs on the tokio side and owns everything that may allocate or
//! wait: chunking, channel downmix, resampling to the wire rate, and the
//! async channel send.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ringbuf::traits::{Consumer, Observer};
use tokio::sync::mpsc;

use crate::config::CAPTURE_SAMPLE_RATE;
use crate::format::FormatConverter;
use crate::frame::AudioFrame;
use crate::session::SessionState;

/// Configuration for the capture bridge task.
#[derive(Debug, Clone)]
pub(crate) struct CaptureBridgeConfig {
    /// Device-native sample rate.
    pub device_sample_rate: u32,
    /// Device-native channel count.
    pub device_channels: u16,
    /// Duration of each frame sent upstream.
    pub chunk_duration: Duration,
}

/// Reads device-format audio from the ring buffer and forwards wire-format
/// frames.
struct CaptureBridge {
    consumer: ringbuf::HeapCons<i16>,
    converter: FormatConverter,
    frame_tx: mpsc::Sender<AudioFrame>,
    state: Arc<SessionState>,
    /// Device samples per chunk (frames x channels).
    chunk_size: usize,
    poll_interval: Duration,
    /// Wire samples forwarded so far, for frame timestamps.
    samples_forwarded: u64,
}

impl CaptureBridge {
    fn new(
        consumer: ringbuf::HeapCons<i16>,
        config: &CaptureBridgeConfig,
        frame_tx: mpsc::Sender<AudioFrame>,
        state: Arc<SessionState>,
    ) -> Self {
        tracing::info!(
            "capture bridge starting: device={}Hz/{}ch, wire={}Hz/mono, chunk={:?}",
            config.device_sample_rate,
            config.device_channels,
            CAPTURE_SAMPLE_RATE,
            config.chunk_duration
        );

        let frames_per_chunk =
            (f64::from(config.device_sample_rate) * config.chunk_duration.as_secs_f64()) as usize;
        let chunk_size = frames_per_chunk * config.device_channels.max(1) as usize;

        let converter = FormatConverter::new(
            config.device_sample_rate,
            config.device_channels,
            CAPTURE_SAMPLE_RATE,
        );

        Self {
            consumer,
            converter,
            frame_tx,
            state,
            chunk_size,
            // Poll at half the chunk duration for responsiveness
            poll_interval: config.chunk_duration / 2,
            samples_forwarded: 0,
        }
    }

    async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);

        while self.state.running.load(Ordering::SeqCst) {
            interval.tick().await;

            while let Some(frame) = self.next_frame() {
                if self.frame_tx.send(frame).await.is_err() {
                    // Upstream pump gone, stop bridging
                    return;
                }
            }
        }

        // Forward whatever is left in the ring on shutdown
        self.drain_remaining().await;
    }

    /// Produces the next complete frame, or `None` if not enough samples
    /// have accumulated yet.
    fn next_frame(&mut self) -> Option<AudioFrame> {
        if self.consumer.occupied_len() < self.chunk_size {
            return None;
        }
        self.read_frame(self.chunk_size)
    }

    fn read_frame(&mut self, device_samples: usize) -> Option<AudioFrame> {
        let mut raw = Vec::with_capacity(device_samples);
        for _ in 0..device_samples {
            match self.consumer.try_pop() {
                Some(sample) => raw.push(sample),
                None => break,
            }
        }
        if raw.is_empty() {
            return None;
        }

        let converted = self.converter.convert(&raw);
        let timestamp = Duration::from_secs_f64(
            self.samples_forwarded as f64 / f64::from(CAPTURE_SAMPLE_RATE),
        );
        self.samples_forwarded += converted.len() as u64;

        self.state
            .samples_captured
            .fetch_add(converted.len() as u64, Ordering::SeqCst);

        Some(AudioFrame::new(converted, timestamp, CAPTURE_SAMPLE_RATE))
    }

    async fn drain_remaining(&mut self) {
        while self.consumer.occupied_len() > 0 {
            let remaining = self.consumer.occupied_len().min(self.chunk_size);
            let Some(frame) = self.read_frame(remaining) else {
                break;
            };
            // Best effort - don't block on send during shutdown
            if self.frame_tx.try_send(frame).is_err() {
                break;
            }
        }
    }
}

/// Spawns the capture bridge as a background task.
pub(crate) fn spawn_capture_bridge(
    consumer: ringbuf::HeapCons<i16>,
    config: &CaptureBridgeConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    state: Arc<SessionState>,
) -> tokio::task::JoinHandle<()> {
    let bridge = CaptureBridge::new(consumer, config, frame_tx, state);
    tokio::spawn(bridge.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Producer, Split};
    use ringbuf::HeapRb;

    fn bridge_with_ring(
        capacity: usize,
        config: &CaptureBridgeConfig,
    ) -> (ringbuf::HeapProd<i16>, CaptureBridge, mpsc::Receiver<AudioFrame>) {
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        let (frame_tx, frame_rx) = mpsc::channel(16);
        let bridge = CaptureBridge::new(
            consumer,
            config,
            frame_tx,
            Arc::new(SessionState::new()),
        );
        (producer, bridge, frame_rx)
    }

    #[test]
    fn test_no_frame_until_full_chunk() {
        let config = CaptureBridgeConfig {
            device_sample_rate: 16000,
            device_channels: 1,
            chunk_duration: Duration::from_millis(100),
        };
        let (mut producer, mut bridge, _rx) = bridge_with_ring(16000, &config);

        // 50ms worth - not enough for a 100ms chunk
        for i in 0..800i16 {
            let _ = producer.try_push(i);
        }
        assert!(bridge.next_frame().is_none());

        for i in 0..800i16 {
            let _ = producer.try_push(i);
        }
        let frame = bridge.next_frame().unwrap();
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.sample_rate, 16000);
    }

    #[test]
    fn test_converts_to_wire_format() {
        // Device at 48kHz stereo, wire at 16kHz mono
        let config = CaptureBridgeConfig {
            device_sample_rate: 48000,
            device_channels: 2,
            chunk_duration: Duration::from_millis(100),
        };
        let (mut producer, mut bridge, _rx) = bridge_with_ring(48000, &config);

        // 100ms at 48kHz stereo = 9600 samples
        for _ in 0..9600 {
            let _ = producer.try_push(100);
        }

        let frame = bridge.next_frame().unwrap();
        assert_eq!(frame.sample_rate, CAPTURE_SAMPLE_RATE);
        // 100ms at 16kHz mono
        assert_eq!(frame.samples.len(), 1600);
    }

    #[test]
    fn test_timestamps_advance_per_frame() {
        let config = CaptureBridgeConfig {
            device_sample_rate: 16000,
            device_channels: 1,
            chunk_duration: Duration::from_millis(100),
        };
        let (mut producer, mut bridge, _rx) = bridge_with_ring(16000, &config);

        for _ in 0..3200 {
            let _ = producer.try_push(0);
        }

        let first = bridge.next_frame().unwrap();
        let second = bridge.next_frame().unwrap();
        assert_eq!(first.timestamp, Duration::ZERO);
        assert_eq!(second.timestamp, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_drain_forwards_partial_chunk() {
        let config = CaptureBridgeConfig {
            device_sample_rate: 16000,
            device_channels: 1,
            chunk_duration: Duration::from_millis(100),
        };
        let (mut producer, mut bridge, mut rx) = bridge_with_ring(16000, &config);

        // Less than one chunk
        for _ in 0..400 {
            let _ = producer.try_push(7);
        }

        bridge.drain_remaining().await;
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.samples.len(), 400);
    }
}
