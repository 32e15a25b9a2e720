//! Captured audio frame with metadata.

use std::sync::Arc;
use std::time::Duration;

/// A discrete buffer of mono PCM16 samples with associated metadata.
///
/// `AudioFrame` is the unit of audio handed from the capture bridge to the
/// upstream send path. Each frame covers one contiguous span of mono audio
/// at a fixed sample rate and is immutable once produced.
///
/// Samples are stored in an `Arc<Vec<i16>>` so frames clone cheaply.
///
/// # Example
///
/// ```
/// use agent_stream::AudioFrame;
/// use std::time::Duration;
///
/// let frame = AudioFrame::new(vec![0i16; 1600], Duration::ZERO, 16000);
/// assert_eq!(frame.duration(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM audio samples in 16-bit signed integer format, mono.
    pub samples: Arc<Vec<i16>>,

    /// Timestamp from the start of the session.
    pub timestamp: Duration,

    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Creates a new `AudioFrame` with the given parameters.
    pub fn new(samples: Vec<i16>, timestamp: Duration, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            timestamp,
            sample_rate,
        }
    }

    /// Returns the duration of this frame.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Returns `true` if this frame contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Serializes the samples as little-endian bytes for the wire.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for &sample in self.samples.iter() {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_16khz() {
        let frame = AudioFrame::new(vec![0i16; 1600], Duration::ZERO, 16000);
        assert_eq!(frame.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_frame() {
        let frame = AudioFrame::new(vec![], Duration::ZERO, 16000);
        assert!(frame.is_empty());
        assert_eq!(frame.duration(), Duration::ZERO);
    }

    #[test]
    fn test_zero_sample_rate() {
        let frame = AudioFrame::new(vec![0i16; 100], Duration::ZERO, 0);
        assert_eq!(frame.duration(), Duration::ZERO);
    }

    #[test]
    fn test_to_le_bytes() {
        let frame = AudioFrame::new(vec![0x0102i16, -2], Duration::ZERO, 16000);
        assert_eq!(frame.to_le_bytes(), vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn test_cheap_clone_shares_samples() {
        let frame = AudioFrame::new(vec![1i16; 16], Duration::ZERO, 16000);
        let clone = frame.clone();
        assert!(Arc::ptr_eq(&frame.samples, &clone.samples));
    }
}
