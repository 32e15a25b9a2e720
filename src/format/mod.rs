//! Audio format handling: sample codec, channel and rate conversion.

pub mod pcm;
pub mod resample;

pub use pcm::{f32_to_i16, i16_to_f32};

/// Converts audio from a device-native format to the upstream wire format.
///
/// Combines channel downmix and sample rate conversion in the order that
/// minimizes work (downmix first, then resample half the samples).
#[derive(Debug, Clone)]
pub struct FormatConverter {
    from_rate: u32,
    from_channels: u16,
    to_rate: u32,
}

impl FormatConverter {
    /// Creates a converter from the given device format to mono at `to_rate`.
    pub fn new(from_rate: u32, from_channels: u16, to_rate: u32) -> Self {
        Self {
            from_rate,
            from_channels,
            to_rate,
        }
    }

    /// Returns `true` if conversion is a no-op.
    pub fn is_passthrough(&self) -> bool {
        self.from_rate == self.to_rate && self.from_channels == 1
    }

    /// Converts interleaved device samples to mono samples at the target rate.
    pub fn convert(&self, samples: &[i16]) -> Vec<i16> {
        let mono = match self.from_channels {
            0 | 1 => samples.to_vec(),
            2 => resample::stereo_to_mono(samples),
            n => resample::downmix_to_mono(samples, n),
        };

        resample::resample(&mono, self.from_rate, self.to_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        let conv = FormatConverter::new(16000, 1, 16000);
        assert!(conv.is_passthrough());

        let samples = vec![1i16, 2, 3];
        assert_eq!(conv.convert(&samples), samples);
    }

    #[test]
    fn test_stereo_downmix_and_downsample() {
        let conv = FormatConverter::new(48000, 2, 16000);
        assert!(!conv.is_passthrough());

        // 480 stereo frames at 48kHz -> 160 mono samples at 16kHz
        let samples = vec![100i16; 960];
        let converted = conv.convert(&samples);
        assert_eq!(converted.len(), 160);
        assert!(converted.iter().all(|&s| s == 100));
    }

    #[test]
    fn test_multichannel_downmix() {
        let conv = FormatConverter::new(16000, 4, 16000);
        // One 4-channel frame
        let samples = vec![100i16, 200, 300, 400];
        assert_eq!(conv.convert(&samples), vec![250]);
    }
}
