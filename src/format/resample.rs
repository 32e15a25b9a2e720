//! Sample rate and channel conversion.
//!
//! Resampling uses linear interpolation, which is fast but may introduce
//! artifacts for large rate changes. Suitable for speech capture; the
//! playback path never resamples (the output device runs at the wire rate).

/// Resamples mono audio from one sample rate to another.
///
/// Returns the input unchanged when the rates match.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            let s1 = f64::from(samples[src_idx]);
            let s2 = f64::from(samples[src_idx + 1]);
            (s1 + (s2 - s1) * frac) as i16
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            *samples.last().unwrap_or(&0)
        };

        output.push(sample);
    }

    output
}

/// Converts interleaved stereo samples to mono by averaging channels.
///
/// Input must have an even number of samples (left, right pairs); a
/// trailing odd sample is dropped.
pub fn stereo_to_mono(stereo: &[i16]) -> Vec<i16> {
    stereo
        .chunks_exact(2)
        .map(|pair| {
            // Average the two channels, avoiding overflow
            let left = i32::from(pair[0]);
            let right = i32::from(pair[1]);
            ((left + right) / 2) as i16
        })
        .collect()
}

/// Downmixes interleaved audio with an arbitrary channel count to mono.
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    let channels = channels.max(1) as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![100i16, 200, 300];
        let resampled = resample(&samples, 16000, 16000);
        assert_eq!(resampled, samples);
    }

    #[test]
    fn test_resample_empty() {
        let samples: Vec<i16> = vec![];
        let resampled = resample(&samples, 16000, 8000);
        assert!(resampled.is_empty());
    }

    #[test]
    fn test_resample_downsample() {
        // 48kHz to 16kHz = 3:1 ratio
        let samples: Vec<i16> = (0..480).map(|i| (i * 10) as i16).collect();
        let resampled = resample(&samples, 48000, 16000);
        assert_eq!(resampled.len(), 160);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let samples = vec![0i16, 1000];
        let resampled = resample(&samples, 1, 2);

        assert_eq!(resampled.len(), 4);
        assert_eq!(resampled[0], 0);
        // Middle samples should be interpolated
        assert!(resampled[1] > 0 && resampled[1] < 1000);
    }

    #[test]
    fn test_resample_single_sample() {
        let samples = vec![500i16];
        let result = resample(&samples, 1, 10);

        assert_eq!(result.len(), 10);
        assert!(result.iter().all(|&s| s == 500));
    }

    #[test]
    fn test_stereo_to_mono() {
        let stereo = vec![100i16, 200, 300, 400];
        let mono = stereo_to_mono(&stereo);
        assert_eq!(mono, vec![150, 350]);
    }

    #[test]
    fn test_stereo_to_mono_cancellation() {
        // Opposite values should cancel
        let stereo = vec![1000i16, -1000];
        let mono = stereo_to_mono(&stereo);
        assert_eq!(mono, vec![0]);
    }

    #[test]
    fn test_downmix_four_channels() {
        let samples = vec![100i16, 200, 300, 400, 0, 0, 0, 400];
        let mono = downmix_to_mono(&samples, 4);
        assert_eq!(mono, vec![250, 100]);
    }

    #[test]
    fn test_downmix_zero_channels_treated_as_mono() {
        let samples = vec![100i16, 200];
        let mono = downmix_to_mono(&samples, 0);
        assert_eq!(mono, vec![100, 200]);
    }
}
