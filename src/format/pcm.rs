//! Sample codec between f32 and 16-bit linear PCM.
//!
//! Scaling is asymmetric: negative samples scale by 32768 and non-negative
//! samples by 32767, so the full signed range is usable without overflow at
//! either extreme. The inverse always divides by 32768; the round trip is
//! not bit-exact but stays within one quantization step.

/// Converts an f32 sample to i16.
///
/// Input is clamped to [-1.0, 1.0] first, so any float (including
/// out-of-range values from upstream DSP) maps to a valid sample:
/// x > 1.0 saturates to 32767, x < -1.0 to -32768.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Converts an i16 sample to f32 in [-1.0, 1.0).
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Batch converts f32 samples to i16.
pub fn f32_slice_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| f32_to_i16(s)).collect()
}

/// Batch converts i16 samples to f32.
pub fn i16_slice_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| i16_to_f32(s)).collect()
}
