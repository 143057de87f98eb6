//! Input conditioning for captures that are not already 48 kHz mono

/// Mix interleaved multi-channel audio down to mono by averaging each frame
///
/// A trailing partial frame is dropped.
pub fn downmix(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Mix stereo audio to mono
///
/// # Arguments
/// * `samples` - Interleaved stereo audio samples [L, R, L, R, ...]
pub fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    downmix(samples, 2)
}

/// Resample audio to a target sample rate using linear interpolation
///
/// # Arguments
/// * `samples` - Input audio samples
/// * `from_rate` - Current sample rate in Hz
/// * `to_rate` - Target sample rate in Hz
///
/// # Example
/// ```
/// use fskmodem_core::resample::resample;
/// let capture_16k = vec![0i16; 16000];
/// let capture_48k = resample(&capture_16k, 16000, 48000);
/// assert_eq!(capture_48k.len(), 48000);
/// ```
pub fn resample(samples: &[i16], from_rate: usize, to_rate: usize) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_length = ((samples.len() as f64) * ratio).ceil() as usize;
    let mut resampled = Vec::with_capacity(new_length);

    for i in 0..new_length {
        let src_idx = i as f64 / ratio;
        let src_idx_floor = (src_idx.floor() as usize).min(samples.len() - 1);
        let src_idx_ceil = src_idx_floor + 1;
        let fraction = src_idx - (src_idx_floor as f64);

        let interpolated = if src_idx_ceil < samples.len() {
            samples[src_idx_floor] as f64 * (1.0 - fraction)
                + samples[src_idx_ceil] as f64 * fraction
        } else {
            samples[src_idx_floor] as f64
        };

        resampled.push(interpolated.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    resampled
}
