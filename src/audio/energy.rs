//! Frame energy analysis.
//!
//! Classifies fixed-length frames as voiced or quiet using RMS thresholding.

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// # Returns
/// RMS value in `[0, 1]` for samples in `[-1, 1]`, where:
/// - 0.0 represents silence
/// - ~0.707 represents a full-scale sine wave
/// - 1.0 represents maximum amplitude
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let s = sample as f64;
            s * s
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Scale samples so the loudest one reaches `target_peak`.
///
/// All-zero input is returned unchanged.
pub fn peak_normalize(samples: &[f32], target_peak: f32) -> Vec<f32> {
    let current = peak(samples);
    if current <= f32::EPSILON {
        return samples.to_vec();
    }
    let gain = target_peak / current;
    samples.iter().map(|&s| s * gain).collect()
}

/// RMS of consecutive frames of `frame_len` samples. The last frame may be short.
pub fn frame_energies(samples: &[f32], frame_len: usize) -> Vec<f32> {
    if frame_len == 0 {
        return Vec::new();
    }
    samples.chunks(frame_len).map(calculate_rms).collect()
}

/// Per-frame voiced flags.
pub fn classify_frames(energies: &[f32], threshold: f32) -> Vec<bool> {
    energies.iter().map(|&level| level > threshold).collect()
}
