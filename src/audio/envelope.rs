//! Coarse waveform envelope used to ripple the sculpture base.
//!
//! The recording is reduced to a fixed number of bins of mean absolute
//! level. Bins that sit far outside the rest (median absolute deviation
//! test) are replaced with the mean, then the whole curve is rescaled to a
//! small symmetric amplitude so it can multiply a profile radius directly.

use serde::{Deserialize, Serialize};

/// Fixed-length envelope with values in `[-amplitude, amplitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformEnvelope {
    values: Vec<f32>,
}

impl WaveformEnvelope {
    /// Compute the envelope of mono samples.
    pub fn compute(samples: &[f32], bins: usize, amplitude: f32, outlier_mads: f32) -> Self {
        if bins == 0 {
            return Self { values: Vec::new() };
        }
        if samples.is_empty() {
            return Self {
                values: vec![0.0; bins],
            };
        }

        let mut levels: Vec<f32> = (0..bins)
            .map(|i| {
                let start = i * samples.len() / bins;
                let end = ((i + 1) * samples.len() / bins).max(start + 1).min(samples.len());
                if start >= end {
                    return 0.0;
                }
                let slice = &samples[start..end];
                slice.iter().map(|s| s.abs()).sum::<f32>() / slice.len() as f32
            })
            .collect();

        impute_outliers(&mut levels, outlier_mads);
        rescale(&mut levels, amplitude);

        Self { values: levels }
    }

    /// Envelope values, one per bin.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at ring vertex `index` of `ring_len`, linearly interpolated and
    /// wrapping around so the ring closes smoothly.
    pub fn sample_ring(&self, index: usize, ring_len: usize) -> f32 {
        if self.values.is_empty() || ring_len == 0 {
            return 0.0;
        }
        let n = self.values.len();
        let pos = index as f64 * n as f64 / ring_len as f64;
        let lower = pos.floor() as usize % n;
        let upper = (lower + 1) % n;
        let fraction = (pos - pos.floor()) as f32;
        self.values[lower] + (self.values[upper] - self.values[lower]) * fraction
    }
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Replace values more than `threshold` median absolute deviations from the
/// median with the mean of all values.
fn impute_outliers(values: &mut [f32], threshold: f32) {
    if values.is_empty() {
        return;
    }
    let med = median(values);
    let deviations: Vec<f32> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&deviations);
    if mad <= f32::EPSILON {
        return;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    for (value, deviation) in values.iter_mut().zip(deviations) {
        if deviation / mad >= threshold {
            *value = mean;
        }
    }
}

/// Map `[min, max]` linearly onto `[-amplitude, amplitude]`. Flat input maps to 0.
fn rescale(values: &mut [f32], amplitude: f32) {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    for value in values.iter_mut() {
        *value = if range <= f32::EPSILON {
            0.0
        } else {
            ((*value - min) / range * 2.0 - 1.0) * amplitude
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_requested_bin_count() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let envelope = WaveformEnvelope::compute(&samples, 50, 0.04, 7.0);
        assert_eq!(envelope.values().len(), 50);
    }

    #[test]
    fn envelope_stays_within_amplitude() {
        let samples: Vec<f32> = (0..4800).map(|i| ((i / 100) as f32 * 0.01).min(1.0)).collect();
        let envelope = WaveformEnvelope::compute(&samples, 48, 0.04, 7.0);
        assert!(envelope.values().iter().all(|v| v.abs() <= 0.04 + 1e-6));
        let min = envelope.values().iter().copied().fold(f32::INFINITY, f32::min);
        let max = envelope.values().iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((min + 0.04).abs() < 1e-6);
        assert!((max - 0.04).abs() < 1e-6);
    }

    #[test]
    fn silent_recording_gives_flat_envelope() {
        let envelope = WaveformEnvelope::compute(&[0.0; 1000], 50, 0.04, 7.0);
        assert!(envelope.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_recording_gives_zero_bins() {
        let envelope = WaveformEnvelope::compute(&[], 10, 0.04, 7.0);
        assert_eq!(envelope.values(), &[0.0; 10]);
    }

    #[test]
    fn fewer_samples_than_bins_still_fills_every_bin() {
        let envelope = WaveformEnvelope::compute(&[0.1, 0.9, 0.5], 8, 0.04, 7.0);
        assert_eq!(envelope.values().len(), 8);
    }

    #[test]
    fn spike_is_imputed_with_mean() {
        let mut values = vec![1.0, 1.1, 0.9, 1.0, 1.05, 0.95, 50.0];
        impute_outliers(&mut values, 7.0);
        assert!(values[6] < 50.0);
        assert_eq!(values[0], 1.0);
    }

    #[test]
    fn sample_ring_wraps_and_interpolates() {
        let envelope = WaveformEnvelope {
            values: vec![0.0, 0.04],
        };
        assert_eq!(envelope.sample_ring(0, 4), 0.0);
        assert!((envelope.sample_ring(1, 4) - 0.02).abs() < 1e-6);
        assert!((envelope.sample_ring(2, 4) - 0.04).abs() < 1e-6);
        // wraps back towards the first bin
        assert!((envelope.sample_ring(3, 4) - 0.02).abs() < 1e-6);
    }
}
