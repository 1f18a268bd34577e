//! Default configuration constants for memsculpt.
//!
//! Shared by the configuration sections and the stage configs so that a
//! default-constructed stage behaves exactly like a default `Config`.

/// Canonical analysis sample rate in Hz.
///
/// 16kHz mono is what the speech-to-text collaborators expect and keeps the
/// per-segment payloads small.
pub const SAMPLE_RATE: u32 = 16000;

/// Peak level the recording is normalized to before energy analysis.
pub const TARGET_PEAK: f32 = 0.9;

/// Frame length for energy analysis in milliseconds.
pub const FRAME_MS: u32 = 20;

/// RMS threshold (0.0 to 1.0, after peak normalization) below which a frame is quiet.
pub const SILENCE_THRESHOLD: f32 = 0.02;

/// Minimum run of quiet frames that counts as silence at all.
pub const MIN_SILENCE_MS: u32 = 200;

/// Silence gap that splits two utterances.
pub const SPLIT_SILENCE_MS: u32 = 700;

/// Voiced regions shorter than this are merged into a neighbour.
pub const MIN_SEGMENT_MS: u32 = 400;

/// Upper bound on a single segment's length in seconds (0 disables splitting).
pub const MAX_SEGMENT_SECS: f64 = 30.0;

/// Number of bins in the waveform envelope used for the sculpture base.
pub const ENVELOPE_BINS: usize = 50;

/// Envelope values are rescaled to `[-ENVELOPE_AMPLITUDE, ENVELOPE_AMPLITUDE]`.
pub const ENVELOPE_AMPLITUDE: f32 = 0.04;

/// Outlier threshold, in median absolute deviations, for envelope imputation.
pub const ENVELOPE_OUTLIER_MADS: f32 = 7.0;

/// Total attempts per remote call (first try included).
pub const MAX_ATTEMPTS: u32 = 4;

/// First retry delay in milliseconds; doubles on every retry.
pub const INITIAL_BACKOFF_MS: u64 = 200;

/// Retry delay cap in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 5000;

/// Number of concurrent remote analysis jobs.
pub const WORKERS: usize = 4;

/// Jobs that may wait for a worker before submission blocks.
pub const QUEUE_CAPACITY: usize = 32;

/// Run-level analysis deadline in seconds (0 disables).
pub const RUN_TIMEOUT_SECS: u64 = 300;

/// Per-request timeout for the remote collaborators, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest allowed gap between timeline samples, in seconds.
pub const MAX_GAP_SECS: f64 = 5.0;

/// Moving-average window across timeline samples.
pub const SMOOTHING_WINDOW: usize = 3;

/// Radius of a neutral cross-section in millimetres.
pub const BASE_RADIUS_MM: f64 = 30.0;

/// Vertical millimetres per second of recording.
pub const HEIGHT_PER_SECOND_MM: f64 = 6.0;

/// Vertices per cross-sectional profile.
pub const PROFILE_POINTS: usize = 64;

/// Lobes of the deterministic surface ripple.
pub const RIPPLE_LOBES: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_amplitude_keeps_base_ring_positive() {
        assert!(ENVELOPE_AMPLITUDE < 1.0);
    }

    #[test]
    fn split_gap_is_longer_than_minimum_silence() {
        assert!(SPLIT_SILENCE_MS >= MIN_SILENCE_MS);
    }

    #[test]
    fn default_smoothing_window_is_odd() {
        assert_eq!(SMOOTHING_WINDOW % 2, 1);
    }
}
