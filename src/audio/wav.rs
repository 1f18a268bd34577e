//! WAV decoding and format conversion for recordings.
//!
//! Recordings arrive at whatever rate and channel count the source declared;
//! the preprocessor converts them to canonical mono with [`downmix`] and
//! [`resample`].

use crate::audio::types::RawAudio;
use crate::error::{Result, SculptError};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Decode a WAV stream into interleaved samples in `[-1, 1]`.
///
/// Integer PCM of any bit depth hound supports and 32-bit float are accepted.
pub fn read_wav<R: Read>(reader: R) -> Result<RawAudio> {
    let wav_reader = hound::WavReader::new(reader).map_err(|e| SculptError::AudioDecode {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    if spec.channels == 0 {
        return Err(SculptError::AudioDecode {
            message: "WAV file declares zero channels".to_string(),
        });
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            wav_reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| SculptError::AudioDecode {
        message: format!("Failed to read WAV samples: {}", e),
    })?;

    Ok(RawAudio::new(samples, spec.sample_rate, spec.channels))
}

/// Decode a WAV file from disk.
pub fn read_wav_file(path: &Path) -> Result<RawAudio> {
    let file = File::open(path).map_err(|source| SculptError::RecordingRead {
        path: path.display().to_string(),
        source,
    })?;
    read_wav(BufReader::new(file))
}

/// Encode mono samples as a 16-bit PCM WAV byte buffer.
///
/// This is the payload format sent to speech-to-text collaborators.
pub fn encode_wav_i16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| SculptError::AudioEncode {
                message: format!("Failed to create WAV writer: {}", e),
            })?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer
                .write_sample(value)
                .map_err(|e| SculptError::AudioEncode {
                    message: format!("Failed to write WAV sample: {}", e),
                })?;
        }
        writer.finalize().map_err(|e| SculptError::AudioEncode {
            message: format!("Failed to finalize WAV: {}", e),
        })?;
    }
    Ok(cursor.into_inner())
}

/// Average interleaved channels into a single channel.
///
/// A trailing partial frame is dropped.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}
