//! Recording file in, exported sculpture out, and back again.

use memsculpt::analysis::emotion::{EmotionDimension, EmotionVector};
use memsculpt::analysis::mock::{MockEmotionScorer, MockSpeechToText};
use memsculpt::analysis::pool::WorkerPool;
use memsculpt::audio::preprocessor::AudioPreprocessor;
use memsculpt::audio::wav::{encode_wav_i16, read_wav_file};
use memsculpt::sculpture::export::{export_to_path, read_solid};
use memsculpt::sculpture::{ExportFormat, SculptureModel};
use memsculpt::{Config, SculpturePipeline};
use std::sync::Arc;
use tempfile::TempDir;

fn tone(secs: f64, rate: u32) -> Vec<f32> {
    (0..(secs * rate as f64) as usize)
        .map(|i| 0.5 * (i as f32 * 0.07 * 16000.0 / rate as f32).sin())
        .collect()
}

fn silence(secs: f64, rate: u32) -> Vec<f32> {
    vec![0.0; (secs * rate as f64) as usize]
}

fn speech_like(rate: u32) -> Vec<f32> {
    let mut samples = silence(0.5, rate);
    samples.extend(tone(1.5, rate));
    samples.extend(silence(1.5, rate));
    samples.extend(tone(2.0, rate));
    samples.extend(silence(0.5, rate));
    samples
}

async fn sculpt(path: &std::path::Path) -> SculptureModel {
    let raw = read_wav_file(path).unwrap();
    let joyful_then_afraid = MockEmotionScorer::from_fn(|text| {
        let emotion = if text.contains("first") {
            EmotionVector::from_pairs([(EmotionDimension::Joy, 0.7)])
        } else {
            EmotionVector::from_pairs([(EmotionDimension::Fear, 0.9), (EmotionDimension::Anger, 0.4)])
        };
        Ok(memsculpt::analysis::service::EmotionScores::new(emotion, 0.9))
    });
    let stt = MockSpeechToText::from_fn(|segment| {
        let text = if segment.start_time() < 1.0 { "first part" } else { "second part" };
        Ok(memsculpt::analysis::service::Transcription::new(text, 0.9))
    });
    SculpturePipeline::new(Config::default(), Arc::new(stt), Arc::new(joyful_then_afraid))
        .unwrap()
        .with_pool(WorkerPool::new(2, 4))
        .run(&raw)
        .await
        .unwrap()
        .model
}

#[tokio::test]
async fn wav_file_to_every_export_format() {
    let dir = TempDir::new().unwrap();
    let wav_path = dir.path().join("memory.wav");
    std::fs::write(&wav_path, encode_wav_i16(&speech_like(16000), 16000).unwrap()).unwrap();

    let model = sculpt(&wav_path).await;
    let expected = model.bounds().unwrap();

    for (name, format) in [
        ("memory.stl", ExportFormat::Stl),
        ("memory-ascii.stl", ExportFormat::StlAscii),
        ("memory.json", ExportFormat::Json),
    ] {
        let path = dir.path().join(name);
        export_to_path(&model, format, &path).unwrap();

        let solid = read_solid(&path).unwrap();
        assert_eq!(solid.profile_count, model.profiles().len(), "{format}");
        assert_eq!(solid.triangles, model.mesh().triangle_count(), "{format}");
        assert!(solid.bounds.approx_eq(&expected, 1e-3), "{format}");
    }
}

#[test]
fn stereo_44k_wav_keeps_the_original_timeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for sample in speech_like(44100) {
        let value = (sample * i16::MAX as f32) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();

    let raw = read_wav_file(&path).unwrap();
    assert_eq!(raw.channels, 2);
    assert!((raw.duration_secs() - 6.0).abs() < 1e-3);

    let segments = AudioPreprocessor::default().normalize(&raw).unwrap();
    assert_eq!(segments.len(), 2);
    assert!((segments[0].start_time() - 0.5).abs() < 0.05);
    assert!((segments[0].end_time() - 2.0).abs() < 0.05);
    assert!((segments[1].start_time() - 3.5).abs() < 0.05);
    assert!((segments[1].end_time() - 5.5).abs() < 0.05);
    assert!(segments.iter().all(|s| s.sample_rate() == 16000));
}

#[test]
fn unreadable_recording_is_a_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"RIFF but not really").unwrap();
    let err = read_wav_file(&path).unwrap_err();
    assert!(matches!(err, memsculpt::SculptError::AudioDecode { .. }));
}
