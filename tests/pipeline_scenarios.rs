//! End-to-end runs of the pipeline against scripted collaborators.

use memsculpt::analysis::emotion::{EmotionDimension, EmotionVector};
use memsculpt::analysis::mock::{MockEmotionScorer, MockSpeechToText};
use memsculpt::analysis::pool::WorkerPool;
use memsculpt::analysis::record::RecordOutcome;
use memsculpt::analysis::retry::RetryPolicy;
use memsculpt::analysis::service::{ServiceError, Transcription};
use memsculpt::audio::types::RawAudio;
use memsculpt::sculpture::GeometryBounds;
use memsculpt::{Config, SculptError, SculpturePipeline};
use std::sync::Arc;
use std::time::Duration;

const RATE: u32 = 16000;

fn tone(secs: f64) -> Vec<f32> {
    (0..(secs * RATE as f64) as usize)
        .map(|i| 0.5 * (i as f32 * 0.07).sin())
        .collect()
}

fn silence(secs: f64) -> Vec<f32> {
    vec![0.0; (secs * RATE as f64) as usize]
}

/// Low-level white noise, like a quiet room through a cheap microphone.
fn noise_floor(secs: f64, amplitude: f32) -> Vec<f32> {
    let mut state: u32 = 0x9e37_79b9;
    (0..(secs * RATE as f64) as usize)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// Builds a mono recording from `(voiced, seconds)` parts.
fn recording(parts: &[(bool, f64)]) -> RawAudio {
    let mut samples = Vec::new();
    for &(voiced, secs) in parts {
        samples.extend(if voiced { tone(secs) } else { silence(secs) });
    }
    RawAudio::mono(samples, RATE)
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.analysis.retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
    };
    config
}

fn pipeline(config: Config, stt: MockSpeechToText, nlu: MockEmotionScorer) -> SculpturePipeline {
    SculpturePipeline::new(config, Arc::new(stt), Arc::new(nlu))
        .unwrap()
        .with_pool(WorkerPool::new(3, 8))
}

#[tokio::test]
async fn joyful_utterance_widens_the_middle() {
    let joy = EmotionVector::from_pairs([(EmotionDimension::Joy, 0.8)]);
    let pipeline = pipeline(
        fast_config(),
        MockSpeechToText::new().with_response("I got the job"),
        MockEmotionScorer::new().with_scores(joy),
    );

    // 10 s recording, 3 s utterance centred on 5 s
    let output = pipeline
        .run(&recording(&[(false, 3.5), (true, 3.0), (false, 3.5)]))
        .await
        .unwrap();

    let samples = output.timeline.samples();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].time_secs, 0.0);
    assert_eq!(samples[1].time_secs, 5.0);
    assert_eq!(samples[2].time_secs, 10.0);
    assert!((samples[1].emotion.get(EmotionDimension::Joy) - 0.8).abs() < 1e-12);

    let params = output.model.parameters();
    assert!((params[1].radius - params[2].radius - 24.0 * 0.8).abs() < 1e-9);
    assert!(output.model.mesh().validate().is_ok());
}

#[tokio::test]
async fn silent_recording_becomes_plain_cylinder() {
    for audio in [
        recording(&[(false, 6.0)]),
        RawAudio::mono(noise_floor(6.0, 0.002), RATE),
        RawAudio::mono(noise_floor(6.0, 0.01), RATE),
    ] {
        let stt = MockSpeechToText::new();
        let pipeline = pipeline(fast_config(), stt.clone(), MockEmotionScorer::new());

        let output = pipeline.run(&audio).await.unwrap();

        assert_eq!(output.segments, 0);
        assert!(output.records.is_empty());
        assert_eq!(output.timeline.len(), 2);
        assert!(output.timeline.samples().iter().all(|s| s.emotion.is_neutral()));
        for profile in output.model.profiles() {
            for k in 0..profile.len() {
                assert!((profile.radius_at(k) - 30.0).abs() < 1e-9);
            }
        }
        assert_eq!(stt.calls(), 0);
    }
}

#[tokio::test]
async fn one_failing_segment_is_excluded() {
    let stt = MockSpeechToText::from_fn(|segment| {
        if (3.5..5.5).contains(&segment.start_time()) {
            Err(ServiceError::Unavailable("speech service overloaded".to_string()))
        } else {
            Ok(Transcription::new("a steady sentence", 0.9))
        }
    });
    let sad = EmotionVector::from_pairs([(EmotionDimension::Sadness, 0.6)]);
    let pipeline = pipeline(fast_config(), stt.clone(), MockEmotionScorer::new().with_scores(sad));

    let output = pipeline
        .run(&recording(&[
            (false, 1.0),
            (true, 1.0),
            (false, 2.0),
            (true, 1.0),
            (false, 2.0),
            (true, 1.0),
            (false, 1.0),
        ]))
        .await
        .unwrap();

    assert_eq!(output.segments, 3);
    assert_eq!(output.measured(), 2);
    assert_eq!(output.failed(), 1);
    assert!(matches!(output.records[1].outcome, RecordOutcome::Failed { .. }));
    assert_eq!(output.records[1].confidence, 0.0);
    // 2 healthy calls plus 3 attempts for the failing one
    assert_eq!(stt.calls(), 5);

    let times: Vec<f64> = output.timeline.samples().iter().map(|s| s.time_secs).collect();
    assert!(times.contains(&1.5));
    assert!(times.contains(&7.5));
    assert!(output.timeline.max_gap() <= 5.0);
}

#[tokio::test]
async fn extreme_scores_stay_within_bounds() {
    for value in [0.0, 1.0] {
        let pipeline = pipeline(
            fast_config(),
            MockSpeechToText::new(),
            MockEmotionScorer::new().with_scores(EmotionVector::new([value; 5])),
        );
        let output = pipeline
            .run(&recording(&[(false, 1.0), (true, 2.0), (false, 1.0), (true, 2.0), (false, 1.0)]))
            .await
            .unwrap();

        let bounds = GeometryBounds::default();
        for params in output.model.parameters() {
            assert!(params.radius >= bounds.min_radius && params.radius <= bounds.max_radius);
            assert!(params.perturbation >= 0.0 && params.perturbation <= bounds.max_perturbation);
        }
        let heights: Vec<f64> = output.model.parameters().iter().map(|p| p.height).collect();
        assert!(heights.windows(2).all(|w| w[1] > w[0]));
        assert!(output.model.mesh().signed_volume() > 0.0);
    }
}

#[tokio::test]
async fn identical_runs_give_identical_models() {
    let nlu = MockEmotionScorer::from_fn(|text| {
        let anger = if text.contains("angry") { 0.9 } else { 0.1 };
        Ok(memsculpt::analysis::service::EmotionScores::new(
            EmotionVector::from_pairs([(EmotionDimension::Anger, anger), (EmotionDimension::Fear, 0.3)]),
            0.8,
        ))
    });
    let stt = MockSpeechToText::from_fn(|segment| {
        let text = if segment.start_time() < 2.0 { "calm" } else { "angry now" };
        Ok(Transcription::new(text, 0.95))
    });
    let audio = recording(&[(false, 0.5), (true, 1.0), (false, 1.5), (true, 2.0), (false, 0.5)]);

    let first = pipeline(fast_config(), stt.clone(), nlu.clone()).run(&audio).await.unwrap();
    let second = pipeline(fast_config(), stt, nlu).run(&audio).await.unwrap();

    assert_eq!(first.timeline, second.timeline);
    assert_eq!(first.model, second.model);
}

#[tokio::test]
async fn records_come_back_in_segment_order() {
    let stt = MockSpeechToText::from_fn(|segment| {
        Ok(Transcription::new(format!("at {:.0}", segment.start_time()), 1.0))
    });
    let nlu = MockEmotionScorer::new().with_delay(Duration::from_millis(5));
    let output = pipeline(fast_config(), stt, nlu)
        .run(&recording(&[
            (true, 1.0),
            (false, 1.0),
            (true, 1.0),
            (false, 1.0),
            (true, 1.0),
            (false, 1.0),
            (true, 1.0),
        ]))
        .await
        .unwrap();

    let starts: Vec<f64> = output.records.iter().map(|r| r.span.start).collect();
    assert_eq!(starts.len(), 4);
    assert!(starts.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(output.records[0].text, "at 0");
}

#[tokio::test]
async fn run_deadline_reports_partial_analysis() {
    let pipeline = pipeline(
        fast_config(),
        MockSpeechToText::new().with_delay(Duration::from_secs(30)),
        MockEmotionScorer::new(),
    )
    .with_timeout(Some(Duration::from_millis(100)));

    let err = pipeline
        .run(&recording(&[(true, 1.0), (false, 1.0), (true, 1.0)]))
        .await
        .unwrap_err();

    assert!(err.is_transient());
    match err {
        SculptError::PartialAnalysis { completed, total } => {
            assert_eq!(completed, 0);
            assert_eq!(total, 2);
        }
        other => panic!("Expected PartialAnalysis, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_transcripts_skip_emotion_scoring() {
    let nlu = MockEmotionScorer::new();
    let output = pipeline(fast_config(), MockSpeechToText::new().with_response("   "), nlu.clone())
        .run(&recording(&[(false, 1.0), (true, 1.0), (false, 1.0)]))
        .await
        .unwrap();

    assert_eq!(nlu.calls(), 0);
    assert_eq!(output.records[0].outcome, RecordOutcome::Neutralized);
    assert_eq!(output.measured(), 1);
    assert!(output.timeline.samples().iter().all(|s| s.emotion.is_neutral()));
}
