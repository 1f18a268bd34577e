//! Watson-style HTTP collaborators.
//!
//! Both clients authenticate with an API key (`apikey` basic auth) and map
//! transport and status failures onto [`ServiceError`] kinds. Response
//! parsing lives in plain functions so it can be tested without a server.

use crate::analysis::emotion::{EmotionDimension, EmotionVector};
use crate::analysis::service::{
    EmotionScorer, EmotionScores, ServiceError, SpeechToText, Transcription,
};
use crate::audio::types::AudioSegment;
use crate::audio::wav::encode_wav_i16;
use crate::config::ServiceEndpoint;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("memsculpt/", env!("CARGO_PKG_VERSION"));
const NLU_API_VERSION: &str = "2022-04-07";

fn build_client(endpoint: &ServiceEndpoint) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(endpoint.timeout_secs.max(1)))
        .build()
        .map_err(|e| ServiceError::Network(e.to_string()))
}

fn required_url(endpoint: &ServiceEndpoint, service: &str) -> Result<String, ServiceError> {
    endpoint
        .url
        .as_deref()
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ServiceError::Auth(format!("no {service} service URL configured")))
}

fn map_transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout(err.to_string())
    } else if err.is_decode() {
        ServiceError::InvalidResponse(err.to_string())
    } else {
        ServiceError::Network(err.to_string())
    }
}

/// Maps a non-success HTTP status onto a service error kind.
pub fn map_status(status: u16, body: &str) -> ServiceError {
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.chars().take(200).collect::<String>())
    };
    match status {
        401 | 403 => ServiceError::Auth(detail),
        408 => ServiceError::Timeout(detail),
        413 | 415 => ServiceError::UnsupportedAudio(detail),
        429 => ServiceError::RateLimited(detail),
        500..=599 => ServiceError::Unavailable(detail),
        _ => ServiceError::InvalidResponse(detail),
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<Vec<u8>, ServiceError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status(status.as_u16(), &String::from_utf8_lossy(&body)));
    }
    Ok(body.to_vec())
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f64>,
}

/// Parses a `/v1/recognize` body.
///
/// Transcripts of all results are concatenated in order; confidence is the
/// mean over results that report one (1.0 when none do).
pub fn parse_recognize_response(body: &[u8]) -> Result<Transcription, ServiceError> {
    let response: RecognizeResponse = serde_json::from_slice(body)
        .map_err(|e| ServiceError::InvalidResponse(format!("recognize: {e}")))?;

    let mut text = String::new();
    let mut confidences = Vec::new();
    for result in &response.results {
        if let Some(best) = result.alternatives.first() {
            text.push_str(&best.transcript);
            if let Some(confidence) = best.confidence {
                confidences.push(confidence);
            }
        }
    }

    let confidence = if confidences.is_empty() {
        1.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };
    Ok(Transcription::new(text, confidence))
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    emotion: Option<EmotionFeature>,
    classifications: Option<Vec<Classification>>,
}

#[derive(Debug, Deserialize)]
struct EmotionFeature {
    document: EmotionDocument,
}

#[derive(Debug, Deserialize)]
struct EmotionDocument {
    emotion: std::collections::BTreeMap<String, f64>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    class_name: String,
    confidence: f64,
}

/// Parses a `/v1/analyze` body.
///
/// Reads the document-level emotion feature; when the request used a
/// classifications model instead, classes named after emotion dimensions
/// become their scores and the top class confidence is the confidence.
pub fn parse_analyze_response(body: &[u8]) -> Result<EmotionScores, ServiceError> {
    let response: AnalyzeResponse = serde_json::from_slice(body)
        .map_err(|e| ServiceError::InvalidResponse(format!("analyze: {e}")))?;

    if let Some(feature) = response.emotion {
        let pairs = feature
            .document
            .emotion
            .iter()
            .filter_map(|(name, score)| name.parse::<EmotionDimension>().ok().map(|d| (d, *score)));
        let emotion = EmotionVector::from_pairs(pairs);
        return Ok(EmotionScores::new(
            emotion,
            feature.document.confidence.unwrap_or(1.0),
        ));
    }

    if let Some(classes) = response.classifications {
        let emotion = EmotionVector::from_pairs(classes.iter().filter_map(|class| {
            class
                .class_name
                .parse::<EmotionDimension>()
                .ok()
                .map(|d| (d, class.confidence))
        }));
        let confidence = classes
            .iter()
            .map(|class| class.confidence)
            .fold(0.0, f64::max);
        return Ok(EmotionScores::new(emotion, confidence));
    }

    Err(ServiceError::InvalidResponse(
        "analyze: response has neither emotion nor classifications".to_string(),
    ))
}

/// Remote speech-to-text over HTTP.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpSpeechToText {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(endpoint)?,
            url: required_url(endpoint, "speech-to-text")?,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
        })
    }

    fn recognize_url(&self) -> String {
        match &self.model {
            Some(model) => format!("{}/v1/recognize?model={}", self.url, model),
            None => format!("{}/v1/recognize", self.url),
        }
    }
}

#[async_trait::async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<Transcription, ServiceError> {
        let wav = encode_wav_i16(segment.samples(), segment.sample_rate())
            .map_err(|e| ServiceError::UnsupportedAudio(e.to_string()))?;

        tracing::debug!(
            start = segment.start_time(),
            end = segment.end_time(),
            bytes = wav.len(),
            "Posting segment to speech-to-text"
        );

        let mut request = self
            .client
            .post(self.recognize_url())
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav);
        if let Some(key) = &self.api_key {
            request = request.basic_auth("apikey", Some(key));
        }

        let body = send(request).await?;
        parse_recognize_response(&body)
    }

    fn name(&self) -> &str {
        "speech-to-text"
    }
}

/// Remote emotion scoring over HTTP.
pub struct HttpEmotionScorer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpEmotionScorer {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(endpoint)?,
            url: required_url(endpoint, "emotion scoring")?,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let features = match &self.model {
            Some(model) => serde_json::json!({ "classifications": { "model": model } }),
            None => serde_json::json!({ "emotion": {} }),
        };
        serde_json::json!({ "text": text, "features": features })
    }
}

#[async_trait::async_trait]
impl EmotionScorer for HttpEmotionScorer {
    async fn score(&self, text: &str) -> Result<EmotionScores, ServiceError> {
        let payload = serde_json::to_vec(&self.request_body(text))
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        let mut request = self
            .client
            .post(format!("{}/v1/analyze?version={}", self.url, NLU_API_VERSION))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(key) = &self.api_key {
            request = request.basic_auth("apikey", Some(key));
        }

        let body = send(request).await?;
        parse_analyze_response(&body)
    }

    fn name(&self) -> &str {
        "emotion-scoring"
    }
}
