use crate::analysis::analyzer::AnalysisConfig;
use crate::audio::preprocessor::PreprocessConfig;
use crate::defaults;
use crate::error::{Result, SculptError};
use crate::sculpture::SculptureConfig;
use crate::timeline::TimelineConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Root configuration structure
///
/// Built once and handed to the pipeline; never read from ambient state
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: PreprocessConfig,
    pub analysis: AnalysisConfig,
    pub timeline: TimelineConfig,
    pub sculpture: SculptureConfig,
    pub services: ServicesConfig,
}

/// Remote collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServicesConfig {
    pub stt: ServiceEndpoint,
    pub nlu: ServiceEndpoint,
}

/// One remote service: base URL, API key and optional model id
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceEndpoint {
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Speech model for speech-to-text, classifications model for NLU.
    pub model: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServiceEndpoint {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> SculptError {
    SculptError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SculptError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SculptError::ConfigRead {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(SculptError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MEMSCULPT_STT_URL → services.stt.url
    /// - MEMSCULPT_STT_API_KEY → services.stt.api_key
    /// - MEMSCULPT_NLU_URL → services.nlu.url
    /// - MEMSCULPT_NLU_API_KEY → services.nlu.api_key
    /// - MEMSCULPT_WORKERS → analysis.workers
    pub fn with_env_overrides(mut self) -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(url) = non_empty("MEMSCULPT_STT_URL") {
            self.services.stt.url = Some(url);
        }
        if let Some(key) = non_empty("MEMSCULPT_STT_API_KEY") {
            self.services.stt.api_key = Some(key);
        }
        if let Some(url) = non_empty("MEMSCULPT_NLU_URL") {
            self.services.nlu.url = Some(url);
        }
        if let Some(key) = non_empty("MEMSCULPT_NLU_API_KEY") {
            self.services.nlu.api_key = Some(key);
        }
        if let Some(workers) = non_empty("MEMSCULPT_WORKERS") {
            match workers.parse::<usize>() {
                Ok(n) => self.analysis.workers = n,
                Err(_) => tracing::warn!(value = %workers, "Ignoring invalid MEMSCULPT_WORKERS"),
            }
        }

        self
    }

    /// Rejects values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        if !(audio.target_peak > 0.0 && audio.target_peak <= 1.0) {
            return Err(invalid("audio.target_peak", "must be in (0, 1]"));
        }
        if audio.frame_ms == 0 {
            return Err(invalid("audio.frame_ms", "must be positive"));
        }
        if !(audio.silence_threshold.is_finite() && audio.silence_threshold >= 0.0) {
            return Err(invalid("audio.silence_threshold", "must be non-negative"));
        }
        if !(audio.max_segment_secs.is_finite() && audio.max_segment_secs >= 0.0) {
            return Err(invalid("audio.max_segment_secs", "must be non-negative (0 disables)"));
        }

        let analysis = &self.analysis;
        if analysis.workers == 0 {
            return Err(invalid("analysis.workers", "must be at least 1"));
        }
        if analysis.queue_capacity == 0 {
            return Err(invalid("analysis.queue_capacity", "must be at least 1"));
        }
        if analysis.retry.max_attempts == 0 {
            return Err(invalid("analysis.retry.max_attempts", "must be at least 1"));
        }
        if analysis.retry.initial_backoff_ms > analysis.retry.max_backoff_ms {
            return Err(invalid(
                "analysis.retry.initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }

        let timeline = &self.timeline;
        if !(timeline.max_gap_secs.is_finite() && timeline.max_gap_secs > 0.0) {
            return Err(invalid("timeline.max_gap_secs", "must be positive"));
        }
        if timeline.smoothing_window > 1 && timeline.smoothing_window % 2 == 0 {
            return Err(invalid(
                "timeline.smoothing_window",
                format!("must be odd, got {}", timeline.smoothing_window),
            ));
        }

        self.sculpture.validate()
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for endpoint in [&mut copy.services.stt, &mut copy.services.nlu] {
            if endpoint.api_key.is_some() {
                endpoint.api_key = Some("<redacted>".to_string());
            }
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/memsculpt/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Result<std::path::PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("memsculpt").join("config.toml"))
            .ok_or(SculptError::ConfigDirUnavailable)
    }
}
