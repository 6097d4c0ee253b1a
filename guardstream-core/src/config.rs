//! Configuration management for `guardstream-core`.
//!
//! A [`GuardConfig`] is constructed once per deployment and handed to the
//! [`crate::driver::Pipeline`] by reference. It is read from YAML: the embedded
//! `config/default_config.yaml` is always the base layer and a user file, when
//! present, is merged on top of it before deserialization.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::GuardError;
use crate::span::{DetectionPolicy, SpanKind};

/// Maximum allowed length for a detector pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Upper bound on the carry tail length.
pub const MAX_OVERLAP_CHARS: usize = 1024;

pub const DEFAULT_MARKER_TEMPLATE: &str = "[REDACTED:{kind}]";
pub const DEFAULT_SENTENCE_PATTERN: &str = r"[.!?]\s";

const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default_config.yaml");

/// Top-level configuration for a sanitization pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// When a buffered segment is handed to the detector.
    pub flush: FlushConfig,
    /// Length N of the carry tail, in chars.
    pub overlap_chars: usize,
    /// Marker template; `{kind}` is replaced by the upper-cased span kind.
    pub marker_template: String,
    pub channels: ChannelConfig,
    pub detector: DetectorConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            flush: FlushConfig::default(),
            overlap_chars: 48,
            marker_template: DEFAULT_MARKER_TEMPLATE.to_string(),
            channels: ChannelConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Buffered char count that always triggers a flush.
    pub size_threshold: usize,
    /// Enables the size-or-sentence policy when present.
    pub sentence: Option<SentenceFlushConfig>,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self { size_threshold: 200, sentence: None }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SentenceFlushConfig {
    /// Regex matching an end-of-sentence boundary anywhere in the buffer.
    pub pattern: String,
    /// Minimum buffered chars before a sentence boundary may trigger a flush.
    pub min_chars: usize,
}

impl Default for SentenceFlushConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_SENTENCE_PATTERN.to_string(),
            min_chars: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub main: String,
    pub audit: String,
    /// Bounded queue depth of each output channel.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            main: "main".to_string(),
            audit: "guardrail-audit".to_string(),
            capacity: 64,
        }
    }
}

/// Which detector adapter backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorBackend {
    #[default]
    Pattern,
    Keyword,
    Remote,
    Composite,
}

impl fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectorBackend::Pattern => "pattern",
            DetectorBackend::Keyword => "keyword",
            DetectorBackend::Remote => "remote",
            DetectorBackend::Composite => "composite",
        };
        f.write_str(s)
    }
}

/// A single regex rule for the pattern detector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternRule {
    pub kind: SpanKind,
    pub pattern: String,
    /// Run the programmatic validator for `kind` on every match.
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteDetectorConfig {
    /// Full URL of the detection endpoint.
    pub endpoint: String,
    pub model: Option<String>,
    /// Client-side timeout for one detection call.
    pub timeout_ms: u64,
    /// Name of the environment variable holding a bearer token.
    pub api_key_env: Option<String>,
}

impl Default for RemoteDetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: None,
            timeout_ms: 5_000,
            api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub policy: DetectionPolicy,
    pub backend: DetectorBackend,
    /// Adapters combined when `backend` is `composite`.
    pub members: Vec<DetectorBackend>,
    pub patterns: Vec<PatternRule>,
    /// Lexicon terms per kind for the keyword detector.
    pub keywords: BTreeMap<SpanKind, Vec<String>>,
    pub remote: Option<RemoteDetectorConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::Pii,
            backend: DetectorBackend::Pattern,
            members: vec![DetectorBackend::Pattern, DetectorBackend::Remote],
            patterns: Vec::new(),
            keywords: BTreeMap::new(),
            remote: None,
        }
    }
}

impl GuardConfig {
    /// Loads the embedded default configuration.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default configuration from embedded string...");
        let config: GuardConfig = serde_yml::from_str(DEFAULT_CONFIG_YAML)
            .context("Failed to parse embedded default configuration")?;
        debug!("Loaded {} default detector patterns.", config.detector.patterns.len());
        Ok(config)
    }

    /// Loads a YAML file layered over the embedded defaults and validates the result.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Parses YAML text layered over the embedded defaults and validates the result.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut base: Value = serde_yml::from_str(DEFAULT_CONFIG_YAML)
            .context("Failed to parse embedded default configuration")?;
        if !text.trim().is_empty() {
            let overlay: Value = serde_yml::from_str(text).context("Failed to parse configuration YAML")?;
            if !overlay.is_null() {
                merge_yaml(&mut base, overlay);
            }
        }
        let config: GuardConfig =
            serde_yml::from_value(base).context("Configuration does not match the expected schema")?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the first existing config file among the standard locations.
    pub fn locate() -> Option<PathBuf> {
        config_candidate_paths().into_iter().find(|p| p.is_file())
    }

    /// Checks every setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), GuardError> {
        let mut errors = Vec::new();
        self.collect_pipeline_errors(&mut errors);
        self.collect_detector_errors(&mut errors);
        into_validation_result(errors)
    }

    /// Checks only the settings the pipeline itself consumes, for callers that
    /// supply their own detector.
    pub fn validate_pipeline(&self) -> Result<(), GuardError> {
        let mut errors = Vec::new();
        self.collect_pipeline_errors(&mut errors);
        into_validation_result(errors)
    }

    fn collect_pipeline_errors(&self, errors: &mut Vec<String>) {

        if self.flush.size_threshold == 0 {
            errors.push("`flush.size_threshold` must be greater than 0.".to_string());
        }
        if let Some(sentence) = &self.flush.sentence {
            if sentence.min_chars > self.flush.size_threshold {
                errors.push(format!(
                    "`flush.sentence.min_chars` ({}) cannot exceed `flush.size_threshold` ({}).",
                    sentence.min_chars, self.flush.size_threshold
                ));
            }
            if let Err(e) = Regex::new(&sentence.pattern) {
                errors.push(format!("`flush.sentence.pattern` is not a valid regex: {}", e));
            }
        }
        if self.overlap_chars == 0 || self.overlap_chars > MAX_OVERLAP_CHARS {
            errors.push(format!(
                "`overlap_chars` must be between 1 and {} (got {}).",
                MAX_OVERLAP_CHARS, self.overlap_chars
            ));
        }
        if !self.marker_template.contains("{kind}") {
            errors.push("`marker_template` must contain the `{kind}` placeholder.".to_string());
        }
        if self.channels.capacity == 0 {
            errors.push("`channels.capacity` must be greater than 0.".to_string());
        }
        if self.channels.main.trim().is_empty() || self.channels.audit.trim().is_empty() {
            errors.push("Channel names cannot be empty.".to_string());
        } else if self.channels.main == self.channels.audit {
            errors.push("`channels.main` and `channels.audit` must differ.".to_string());
        }
    }

    fn collect_detector_errors(&self, errors: &mut Vec<String>) {
        match self.detector.backend {
            DetectorBackend::Composite => {
                if self.detector.members.is_empty() {
                    errors.push("Composite detector needs at least one member.".to_string());
                }
                for member in &self.detector.members {
                    if *member == DetectorBackend::Composite {
                        errors.push("Composite detector cannot contain itself.".to_string());
                    } else {
                        self.validate_backend(*member, errors);
                    }
                }
            }
            backend => self.validate_backend(backend, errors),
        }
    }

    fn validate_backend(&self, backend: DetectorBackend, errors: &mut Vec<String>) {
        let policy = self.detector.policy;
        match backend {
            DetectorBackend::Pattern => {
                let active: Vec<&PatternRule> = self
                    .detector
                    .patterns
                    .iter()
                    .filter(|r| policy.allows(r.kind))
                    .collect();
                if active.is_empty() {
                    errors.push(format!("Pattern detector has no rules for policy '{}'.", policy));
                }
                for rule in &self.detector.patterns {
                    if rule.pattern.is_empty() {
                        errors.push(format!("A '{}' rule has an empty `pattern` field.", rule.kind));
                    } else if rule.pattern.len() > MAX_PATTERN_LENGTH {
                        errors.push(format!(
                            "A '{}' rule: pattern length ({}) exceeds maximum allowed ({}).",
                            rule.kind,
                            rule.pattern.len(),
                            MAX_PATTERN_LENGTH
                        ));
                    } else if let Err(e) = Regex::new(&rule.pattern) {
                        errors.push(format!("A '{}' rule has an invalid regex pattern: {}", rule.kind, e));
                    }
                }
            }
            DetectorBackend::Keyword => {
                let has_terms = self
                    .detector
                    .keywords
                    .iter()
                    .any(|(kind, terms)| policy.allows(*kind) && terms.iter().any(|t| !t.trim().is_empty()));
                if !has_terms {
                    errors.push(format!("Keyword detector has no terms for policy '{}'.", policy));
                }
            }
            DetectorBackend::Remote => match &self.detector.remote {
                Some(remote) if !remote.endpoint.trim().is_empty() => {
                    if remote.timeout_ms == 0 {
                        errors.push("`detector.remote.timeout_ms` must be greater than 0.".to_string());
                    }
                }
                _ => errors.push("Remote detector requires `detector.remote.endpoint`.".to_string()),
            },
            DetectorBackend::Composite => {}
        }
    }
}

fn into_validation_result(errors: Vec<String>) -> Result<(), GuardError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GuardError::Config(format!("Configuration validation failed:\n{}", errors.join("\n"))))
    }
}

/// Deep-merges `overlay` into `base`: mappings merge key by key, everything else replaces.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Standard config locations, most specific first.
pub fn config_candidate_paths() -> Vec<PathBuf> {
    [
        Some(PathBuf::from("./guardstream.yaml")),
        dirs::config_dir().map(|p| p.join("guardstream").join("config.yaml")),
        dirs::home_dir().map(|p| p.join(".guardstream").join("config.yaml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}
