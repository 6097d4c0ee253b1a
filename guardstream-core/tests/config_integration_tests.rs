// guardstream-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use guardstream_core::config::{DetectorBackend, GuardConfig, MAX_PATTERN_LENGTH};
use guardstream_core::{DetectionPolicy, GuardError, SpanKind};

fn write_config(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_default_config() {
    let config = GuardConfig::load_default().unwrap();
    assert_eq!(config.flush.size_threshold, 200);
    assert_eq!(config.overlap_chars, 48);
    assert_eq!(config.channels.capacity, 64);
    assert_eq!(config.detector.backend, DetectorBackend::Pattern);
    assert_eq!(config.detector.policy, DetectionPolicy::Pii);
    let kinds: Vec<SpanKind> = config.detector.patterns.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![SpanKind::Email, SpanKind::Phone, SpanKind::Ssn, SpanKind::CreditCard]);
}

#[test]
fn test_load_from_file_overlays_defaults() -> Result<()> {
    let file = write_config(
        r#"
flush:
  size_threshold: 80
channels:
  audit: audit-trail
detector:
  policy: confidential
  backend: keyword
  keywords:
    financial: ["Q3 revenue", "EBITDA"]
    product: ["Project Falcon"]
"#,
    )?;
    let config = GuardConfig::load_from_file(file.path())?;
    assert_eq!(config.flush.size_threshold, 80);
    assert_eq!(config.overlap_chars, 48);
    assert_eq!(config.channels.main, "main");
    assert_eq!(config.channels.audit, "audit-trail");
    assert_eq!(config.detector.backend, DetectorBackend::Keyword);
    assert_eq!(config.detector.keywords[&SpanKind::Financial].len(), 2);
    Ok(())
}

#[test]
fn test_empty_file_yields_defaults() -> Result<()> {
    let file = write_config("")?;
    let config = GuardConfig::load_from_file(file.path())?;
    assert_eq!(config, GuardConfig::load_default()?);
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let err = GuardConfig::load_from_file("/definitely/not/here/guardstream.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_unknown_kind_is_a_schema_error() -> Result<()> {
    let file = write_config(
        r#"
detector:
  patterns:
    - kind: passport
      pattern: '[A-Z]\d{8}'
"#,
    )?;
    assert!(GuardConfig::load_from_file(file.path()).is_err());
    Ok(())
}

#[test]
fn test_invalid_pattern_fails_validation() -> Result<()> {
    let file = write_config(
        r#"
detector:
  patterns:
    - kind: email
      pattern: '(unclosed'
"#,
    )?;
    let err = GuardConfig::load_from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("invalid regex pattern"));
    Ok(())
}

#[test]
fn test_overlong_pattern_fails_validation() {
    let mut config = GuardConfig::load_default().unwrap();
    config.detector.patterns[0].pattern = "a".repeat(MAX_PATTERN_LENGTH + 1);
    let err = config.validate().unwrap_err();
    assert!(matches!(err, GuardError::Config(ref msg) if msg.contains("exceeds maximum allowed")));
}

#[test]
fn test_remote_backend_requires_endpoint() {
    let mut config = GuardConfig::load_default().unwrap();
    config.detector.backend = DetectorBackend::Remote;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("detector.remote.endpoint"));
}

#[test]
fn test_composite_validates_each_member() {
    let mut config = GuardConfig::load_default().unwrap();
    config.detector.backend = DetectorBackend::Composite;
    config.detector.members = vec![DetectorBackend::Pattern, DetectorBackend::Keyword];
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("Keyword detector has no terms"));
}

#[test]
fn test_sentence_min_chars_cannot_exceed_threshold() -> Result<()> {
    let file = write_config(
        r#"
flush:
  size_threshold: 30
  sentence:
    min_chars: 50
"#,
    )?;
    let err = GuardConfig::load_from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("min_chars"));
    Ok(())
}

#[test]
fn test_pipeline_validation_ignores_detector_settings() {
    let mut config = GuardConfig::load_default().unwrap();
    config.detector.backend = DetectorBackend::Remote;
    assert!(config.validate().is_err());
    assert!(config.validate_pipeline().is_ok());
}
