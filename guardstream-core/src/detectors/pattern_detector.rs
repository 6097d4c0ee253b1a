//! A [`Detector`] that uses regular expressions to find PII.
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};

use crate::config::{PatternRule, MAX_PATTERN_LENGTH};
use crate::detector::{dedupe_spans, Detector};
use crate::errors::{DetectorError, GuardError};
use crate::span::{DetectedSpan, DetectionPolicy, SpanKind};
use crate::validators;

/// A single compiled rule.
#[derive(Debug)]
pub struct CompiledPattern {
    pub kind: SpanKind,
    pub regex: Regex,
    pub validate: bool,
}

#[derive(Debug)]
pub struct PatternDetector {
    policy: DetectionPolicy,
    patterns: Vec<CompiledPattern>,
}

impl PatternDetector {
    /// Compiles the rules that belong to `policy`. Rules for other kinds are skipped.
    pub fn new(policy: DetectionPolicy, rules: &[PatternRule]) -> Result<Self, GuardError> {
        debug!("Starting compilation of {} pattern rules.", rules.len());

        let mut patterns = Vec::new();
        let mut errors = Vec::new();

        for rule in rules {
            if !policy.allows(rule.kind) {
                warn!("Skipping '{}' pattern: not part of policy '{}'.", rule.kind, policy);
                continue;
            }
            if rule.pattern.len() > MAX_PATTERN_LENGTH {
                errors.push(GuardError::PatternLengthExceeded(
                    rule.kind.to_string(),
                    rule.pattern.len(),
                    MAX_PATTERN_LENGTH,
                ));
                continue;
            }

            let compiled = RegexBuilder::new(&rule.pattern)
                .case_insensitive(rule.case_insensitive)
                .size_limit(10 * (1 << 20))
                .build();

            match compiled {
                Ok(regex) => {
                    log::debug!(
                        target: "guardstream_core::detectors",
                        "Pattern for '{}' compiled successfully.",
                        rule.kind
                    );
                    patterns.push(CompiledPattern { kind: rule.kind, regex, validate: rule.validate });
                }
                Err(e) => errors.push(GuardError::InvalidPattern(rule.kind.to_string(), e)),
            }
        }

        if !errors.is_empty() {
            let message = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n");
            return Err(GuardError::Config(format!(
                "Failed to compile {} pattern(s):\n{}",
                errors.len(),
                message
            )));
        }
        if patterns.is_empty() {
            return Err(GuardError::Config(format!(
                "Pattern detector has no rules for policy '{}'.",
                policy
            )));
        }

        debug!("Finished compiling patterns. Total compiled: {}.", patterns.len());
        Ok(Self { policy, patterns })
    }

    pub fn policy(&self) -> DetectionPolicy {
        self.policy
    }

    /// Synchronous scan, in rule order then match order.
    pub fn find_spans(&self, text: &str) -> Vec<DetectedSpan> {
        let mut spans = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                let value = m.as_str();
                if pattern.validate && !validators::validate_for_kind(pattern.kind, value) {
                    debug!("Discarding '{}' match that failed validation.", pattern.kind);
                    continue;
                }
                spans.push(DetectedSpan::new(pattern.kind, value));
            }
        }
        dedupe_spans(spans)
    }
}

#[async_trait]
impl Detector for PatternDetector {
    fn name(&self) -> &str {
        "pattern"
    }

    async fn detect(&self, text: &str) -> Result<Vec<DetectedSpan>, DetectorError> {
        Ok(self.find_spans(text))
    }
}
