//! Detected span types and PII-safe logging helpers.
//!
//! A [`DetectedSpan`] is what a detector reports: a category tag and the verbatim
//! substring believed sensitive. [`SpanKind`] is a closed tag set split across two
//! [`DetectionPolicy`] variants.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

lazy_static! {
    /// Read once: whether raw sensitive values may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("GUARDSTREAM_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// Category of a sensitive span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
    Financial,
    Product,
    Rnd,
    Contact,
    Strategy,
}

impl SpanKind {
    pub const ALL: [SpanKind; 9] = [
        SpanKind::Email,
        SpanKind::Phone,
        SpanKind::Ssn,
        SpanKind::CreditCard,
        SpanKind::Financial,
        SpanKind::Product,
        SpanKind::Rnd,
        SpanKind::Contact,
        SpanKind::Strategy,
    ];

    /// The snake_case tag used in config files, audit lines and remote payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Email => "email",
            SpanKind::Phone => "phone",
            SpanKind::Ssn => "ssn",
            SpanKind::CreditCard => "credit_card",
            SpanKind::Financial => "financial",
            SpanKind::Product => "product",
            SpanKind::Rnd => "rnd",
            SpanKind::Contact => "contact",
            SpanKind::Strategy => "strategy",
        }
    }

    /// Upper-cased tag, as it appears inside redaction markers.
    pub fn marker_label(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised span kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSpanKindError(pub String);

impl fmt::Display for ParseSpanKindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown span kind '{}'", self.0)
    }
}

impl std::error::Error for ParseSpanKindError {}

impl FromStr for SpanKind {
    type Err = ParseSpanKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        SpanKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ParseSpanKindError(s.to_string()))
    }
}

/// Which family of sensitive data a session looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Personal data: email, phone, ssn, credit_card.
    #[default]
    Pii,
    /// Confidential business data: financial, product, rnd, contact, strategy.
    Confidential,
}

impl DetectionPolicy {
    pub fn kinds(&self) -> &'static [SpanKind] {
        match self {
            DetectionPolicy::Pii => &[
                SpanKind::Email,
                SpanKind::Phone,
                SpanKind::Ssn,
                SpanKind::CreditCard,
            ],
            DetectionPolicy::Confidential => &[
                SpanKind::Financial,
                SpanKind::Product,
                SpanKind::Rnd,
                SpanKind::Contact,
                SpanKind::Strategy,
            ],
        }
    }

    pub fn allows(&self, kind: SpanKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionPolicy::Pii => "pii",
            DetectionPolicy::Confidential => "confidential",
        }
    }
}

impl fmt::Display for DetectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensitive substring reported by a detector.
///
/// `value` is expected to be a verbatim substring of the checked text. Spans with an
/// empty value are ignored by the redactor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectedSpan {
    pub kind: SpanKind,
    pub value: String,
}

impl DetectedSpan {
    pub fn new(kind: SpanKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }

    pub fn is_actionable(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Masks a sensitive value for display.
pub fn mask_value(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let len = s.chars().count();
    if len <= MAX_LEN {
        "[MASKED]".to_string()
    } else {
        format!("[MASKED: {} chars]", len)
    }
}

/// Stable SHA-256 fingerprint of a span, for correlating log lines without the value.
pub fn span_fingerprint(span: &DetectedSpan) -> String {
    let mut hasher = Sha256::new();
    hasher.update(span.kind.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(span.value.as_bytes());
    hex::encode(hasher.finalize())
}

fn loggable_value(value: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        value.to_string()
    } else {
        mask_value(value)
    }
}

pub fn log_detected_span_debug(module_path: &str, span: &DetectedSpan) {
    debug!(
        "{} Detected span: kind='{}', value='{}', fingerprint={}",
        module_path,
        span.kind,
        loggable_value(&span.value),
        &span_fingerprint(span)[..12]
    );
}
