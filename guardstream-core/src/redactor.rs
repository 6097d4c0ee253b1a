//! Literal, longest-first redaction of detected spans.
//!
//! Values are replaced by exact substring search, never by building a pattern
//! from them, so nothing in a detected value needs escaping. Markers already
//! present in the text (from this pass or an earlier one) are split out first and
//! never re-scanned, which makes `redact` idempotent for a fixed span set.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::config::DEFAULT_MARKER_TEMPLATE;
use crate::errors::GuardError;
use crate::span::{log_detected_span_debug, DetectedSpan, SpanKind};

#[derive(Serialize)]
struct MarkerContext {
    kind: String,
}

/// One run of the partially redacted text.
#[derive(Debug)]
enum Piece<'a> {
    Text(String),
    Marker(&'a str),
}

/// Replaces detected spans with per-kind markers.
#[derive(Debug, Clone)]
pub struct Redactor {
    /// Rendered marker per kind, in `SpanKind::ALL` order.
    markers: Vec<(SpanKind, String)>,
    /// Marker strings, longest first, for protecting existing markers.
    protected: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        let markers = SpanKind::ALL
            .iter()
            .map(|k| (*k, format!("[REDACTED:{}]", k.marker_label())))
            .collect();
        Self::from_markers(markers)
    }
}

impl Redactor {
    /// Renders `template` once per kind. `{kind}` expands to the upper-cased tag.
    pub fn new(template: &str) -> Result<Self, GuardError> {
        if template == DEFAULT_MARKER_TEMPLATE {
            return Ok(Self::default());
        }

        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("marker", template)
            .map_err(|e| GuardError::Config(format!("Invalid marker template '{}': {}", template, e)))?;

        let mut markers = Vec::with_capacity(SpanKind::ALL.len());
        for kind in SpanKind::ALL {
            let ctx = MarkerContext { kind: kind.marker_label() };
            let rendered = tt
                .render("marker", &ctx)
                .map_err(|e| GuardError::Config(format!("Failed to render marker template: {}", e)))?;
            markers.push((kind, rendered));
        }

        let mut seen = std::collections::HashSet::new();
        if markers.iter().any(|(_, m)| m.is_empty() || !seen.insert(m.clone())) {
            return Err(GuardError::Config(format!(
                "Marker template '{}' must render a distinct, non-empty marker per kind",
                template
            )));
        }

        Ok(Self::from_markers(markers))
    }

    fn from_markers(markers: Vec<(SpanKind, String)>) -> Self {
        let mut protected: Vec<String> = markers.iter().map(|(_, m)| m.clone()).collect();
        protected.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { markers, protected }
    }

    /// Every rendered marker, longest first.
    pub fn markers(&self) -> &[String] {
        &self.protected
    }

    pub fn marker_for(&self, kind: SpanKind) -> &str {
        self.markers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, m)| m.as_str())
            .unwrap_or("[REDACTED]")
    }

    /// Replaces every occurrence of every span value, longest value first.
    pub fn redact(&self, text: &str, spans: &[DetectedSpan]) -> String {
        let mut ordered: Vec<&DetectedSpan> = spans.iter().filter(|s| s.is_actionable()).collect();
        if ordered.is_empty() {
            return text.to_string();
        }
        // Stable: equal-length values keep detector order.
        ordered.sort_by(|a, b| b.value.chars().count().cmp(&a.value.chars().count()));

        let mut pieces = vec![Piece::Text(text.to_string())];
        for marker in &self.protected {
            pieces = split_pieces(pieces, marker, marker);
        }

        let mut applied = std::collections::HashSet::new();
        for span in ordered {
            if !applied.insert(span.value.as_str()) {
                continue;
            }
            log_detected_span_debug(module_path!(), span);
            pieces = split_pieces(pieces, &span.value, self.marker_for(span.kind));
        }

        let out: String = pieces
            .iter()
            .map(|p| match p {
                Piece::Text(s) => s.as_str(),
                Piece::Marker(m) => *m,
            })
            .collect();
        debug!("Redacted {} chars into {} chars.", text.chars().count(), out.chars().count());
        out
    }
}

/// Splits every text piece on `needle`, inserting `marker` for each occurrence.
fn split_pieces<'a>(pieces: Vec<Piece<'a>>, needle: &str, marker: &'a str) -> Vec<Piece<'a>> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Text(s) if s.contains(needle) => {
                let mut last = 0;
                for (idx, _) in s.match_indices(needle) {
                    if idx > last {
                        out.push(Piece::Text(s[last..idx].to_string()));
                    }
                    out.push(Piece::Marker(marker));
                    last = idx + needle.len();
                }
                if last < s.len() {
                    out.push(Piece::Text(s[last..].to_string()));
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Redacts with the default `[REDACTED:<KIND>]` markers.
pub fn redact(text: &str, spans: &[DetectedSpan]) -> String {
    Redactor::default().redact(text, spans)
}
