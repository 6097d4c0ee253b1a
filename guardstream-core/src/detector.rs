//! The detection capability consumed by the pipeline.
//!
//! The driver depends only on this trait. Adapters live in [`crate::detectors`];
//! tests and embedders can supply their own.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;

use crate::errors::DetectorError;
use crate::span::DetectedSpan;

/// Finds sensitive spans in a piece of text.
///
/// On success every returned `value` should be a verbatim substring of `text`;
/// the pipeline does not check this, and a value that is not present simply
/// redacts nothing. An `Err` is treated by the driver as "no spans found": the
/// chunk is emitted unredacted and the failure is recorded on the audit channel.
/// Adapters own their own timeout and retry policy.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Short identifier used in logs and audit lines.
    fn name(&self) -> &str;

    async fn detect(&self, text: &str) -> Result<Vec<DetectedSpan>, DetectorError>;
}

/// Drops empty values and repeated values, keeping the first kind reported.
pub fn dedupe_spans(spans: Vec<DetectedSpan>) -> Vec<DetectedSpan> {
    let mut seen = std::collections::HashSet::new();
    spans
        .into_iter()
        .filter(|s| s.is_actionable() && seen.insert(s.value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanKind;

    #[test]
    fn test_dedupe_keeps_first_kind() {
        let spans = vec![
            DetectedSpan::new(SpanKind::Email, "a@b.io"),
            DetectedSpan::new(SpanKind::Contact, "a@b.io"),
            DetectedSpan::new(SpanKind::Phone, ""),
        ];
        let out = dedupe_spans(spans);
        assert_eq!(out, vec![DetectedSpan::new(SpanKind::Email, "a@b.io")]);
    }
}
