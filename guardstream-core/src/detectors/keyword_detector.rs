//! A [`Detector`] for confidential business terms.
//!
//! Terms come from the configured lexicon (project codenames, deal names,
//! internal figures). Matching is ASCII case-insensitive, leftmost-longest and
//! word-boundary aware so "Atlas" does not fire inside "Atlassian".

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use daachorse::{DoubleArrayAhoCorasick, DoubleArrayAhoCorasickBuilder, MatchKind};
use log::{debug, warn};

use crate::detector::{dedupe_spans, Detector};
use crate::errors::{DetectorError, GuardError};
use crate::span::{DetectedSpan, DetectionPolicy, SpanKind};

pub struct KeywordDetector {
    automaton: DoubleArrayAhoCorasick<u32>,
    /// Kind for each pattern id, in build order.
    kinds: Vec<SpanKind>,
}

impl fmt::Debug for KeywordDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordDetector")
            .field("automaton", &"<DoubleArrayAhoCorasick>")
            .field("terms", &self.kinds.len())
            .finish()
    }
}

impl KeywordDetector {
    pub fn new(policy: DetectionPolicy, lexicon: &BTreeMap<SpanKind, Vec<String>>) -> Result<Self, GuardError> {
        let mut seen = std::collections::HashSet::new();
        let mut terms = Vec::new();
        let mut kinds = Vec::new();

        for (kind, words) in lexicon {
            if !policy.allows(*kind) {
                warn!("Skipping '{}' keywords: not part of policy '{}'.", kind, policy);
                continue;
            }
            for word in words {
                let normalized = word.trim().to_ascii_lowercase();
                if normalized.is_empty() || !seen.insert(normalized.clone()) {
                    continue;
                }
                terms.push(normalized);
                kinds.push(*kind);
            }
        }

        if terms.is_empty() {
            return Err(GuardError::Config(format!(
                "Keyword detector has no terms for policy '{}'.",
                policy
            )));
        }

        let automaton = DoubleArrayAhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&terms)
            .map_err(|e| GuardError::Config(format!("Failed to build keyword automaton: {}", e)))?;

        debug!("Keyword detector ready with {} terms.", terms.len());
        Ok(Self { automaton, kinds })
    }

    pub fn find_spans(&self, text: &str) -> Vec<DetectedSpan> {
        let haystack = text.to_ascii_lowercase();
        let bytes = haystack.as_bytes();
        let mut spans = Vec::new();

        for matched in self.automaton.leftmost_find_iter(&haystack) {
            let (start, end) = (matched.start(), matched.end());

            let prefix_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
            let suffix_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
            if !(prefix_ok && suffix_ok) {
                continue;
            }

            let Some(kind) = self.kinds.get(matched.value() as usize) else { continue; };
            if let Some(original) = text.get(start..end) {
                spans.push(DetectedSpan::new(*kind, original));
            }
        }
        dedupe_spans(spans)
    }
}

#[async_trait]
impl Detector for KeywordDetector {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn detect(&self, text: &str) -> Result<Vec<DetectedSpan>, DetectorError> {
        Ok(self.find_spans(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> BTreeMap<SpanKind, Vec<String>> {
        let mut map = BTreeMap::new();
        map.insert(SpanKind::Product, vec!["Atlas".to_string(), "Atlas Pro".to_string()]);
        map.insert(SpanKind::Financial, vec!["Q3 revenue".to_string()]);
        map.insert(SpanKind::Email, vec!["ignored".to_string()]);
        map
    }

    #[test]
    fn test_returns_verbatim_case() {
        let detector = KeywordDetector::new(DetectionPolicy::Confidential, &lexicon()).unwrap();
        let spans = detector.find_spans("The q3 REVENUE for ATLAS is up.");
        assert_eq!(
            spans,
            vec![
                DetectedSpan::new(SpanKind::Financial, "q3 REVENUE"),
                DetectedSpan::new(SpanKind::Product, "ATLAS"),
            ]
        );
    }

    #[test]
    fn test_leftmost_longest_and_word_boundaries() {
        let detector = KeywordDetector::new(DetectionPolicy::Confidential, &lexicon()).unwrap();
        let spans = detector.find_spans("Atlas Pro ships; Atlassian does not.");
        assert_eq!(spans, vec![DetectedSpan::new(SpanKind::Product, "Atlas Pro")]);
    }

    #[test]
    fn test_terms_outside_policy_are_ignored() {
        let detector = KeywordDetector::new(DetectionPolicy::Confidential, &lexicon()).unwrap();
        assert!(detector.find_spans("this is ignored").is_empty());
    }

    #[test]
    fn test_empty_lexicon_is_rejected() {
        assert!(KeywordDetector::new(DetectionPolicy::Pii, &lexicon()).is_ok());
        assert!(KeywordDetector::new(DetectionPolicy::Confidential, &BTreeMap::new()).is_err());
    }
}
