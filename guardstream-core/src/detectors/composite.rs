//! Runs several detectors over the same text and unions their spans.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;

use crate::detector::{dedupe_spans, Detector};
use crate::errors::DetectorError;
use crate::span::DetectedSpan;

pub struct CompositeDetector {
    members: Vec<Arc<dyn Detector>>,
    name: String,
}

impl CompositeDetector {
    pub fn new(members: Vec<Arc<dyn Detector>>) -> Self {
        let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
        let name = format!("composite({})", names.join("+"));
        Self { members, name }
    }
}

#[async_trait]
impl Detector for CompositeDetector {
    fn name(&self) -> &str {
        &self.name
    }

    /// A failing member is skipped; the call fails only when every member fails.
    async fn detect(&self, text: &str) -> Result<Vec<DetectedSpan>, DetectorError> {
        let mut spans = Vec::new();
        let mut failures = Vec::new();

        for member in &self.members {
            match member.detect(text).await {
                Ok(found) => spans.extend(found),
                Err(e) => {
                    warn!("Detector '{}' failed inside {}: {}", member.name(), self.name, e);
                    failures.push(format!("{}: {}", member.name(), e));
                }
            }
        }

        if !self.members.is_empty() && failures.len() == self.members.len() {
            return Err(DetectorError::Unavailable(failures.join("; ")));
        }
        Ok(dedupe_spans(spans))
    }
}
