//! A [`Detector`] backed by an HTTP detection model.
//!
//! Request: `POST <endpoint>` with `{"model", "policy", "text"}`.
//! Response: `{"items": [{"type": "<kind>", "value": "<verbatim substring>"}]}`.
//! Items with an unknown type, a type outside the policy, or an empty value are
//! dropped. The client-side timeout bounds each call.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RemoteDetectorConfig;
use crate::detector::{dedupe_spans, Detector};
use crate::errors::{DetectorError, GuardError};
use crate::span::{DetectedSpan, DetectionPolicy, SpanKind};

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    policy: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    items: Vec<RemoteItem>,
}

#[derive(Debug, Deserialize)]
struct RemoteItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Clone)]
pub struct RemoteDetector {
    client: Client,
    endpoint: String,
    model: Option<String>,
    policy: DetectionPolicy,
    timeout_ms: u64,
    api_key: Option<String>,
}

impl RemoteDetector {
    pub fn new(policy: DetectionPolicy, config: &RemoteDetectorConfig) -> Result<Self, GuardError> {
        if config.endpoint.trim().is_empty() {
            return Err(GuardError::Config("Remote detector requires an endpoint.".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("guardstream/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GuardError::Setup(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = match &config.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    warn!("Environment variable '{}' is not set; calling detector without credentials.", var);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            policy,
            timeout_ms: config.timeout_ms,
            api_key,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> DetectorError {
        if e.is_timeout() {
            DetectorError::Timeout(self.timeout_ms)
        } else if e.is_decode() {
            DetectorError::MalformedResponse(e.to_string())
        } else {
            DetectorError::Transport(e.to_string())
        }
    }

    fn accept_items(&self, items: Vec<RemoteItem>) -> Vec<DetectedSpan> {
        let mut spans = Vec::with_capacity(items.len());
        for item in items {
            let kind = match item.kind.parse::<SpanKind>() {
                Ok(kind) if self.policy.allows(kind) => kind,
                Ok(kind) => {
                    warn!("Dropping remote item of kind '{}': outside policy '{}'.", kind, self.policy);
                    continue;
                }
                Err(e) => {
                    warn!("Dropping remote item: {}.", e);
                    continue;
                }
            };
            spans.push(DetectedSpan::new(kind, item.value));
        }
        dedupe_spans(spans)
    }
}

#[async_trait]
impl Detector for RemoteDetector {
    fn name(&self) -> &str {
        "remote"
    }

    async fn detect(&self, text: &str) -> Result<Vec<DetectedSpan>, DetectorError> {
        let body = DetectRequest {
            model: self.model.as_deref(),
            policy: self.policy.as_str(),
            text,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DetectorError::Status(status.as_u16()));
        }

        let raw = response.text().await.map_err(|e| self.map_transport_error(e))?;
        let parsed: DetectResponse =
            serde_json::from_str(&raw).map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;

        let spans = self.accept_items(parsed.items);
        debug!("Remote detector returned {} span(s).", spans.len());
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> RemoteDetector {
        let config = RemoteDetectorConfig {
            endpoint: "http://127.0.0.1:9/detect".to_string(),
            ..Default::default()
        };
        RemoteDetector::new(DetectionPolicy::Pii, &config).unwrap()
    }

    #[test]
    fn test_items_are_filtered_by_policy_and_kind() {
        let items = vec![
            RemoteItem { kind: "email".to_string(), value: "a@b.io".to_string() },
            RemoteItem { kind: "strategy".to_string(), value: "expand".to_string() },
            RemoteItem { kind: "passport".to_string(), value: "X1".to_string() },
            RemoteItem { kind: "phone".to_string(), value: String::new() },
        ];
        let spans = detector().accept_items(items);
        assert_eq!(spans, vec![DetectedSpan::new(SpanKind::Email, "a@b.io")]);
    }

    #[test]
    fn test_missing_endpoint_is_rejected() {
        let err = RemoteDetector::new(DetectionPolicy::Pii, &RemoteDetectorConfig::default()).unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }
}
