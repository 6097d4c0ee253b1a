//! The sanitization driver.
//!
//! A [`Pipeline`] is built once from a [`GuardConfig`] and a [`Detector`], then
//! started once per generation. [`Pipeline::start`] creates both output channels,
//! spawns the session task and returns the reading halves immediately; content and
//! audit lines arrive as flushes complete.
//!
//! Each session runs a single sequential loop:
//!
//! ```text
//! Starting -> Streaming <-> Flushing -> Draining -> Closing -> Closed
//!                 \______________\__________\-----> ErrorClosing -> Closed
//! ```
//!
//! Detector failures are recovered (the chunk passes through unredacted). Generator
//! and channel write failures end the session. Channel close failures are ignored.
//!
//! License: MIT OR APACHE 2.0

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::accumulator::{Accumulator, FlushPolicy};
use crate::audit::AuditEvent;
use crate::boundary::BoundaryTracker;
use crate::channel::{ChannelDescriptor, ChannelReader, OutputChannel, QueueChannel, CONTENT_TYPE_PLAIN_TEXT};
use crate::config::{ChannelConfig, GuardConfig};
use crate::detector::Detector;
use crate::detectors::build_detector;
use crate::errors::GuardError;
use crate::generator::Generator;
use crate::redactor::Redactor;
use crate::span::{DetectedSpan, DetectionPolicy, SpanKind};

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Streaming,
    Flushing,
    Draining,
    Closing,
    Closed,
    ErrorClosing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Failed(String),
}

/// What a finished session did. Returned by the session task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub flushes: usize,
    pub chars_checked: usize,
    pub chars_emitted: usize,
    pub items_by_kind: BTreeMap<SpanKind, usize>,
    pub detector_failures: usize,
}

impl SessionReport {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            outcome: SessionOutcome::Completed,
            flushes: 0,
            chars_checked: 0,
            chars_emitted: 0,
            items_by_kind: BTreeMap::new(),
            detector_failures: 0,
        }
    }

    pub fn items_redacted(&self) -> usize {
        self.items_by_kind.values().sum()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SessionOutcome::Completed
    }
}

/// Fixed per-deployment pipeline: flush policy, overlap, markers and detector.
#[derive(Clone)]
pub struct Pipeline {
    flush_policy: FlushPolicy,
    overlap_chars: usize,
    redactor: Redactor,
    channels: ChannelConfig,
    policy: DetectionPolicy,
    detector: Arc<dyn Detector>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("flush_policy", &self.flush_policy)
            .field("overlap_chars", &self.overlap_chars)
            .field("channels", &self.channels)
            .field("policy", &self.policy)
            .field("detector", &self.detector.name())
            .finish()
    }
}

impl Pipeline {
    /// Builds a pipeline around an injected detector.
    pub fn new(config: &GuardConfig, detector: Arc<dyn Detector>) -> Result<Self, GuardError> {
        config.validate_pipeline()?;
        Ok(Self {
            flush_policy: FlushPolicy::from_config(&config.flush)?,
            overlap_chars: config.overlap_chars,
            redactor: Redactor::new(&config.marker_template)?,
            channels: config.channels.clone(),
            policy: config.detector.policy,
            detector,
        })
    }

    /// Builds a pipeline with the detector described by `config.detector`.
    pub fn from_config(config: &GuardConfig) -> Result<Self, GuardError> {
        config.validate()?;
        let detector = build_detector(config)?;
        Self::new(config, detector)
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Starts a session over `generator` on the current Tokio runtime.
    ///
    /// Fails without spawning anything when there is no runtime or a channel cannot
    /// be created. The returned handle exposes both channel readers right away.
    pub fn start<G>(&self, generator: G) -> Result<SessionHandle, GuardError>
    where
        G: Generator + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GuardError::Setup(format!("no Tokio runtime available: {}", e)))?;

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        let describe = |name: &str, role: &str| {
            ChannelDescriptor::new(name, CONTENT_TYPE_PLAIN_TEXT)
                .with_metadata("session_id", session_id.clone())
                .with_metadata("started_at", started_at.clone())
                .with_metadata("role", role)
        };
        let (main, main_reader) = QueueChannel::create(describe(&self.channels.main, "content"), self.channels.capacity)?;
        let (audit, audit_reader) = QueueChannel::create(describe(&self.channels.audit, "audit"), self.channels.capacity)?;

        let session = Session::new(self.clone(), session_id.clone(), Box::new(main), Box::new(audit));
        let task = runtime.spawn(session.run(Box::new(generator)));
        info!("Started guardrail session {} (detector: {}).", session_id, self.detector.name());

        Ok(SessionHandle {
            session_id,
            main: main_reader,
            audit: audit_reader,
            task,
        })
    }

    /// Runs a session to completion on caller-supplied channels.
    pub async fn run_with_channels(
        &self,
        generator: Box<dyn Generator>,
        main: Box<dyn OutputChannel>,
        audit: Box<dyn OutputChannel>,
    ) -> SessionReport {
        let session = Session::new(self.clone(), Uuid::new_v4().to_string(), main, audit);
        session.run(generator).await
    }
}

/// Live handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    pub session_id: String,
    pub main: ChannelReader,
    pub audit: ChannelReader,
    task: JoinHandle<SessionReport>,
}

/// Everything a session wrote, read back after it finished.
#[derive(Debug, Clone)]
pub struct CollectedSession {
    pub main: String,
    pub audit: Vec<String>,
    pub report: SessionReport,
}

impl SessionHandle {
    pub fn into_parts(self) -> (ChannelReader, ChannelReader, JoinHandle<SessionReport>) {
        (self.main, self.audit, self.task)
    }

    /// Waits for the session task, discarding whatever is still unread on both channels.
    pub async fn join(self) -> Result<SessionReport, GuardError> {
        let (main, audit, task) = self.into_parts();
        let (main_dropped, audit_dropped, report) = tokio::join!(main.drain(), audit.drain(), task);
        debug!("Discarded {} content and {} audit chunk(s) on join.", main_dropped, audit_dropped);
        report.map_err(|e| GuardError::Join(e.to_string()))
    }

    /// Drains both channels concurrently and waits for the report.
    pub async fn collect(self) -> Result<CollectedSession, GuardError> {
        let (main, audit, report) = tokio::join!(
            self.main.read_to_string(),
            self.audit.read_to_string(),
            self.task
        );
        let report = report.map_err(|e| GuardError::Join(e.to_string()))?;
        Ok(CollectedSession {
            main,
            audit: audit.lines().map(str::to_string).collect(),
            report,
        })
    }
}

/// Per-session state, owned exclusively by the session task.
struct Session {
    pipeline: Pipeline,
    state: SessionState,
    accumulator: Accumulator,
    boundary: BoundaryTracker,
    main: Box<dyn OutputChannel>,
    audit: Box<dyn OutputChannel>,
    report: SessionReport,
}

impl Session {
    fn new(
        pipeline: Pipeline,
        session_id: String,
        main: Box<dyn OutputChannel>,
        audit: Box<dyn OutputChannel>,
    ) -> Self {
        Self {
            accumulator: Accumulator::new(pipeline.flush_policy.clone()),
            boundary: BoundaryTracker::new(pipeline.overlap_chars).with_markers(pipeline.redactor.markers()),
            pipeline,
            state: SessionState::Starting,
            main,
            audit,
            report: SessionReport::new(session_id),
        }
    }

    async fn run(mut self, mut generator: Box<dyn Generator>) -> SessionReport {
        match self.drive(generator.as_mut()).await {
            Ok(()) => self.close().await,
            Err(e) => self.error_close(e).await,
        }
        info!(
            "Session {} finished: {:?}, {} flush(es), {} item(s), {} chars emitted.",
            self.report.session_id,
            self.report.outcome,
            self.report.flushes,
            self.report.items_redacted(),
            self.report.chars_emitted
        );
        self.report
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {}: {:?} -> {:?}", self.report.session_id, self.state, next);
            self.state = next;
        }
    }

    async fn drive(&mut self, generator: &mut dyn Generator) -> Result<(), GuardError> {
        self.write_audit(AuditEvent::SessionStarted {
            session_id: self.report.session_id.clone(),
            policy: self.pipeline.policy,
            detector: self.pipeline.detector.name().to_string(),
        })
        .await?;
        self.transition(SessionState::Streaming);

        while let Some(delta) = generator.next_delta().await? {
            if delta.is_empty() {
                continue;
            }
            self.accumulator.append(&delta);
            if self.accumulator.should_flush() {
                self.transition(SessionState::Flushing);
                self.flush(false).await?;
                self.transition(SessionState::Streaming);
            }
        }

        if !self.accumulator.is_empty() {
            self.transition(SessionState::Draining);
            self.flush(true).await?;
        } else if !self.boundary.carry_tail().is_empty() {
            self.transition(SessionState::Draining);
            let tail = self.boundary.release();
            self.emit(&tail).await?;
        }
        Ok(())
    }

    /// One validate-and-emit cycle over the carry tail plus the pending buffer.
    async fn flush(&mut self, final_pass: bool) -> Result<(), GuardError> {
        let pending = self.accumulator.take();
        let text = self.boundary.compose(&pending);
        let checked = text.chars().count();
        self.report.flushes += 1;
        self.report.chars_checked += checked;
        self.write_audit(AuditEvent::Checking { chars: checked }).await?;

        let spans = match self.pipeline.detector.detect(&text).await {
            Ok(spans) => {
                let spans: Vec<DetectedSpan> = spans.into_iter().filter(DetectedSpan::is_actionable).collect();
                for span in &spans {
                    *self.report.items_by_kind.entry(span.kind).or_insert(0) += 1;
                }
                self.write_audit(AuditEvent::Findings {
                    kinds: spans.iter().map(|s| s.kind).collect(),
                })
                .await?;
                spans
            }
            Err(e) => {
                warn!(
                    "Detector '{}' failed on a {}-char segment, passing it through: {}",
                    self.pipeline.detector.name(),
                    checked,
                    e
                );
                self.report.detector_failures += 1;
                self.write_audit(AuditEvent::DetectorUnavailable {
                    reason: e.to_string(),
                    chars: checked,
                })
                .await?;
                Vec::new()
            }
        };

        let sanitized = if spans.is_empty() {
            text
        } else {
            self.pipeline.redactor.redact(&text, &spans)
        };
        let new_content = if final_pass {
            self.boundary.finish(sanitized)
        } else {
            self.boundary.advance(&sanitized)
        };
        debug!(
            "Session {}: flush #{} checked {} chars, holding {} tail chars.",
            self.report.session_id,
            self.report.flushes,
            checked,
            self.boundary.carry_tail().chars().count()
        );
        self.emit(&new_content).await
    }

    async fn emit(&mut self, content: &str) -> Result<(), GuardError> {
        let chars = content.chars().count();
        if !content.is_empty() {
            self.main.write(content).await?;
        }
        self.report.chars_emitted += chars;
        self.write_audit(AuditEvent::Emitted { chars }).await
    }

    async fn write_audit(&mut self, event: AuditEvent) -> Result<(), GuardError> {
        self.audit.write(&event.line()).await?;
        Ok(())
    }

    async fn close(&mut self) {
        self.transition(SessionState::Closing);
        let completed = AuditEvent::Completed {
            flushes: self.report.flushes,
            items: self.report.items_redacted(),
            chars_emitted: self.report.chars_emitted,
        };
        if let Err(e) = self.write_audit(completed).await {
            self.error_close(e).await;
            return;
        }
        self.close_channels().await;
        self.transition(SessionState::Closed);
    }

    async fn error_close(&mut self, err: GuardError) {
        self.transition(SessionState::ErrorClosing);
        error!("Guardrail session {} failed: {}", self.report.session_id, err);
        let reason = err.to_string();
        // Channels are still open here; the write fails only if the audit sink itself is broken.
        let failed = AuditEvent::Failed { reason: reason.clone() };
        if let Err(e) = self.audit.write(&failed.line()).await {
            debug!("Could not record failure on the audit channel: {}", e);
        }
        self.close_channels().await;
        self.report.outcome = SessionOutcome::Failed(reason);
        self.transition(SessionState::Closed);
    }

    async fn close_channels(&mut self) {
        for channel in [&mut self.main, &mut self.audit] {
            if let Err(e) = channel.close().await {
                debug!("Ignoring close failure on channel '{}': {}", channel.descriptor().name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DetectorError;
    use crate::generator::IterGenerator;
    use async_trait::async_trait;

    struct NoSpans;

    #[async_trait]
    impl Detector for NoSpans {
        fn name(&self) -> &str {
            "none"
        }

        async fn detect(&self, _text: &str) -> Result<Vec<DetectedSpan>, DetectorError> {
            Ok(Vec::new())
        }
    }

    fn small_config(threshold: usize, overlap: usize) -> GuardConfig {
        let mut config = GuardConfig::default();
        config.flush.size_threshold = threshold;
        config.overlap_chars = overlap;
        config
    }

    #[test]
    fn test_start_outside_runtime_is_a_setup_error() {
        let pipeline = Pipeline::new(&small_config(10, 4), Arc::new(NoSpans)).unwrap();
        let err = pipeline.start(IterGenerator::new(["x"])).unwrap_err();
        assert!(matches!(err, GuardError::Setup(_)));
    }

    #[test]
    fn test_new_rejects_invalid_pipeline_settings() {
        let err = Pipeline::new(&small_config(0, 4), Arc::new(NoSpans)).unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[tokio::test]
    async fn test_report_counts_every_flush() {
        let pipeline = Pipeline::new(&small_config(10, 4), Arc::new(NoSpans)).unwrap();
        let handle = pipeline.start(IterGenerator::new(["0123456789", "abcdefghij", "xyz"])).unwrap();
        let collected = handle.collect().await.unwrap();
        assert_eq!(collected.main, "0123456789abcdefghijxyz");
        assert_eq!(collected.report.flushes, 3);
        assert_eq!(collected.report.chars_emitted, 23);
        // 10, then 4 + 10, then 4 + 3
        assert_eq!(collected.report.chars_checked, 31);
        assert!(collected.report.is_success());
    }

    #[tokio::test]
    async fn test_join_completes_when_writes_outnumber_capacity() {
        let mut config = small_config(5, 2);
        config.channels.capacity = 4;
        let pipeline = Pipeline::new(&config, Arc::new(NoSpans)).unwrap();
        let deltas: Vec<String> = (0..10).map(|i| format!("abcd{}", i)).collect();
        let handle = pipeline.start(IterGenerator::new(deltas)).unwrap();

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), handle.join())
            .await
            .expect("join should not block on full channels")
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.flushes, 10);
        assert_eq!(report.chars_emitted, 50);
    }

    #[tokio::test]
    async fn test_tail_is_released_when_buffer_ends_empty() {
        let pipeline = Pipeline::new(&small_config(5, 3), Arc::new(NoSpans)).unwrap();
        let handle = pipeline.start(IterGenerator::new(["hello"])).unwrap();
        let collected = handle.collect().await.unwrap();
        assert_eq!(collected.main, "hello");
        assert_eq!(collected.report.flushes, 1);
        assert!(collected.audit.contains(&"Emitted 2 chars".to_string()));
        assert!(collected.audit.contains(&"Emitted 3 chars".to_string()));
    }
}
