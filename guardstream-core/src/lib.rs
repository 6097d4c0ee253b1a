// guardstream-core/src/lib.rs
//! # Guardstream Core Library
//!
//! `guardstream-core` sanitizes streamed text before it reaches a reader. Text arrives
//! as a sequence of deltas from a [`Generator`]; the pipeline buffers them, hands each
//! buffered segment (plus a short tail of already-checked text) to a [`Detector`],
//! replaces every reported value with a `[REDACTED:KIND]` marker and emits the result
//! on a `main` channel while status lines go to a separate audit channel.
//!
//! ## Modules
//!
//! * `config`: [`GuardConfig`], loaded from YAML over embedded defaults.
//! * `span`: [`DetectedSpan`], [`SpanKind`] and [`DetectionPolicy`].
//! * `redactor`: literal, longest-first, idempotent replacement.
//! * `accumulator`: buffering and the flush policy.
//! * `boundary`: the carry tail held back between flushes.
//! * `detector` / `detectors`: the [`Detector`] trait and its pattern, keyword,
//!   remote and composite adapters.
//! * `generator`: the [`Generator`] trait and in-memory, channel and reader sources.
//! * `channel`: append-only output channels.
//! * `audit`: audit line vocabulary.
//! * `driver`: [`Pipeline`] and the per-session state machine.
//! * `headless`: one-shot helpers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use guardstream_core::{GuardConfig, IterGenerator, Pipeline};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GuardConfig::load_default()?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let session = pipeline.start(IterGenerator::new(["Mail me at ", "jo@example.com."]))?;
//! let collected = session.collect().await?;
//! assert_eq!(collected.main, "Mail me at [REDACTED:EMAIL].");
//! # Ok(())
//! # }
//! ```
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod accumulator;
pub mod audit;
pub mod boundary;
pub mod channel;
pub mod config;
pub mod detector;
pub mod detectors;
pub mod driver;
pub mod errors;
pub mod generator;
pub mod headless;
pub mod redactor;
pub mod span;
pub mod validators;

pub use accumulator::{Accumulator, FlushPolicy};
pub use audit::AuditEvent;
pub use boundary::BoundaryTracker;
pub use channel::{ChannelDescriptor, ChannelReader, OutputChannel, QueueChannel, CONTENT_TYPE_PLAIN_TEXT};
pub use config::{
    config_candidate_paths, ChannelConfig, DetectorBackend, DetectorConfig, FlushConfig, GuardConfig,
    PatternRule, RemoteDetectorConfig, SentenceFlushConfig, MAX_OVERLAP_CHARS, MAX_PATTERN_LENGTH,
};
pub use detector::Detector;
pub use detectors::{build_detector, CompositeDetector, KeywordDetector, PatternDetector, RemoteDetector};
pub use driver::{CollectedSession, Pipeline, SessionHandle, SessionOutcome, SessionReport, SessionState};
pub use errors::{ChannelError, DetectorError, GeneratorError, GuardError};
pub use generator::{Generator, IterGenerator, ReadMode, ReaderGenerator, ReceiverGenerator};
pub use headless::{sanitize_deltas, sanitize_text};
pub use redactor::{redact, Redactor};
pub use span::{mask_value, span_fingerprint, DetectedSpan, DetectionPolicy, SpanKind};
