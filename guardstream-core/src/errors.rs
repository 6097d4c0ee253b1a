//! errors.rs - Custom error types for the guardstream-core library.
//!
//! The crate-level [`GuardError`] covers configuration, setup and fatal session
//! failures. Each external seam (detector, generator, channel) gets its own small
//! enum so the driver can tell a recoverable detector failure apart from a fatal
//! generator or channel failure.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// All errors surfaced by the `guardstream-core` library.
///
/// `#[non_exhaustive]` so new variants can be added without breaking consumers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GuardError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to compile pattern for '{0}': {1}")]
    InvalidPattern(String, regex::Error),

    #[error("Pattern for '{0}': length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Session setup failed: {0}")]
    Setup(String),

    #[error("Session task did not complete: {0}")]
    Join(String),

    #[error("Generator failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Channel failure: {0}")]
    Channel(#[from] ChannelError),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}

/// Failure of a [`crate::detector::Detector`] call.
///
/// The driver never propagates these: a detector failure is recorded on the
/// audit channel and the chunk passes through unredacted.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DetectorError {
    #[error("detector transport error: {0}")]
    Transport(String),

    #[error("detector timed out after {0} ms")]
    Timeout(u64),

    #[error("detector returned HTTP status {0}")]
    Status(u16),

    #[error("detector returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

/// Failure while producing text deltas. Fatal to the session.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("upstream generator failed: {0}")]
    Upstream(String),
}

/// Failure while writing to or closing an output channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelError {
    #[error("channel '{0}' is closed")]
    Closed(String),

    #[error("channel '{0}' has no reader attached")]
    Disconnected(String),

    #[error("channel '{name}' I/O error: {reason}")]
    Io { name: String, reason: String },
}
