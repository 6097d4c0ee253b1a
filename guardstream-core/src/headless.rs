//! `headless.rs`
//! Convenience wrappers for running a whole session without consuming the channels
//! incrementally. Useful for batch jobs and tests.

use std::sync::Arc;

use crate::config::GuardConfig;
use crate::detector::Detector;
use crate::driver::{CollectedSession, Pipeline};
use crate::errors::GuardError;
use crate::generator::IterGenerator;

/// Runs `deltas` through a session with an injected detector and collects both channels.
///
/// Must be called from within a Tokio runtime.
pub async fn sanitize_deltas<I, S>(
    config: &GuardConfig,
    detector: Arc<dyn Detector>,
    deltas: I,
) -> Result<CollectedSession, GuardError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let pipeline = Pipeline::new(config, detector)?;
    pipeline.start(IterGenerator::new(deltas))?.collect().await
}

/// Sanitizes a complete string with the detector described by `config`.
///
/// The text is fed as a single delta, so it is checked in one pass.
pub async fn sanitize_text(config: &GuardConfig, text: &str) -> Result<String, GuardError> {
    let pipeline = Pipeline::from_config(config)?;
    let collected = pipeline.start(IterGenerator::new([text]))?.collect().await?;
    Ok(collected.main)
}
