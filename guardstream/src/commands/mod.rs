//! Command implementations and the configuration they share.

pub mod detect;
pub mod stream;

use anyhow::Result;
use log::{debug, info};

use guardstream_core::config::GuardConfig;

use crate::cli::{DetectorArgs, StreamCommand};

/// Loads `--config`, else the first config found in the standard locations, else the
/// embedded defaults, and applies the detector flags on top.
pub fn load_config(args: &DetectorArgs) -> Result<GuardConfig> {
    let mut config = match &args.config {
        Some(path) => GuardConfig::load_from_file(path)?,
        None => match GuardConfig::locate() {
            Some(path) => {
                info!("Using configuration found at {}", path.display());
                GuardConfig::load_from_file(path)?
            }
            None => GuardConfig::load_default()?,
        },
    };
    if let Some(backend) = args.backend {
        config.detector.backend = backend.into();
    }
    if let Some(policy) = args.policy {
        config.detector.policy = policy.into();
    }
    Ok(config)
}

/// Applies the flush and overlap flags of `stream`.
pub fn apply_stream_overrides(config: &mut GuardConfig, cmd: &StreamCommand) {
    if let Some(threshold) = cmd.threshold {
        config.flush.size_threshold = threshold;
    }
    if let Some(overlap) = cmd.overlap {
        config.overlap_chars = overlap;
    }
    if cmd.sentence_flush {
        let mut sentence = config.flush.sentence.clone().unwrap_or_default();
        if let Some(min_chars) = cmd.min_sentence_chars {
            sentence.min_chars = min_chars;
        }
        // Keep the default minimum usable with a small threshold.
        if cmd.min_sentence_chars.is_none() && sentence.min_chars > config.flush.size_threshold {
            sentence.min_chars = config.flush.size_threshold;
        }
        config.flush.sentence = Some(sentence);
    }
    debug!(
        "Effective flush settings: threshold {}, overlap {}, sentence flush {}",
        config.flush.size_threshold,
        config.overlap_chars,
        config.flush.sentence.is_some()
    );
}
