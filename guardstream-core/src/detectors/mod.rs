//! Concrete [`Detector`](crate::detector::Detector) adapters.
//!
//! * `pattern_detector`: regex rules with optional programmatic validation.
//! * `keyword_detector`: lexicon of confidential terms, Aho-Corasick matched.
//! * `remote_detector`: an HTTP detection model.
//! * `composite`: unions several adapters, failing only when all of them fail.
//!
//! # License
//! MIT OR Apache-2.0

pub mod composite;
pub mod keyword_detector;
pub mod pattern_detector;
pub mod remote_detector;

use std::sync::Arc;

use log::debug;

use crate::config::{DetectorBackend, GuardConfig};
use crate::detector::Detector;
use crate::errors::GuardError;

pub use composite::CompositeDetector;
pub use keyword_detector::KeywordDetector;
pub use pattern_detector::PatternDetector;
pub use remote_detector::RemoteDetector;

/// Builds the detector selected by `config.detector.backend`.
pub fn build_detector(config: &GuardConfig) -> Result<Arc<dyn Detector>, GuardError> {
    match config.detector.backend {
        DetectorBackend::Composite => {
            let mut members = Vec::with_capacity(config.detector.members.len());
            for backend in &config.detector.members {
                members.push(build_single(config, *backend)?);
            }
            Ok(Arc::new(CompositeDetector::new(members)))
        }
        backend => build_single(config, backend),
    }
}

fn build_single(config: &GuardConfig, backend: DetectorBackend) -> Result<Arc<dyn Detector>, GuardError> {
    let detector_config = &config.detector;
    debug!("Building '{}' detector for policy '{}'.", backend, detector_config.policy);
    let detector: Arc<dyn Detector> = match backend {
        DetectorBackend::Pattern => Arc::new(PatternDetector::new(
            detector_config.policy,
            &detector_config.patterns,
        )?),
        DetectorBackend::Keyword => Arc::new(KeywordDetector::new(
            detector_config.policy,
            &detector_config.keywords,
        )?),
        DetectorBackend::Remote => {
            let remote = detector_config.remote.as_ref().ok_or_else(|| {
                GuardError::Config("Remote detector requires `detector.remote`.".to_string())
            })?;
            Arc::new(RemoteDetector::new(detector_config.policy, remote)?)
        }
        DetectorBackend::Composite => {
            return Err(GuardError::Config("Composite detectors cannot be nested.".to_string()));
        }
    };
    Ok(detector)
}
