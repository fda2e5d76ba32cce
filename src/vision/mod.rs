//! vision — External AI collaborators: the image-similarity oracle and the
//! object detector.
//!
//! Both are black boxes to the engine. They never fail a request: a broken
//! or absent collaborator degrades to a neutral answer (score 0.0, empty
//! detections) and the decision proceeds. No retries — a single low score
//! is a valid outcome, not a failure.

pub mod mock;
pub mod remote;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::VisionConfig;

/// Visual likeness between two images, `[0.0, 1.0]`.
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// Higher is more similar; 0.0 on any internal failure. Never errors.
    async fn similarity(&self, probe: &Path, reference: &Path) -> f32;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Object detection over a single image.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detected label → occurrence count; empty map on failure. Never errors.
    async fn detect(&self, image: &Path) -> BTreeMap<String, u32>;
    fn provider_name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn SimilarityOracle>;
pub type DynDetector = Arc<dyn ObjectDetector>;

/// Collaborator used when no vision service is configured.
pub struct DisabledVision;

#[async_trait]
impl SimilarityOracle for DisabledVision {
    async fn similarity(&self, _probe: &Path, _reference: &Path) -> f32 {
        0.0
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[async_trait]
impl ObjectDetector for DisabledVision {
    async fn detect(&self, _image: &Path) -> BTreeMap<String, u32> {
        BTreeMap::new()
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Factory: build both collaborators from config and environment.
///
/// * `VISION_TEST_MODE=mock` returns deterministic mocks.
/// * An unset endpoint returns the disabled collaborator for that role.
pub fn build_from_config(config: &VisionConfig, media_dir: &str) -> (DynOracle, DynDetector) {
    if std::env::var("VISION_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        info!("vision collaborators running in mock mode");
        return (
            Arc::new(mock::MockOracle::fixed(0.0)),
            Arc::new(mock::MockDetector::empty()),
        );
    }

    let oracle: DynOracle = match &config.similarity_url {
        Some(url) => match remote::RemoteVision::new(url, config.timeout_secs, media_dir) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "similarity oracle unavailable, degrading to disabled");
                Arc::new(DisabledVision)
            }
        },
        None => Arc::new(DisabledVision),
    };

    let detector: DynDetector = match &config.detector_url {
        Some(url) => match remote::RemoteVision::new(url, config.timeout_secs, media_dir) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "object detector unavailable, degrading to disabled");
                Arc::new(DisabledVision)
            }
        },
        None => Arc::new(DisabledVision),
    };

    info!(
        oracle = oracle.provider_name(),
        detector = detector.provider_name(),
        "vision collaborators ready"
    );
    (oracle, detector)
}
