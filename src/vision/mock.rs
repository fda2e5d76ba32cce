//! vision/mock.rs — Deterministic collaborators for tests and offline runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::{ObjectDetector, SimilarityOracle};

/// Oracle answering from a fixed reference-path → score table.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    scores: HashMap<PathBuf, f32>,
    default_score: f32,
}

impl MockOracle {
    /// Same score for every pair.
    pub fn fixed(score: f32) -> Self {
        Self {
            scores: HashMap::new(),
            default_score: score,
        }
    }

    /// Score keyed by the reference image path.
    pub fn with_score(mut self, reference: impl Into<PathBuf>, score: f32) -> Self {
        self.scores.insert(reference.into(), score);
        self
    }
}

#[async_trait]
impl SimilarityOracle for MockOracle {
    async fn similarity(&self, _probe: &Path, reference: &Path) -> f32 {
        self.scores
            .get(reference)
            .copied()
            .unwrap_or(self.default_score)
            .clamp(0.0, 1.0)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Detector answering a fixed label map regardless of input.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    labels: BTreeMap<String, u32>,
}

impl MockDetector {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_labels(pairs: &[(&str, u32)]) -> Self {
        Self {
            labels: pairs.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
        }
    }
}

#[async_trait]
impl ObjectDetector for MockDetector {
    async fn detect(&self, _image: &Path) -> BTreeMap<String, u32> {
        self.labels.clone()
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
