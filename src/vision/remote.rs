//! vision/remote.rs — HTTP-backed vision collaborators.
//!
//! Talks to an embedding/detection service over multipart POST. Any
//! transport or decoding failure degrades to the neutral answer; the error
//! is logged, never propagated.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::{ObjectDetector, SimilarityOracle};

pub struct RemoteVision {
    client: reqwest::Client,
    base_url: String,
    /// Root for relative reference-image handles from the catalog.
    media_root: PathBuf,
}

#[derive(Deserialize)]
struct SimilarityResp {
    score: f32,
}

#[derive(Deserialize)]
struct DetectResp {
    #[serde(default)]
    detections: BTreeMap<String, u32>,
}

impl RemoteVision {
    pub fn new(base_url: &str, timeout_secs: u64, media_root: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            media_root: PathBuf::from(media_root),
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_root.join(path)
        }
    }

    async fn file_part(path: &Path, field: &str) -> anyhow::Result<reqwest::multipart::Part> {
        let bytes = tokio::fs::read(path).await?;
        Ok(reqwest::multipart::Part::bytes(bytes).file_name(format!("{field}.jpg")))
    }

    async fn post_similarity(&self, probe: &Path, reference: &Path) -> anyhow::Result<f32> {
        let reference = self.resolve(reference);
        let form = reqwest::multipart::Form::new()
            .part("probe", Self::file_part(probe, "probe").await?)
            .part("reference", Self::file_part(&reference, "reference").await?);

        let resp: SimilarityResp = self
            .client
            .post(format!("{}/similarity", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.score)
    }

    async fn post_detect(&self, image: &Path) -> anyhow::Result<BTreeMap<String, u32>> {
        let form = reqwest::multipart::Form::new()
            .part("image", Self::file_part(image, "image").await?);

        let resp: DetectResp = self
            .client
            .post(format!("{}/detect", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.detections)
    }
}

#[async_trait]
impl SimilarityOracle for RemoteVision {
    async fn similarity(&self, probe: &Path, reference: &Path) -> f32 {
        match self.post_similarity(probe, reference).await {
            Ok(score) => score.clamp(0.0, 1.0),
            Err(e) => {
                warn!(error = %e, reference = %reference.display(), "similarity probe failed, scoring 0.0");
                0.0
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "remote"
    }
}

#[async_trait]
impl ObjectDetector for RemoteVision {
    async fn detect(&self, image: &Path) -> BTreeMap<String, u32> {
        match self.post_detect(image).await {
            Ok(detections) => detections,
            Err(e) => {
                warn!(error = %e, "object detection failed, returning no labels");
                BTreeMap::new()
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "remote"
    }
}
