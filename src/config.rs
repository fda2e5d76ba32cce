// src/config.rs
//! Engine configuration: thresholds, radii, region bounds, artifact paths.
//!
//! TOML file with an env override for the path; a missing file falls back
//! to built-in defaults so the service always boots. Values are sanitized
//! on load rather than trusted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::geo::RegionBounds;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_CONFIG_PATH: &str = "TOURSIGHT_CONFIG_PATH";
pub const ENV_BIND_ADDR: &str = "TOURSIGHT_BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wide radius for nearby-sites listings, km.
    pub nearby_radius_km: f64,
    /// Narrow radius for photo-identification candidates, km.
    pub identify_radius_km: f64,
    /// Minimum similarity for a confirmed visual match.
    pub match_score_min: f32,
    /// Maximum distance for a proximity-only suggestion, km.
    pub suggestion_radius_km: f64,
    /// Effective-distance multiplier for category-matching candidates.
    pub bias_factor: f64,
    /// Cap beyond which a contextual recommendation is only annotated.
    pub max_recommend_km: f64,
    /// Nearby listing size.
    pub nearby_limit: usize,
    pub region: RegionBounds,
    pub catalog_path: String,
    pub centroids_path: String,
    pub risk_table_path: String,
    /// Directory served under /media (reference images live here).
    pub media_dir: String,
    pub vision: VisionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub similarity_url: Option<String>,
    pub detector_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            similarity_url: None,
            detector_url: None,
            timeout_secs: 10,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nearby_radius_km: 50.0,
            identify_radius_km: 10.0,
            match_score_min: 0.70,
            suggestion_radius_km: 0.20,
            bias_factor: 0.6,
            max_recommend_km: 50.0,
            nearby_limit: 5,
            region: RegionBounds::ecuador(),
            catalog_path: "data/sitios.json".to_string(),
            centroids_path: "artifacts/zonas_centroides.json".to_string(),
            risk_table_path: "artifacts/datos_riesgo.json".to_string(),
            media_dir: "media".to_string(),
            vision: VisionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Resolve the config path ($TOURSIGHT_CONFIG_PATH, then the default
    /// location) and load it; missing file means defaults.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            return Self::default().sanitize();
        }
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "engine config unreadable, using defaults");
                Self::default().sanitize()
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading engine config from {}", path.as_ref().display()))?;
        let cfg: EngineConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing engine config from {}", path.as_ref().display()))?;
        Ok(cfg.sanitize())
    }

    fn sanitize(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.match_score_min) {
            self.match_score_min = Self::default().match_score_min;
        }
        if !(0.0..=1.0).contains(&self.bias_factor) {
            self.bias_factor = Self::default().bias_factor;
        }
        for radius in [
            &mut self.nearby_radius_km,
            &mut self.identify_radius_km,
            &mut self.suggestion_radius_km,
            &mut self.max_recommend_km,
        ] {
            if !radius.is_finite() || *radius < 0.0 {
                *radius = 0.0;
            }
        }
        if self.region.lat_min > self.region.lat_max {
            std::mem::swap(&mut self.region.lat_min, &mut self.region.lat_max);
        }
        if self.region.lon_min > self.region.lon_max {
            std::mem::swap(&mut self.region.lon_min, &mut self.region.lon_max);
        }
        self
    }
}
