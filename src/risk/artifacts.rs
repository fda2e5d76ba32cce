//! risk/artifacts.rs — Loaders for the persisted model artifacts.
//!
//! The training pipeline exports the fitted cluster centroids and the
//! normalized per-cluster risk as JSON. Cluster ids are the centroid
//! indexes; the risk table arrives string-keyed, as JSON objects do.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::ClusterModel;

#[derive(Deserialize)]
struct CentroidsFile {
    /// `[[lat, lng], ...]`, index = cluster id.
    centroids: Vec<[f64; 2]>,
}

/// Load the pre-fitted centroids. An empty centroid list is an error: a
/// model that can never predict is indistinguishable from a missing one.
pub fn load_centroids<P: AsRef<Path>>(path: P) -> Result<ClusterModel> {
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading cluster centroids from {}", path.as_ref().display()))?;
    let file: CentroidsFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing cluster centroids from {}", path.as_ref().display()))?;
    anyhow::ensure!(
        !file.centroids.is_empty(),
        "centroid artifact {} holds no clusters",
        path.as_ref().display()
    );
    Ok(ClusterModel::new(file.centroids))
}

/// Load the cluster id → base risk table (0–10 scale).
pub fn load_risk_table<P: AsRef<Path>>(path: P) -> Result<HashMap<String, f64>> {
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading risk table from {}", path.as_ref().display()))?;
    let table: HashMap<String, f64> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing risk table from {}", path.as_ref().display()))?;
    Ok(table)
}
