//! risk — Coordinate → risk-tier scoring.
//!
//! Rides on two artifacts produced by the offline training pipeline: the
//! pre-fitted spatial cluster centroids and the per-cluster historical risk
//! table. Both load once at startup; a load failure leaves the scorer
//! permanently degraded, answering every request with an explicit error
//! instead of crashing the service.

pub mod artifacts;

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

use crate::geo::round2;

/// Nighttime multiplier applied when the local hour is outside [6, 19].
pub const NIGHT_MULTIPLIER: f64 = 1.2;
/// Upper bound of the risk scale.
pub const RISK_CAP: f64 = 10.0;

/// Pre-fitted k-means centroids over raw (lat, lon).
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    centroids: Vec<[f64; 2]>,
}

impl ClusterModel {
    pub fn new(centroids: Vec<[f64; 2]>) -> Self {
        Self { centroids }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Cluster id of the nearest centroid by squared Euclidean distance,
    /// matching what the training library's `predict` does.
    pub fn predict(&self, lat: f64, lng: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (id, c) in self.centroids.iter().enumerate() {
            let d = (lat - c[0]).powi(2) + (lng - c[1]).powi(2);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((id, d)),
            }
        }
        best.map(|(id, _)| id)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RiskError {
    /// Artifacts failed to load at startup; every request gets this.
    #[error("Faltan datos o modelo no cargado")]
    ModelUnavailable,
    #[error("Coordenadas inválidas: {0}")]
    InvalidCoordinate(String),
}

/// Three-tier color code over the final risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskColor {
    Green,
    Yellow,
    Red,
}

impl RiskColor {
    /// Strict `>` transitions: green ≤ 3 < yellow ≤ 7 < red.
    pub fn from_level(level: f64) -> Self {
        if level > 7.0 {
            RiskColor::Red
        } else if level > 3.0 {
            RiskColor::Yellow
        } else {
            RiskColor::Green
        }
    }

    /// Hex color used by the map frontend.
    pub fn hex(&self) -> &'static str {
        match self {
            RiskColor::Green => "#28a745",
            RiskColor::Yellow => "#ffc107",
            RiskColor::Red => "#dc3545",
        }
    }
}

/// One request's risk verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub cluster_id: usize,
    /// Final risk, clamped to [0, 10].
    pub level: f64,
    pub color: RiskColor,
    pub night_adjusted: bool,
}

impl RiskAssessment {
    pub fn message(&self) -> String {
        let mut msg = String::from("Nivel de riesgo basado en histórico delictivo.");
        if self.night_adjusted {
            msg.push_str(" (Aumentado por horario nocturno).");
        }
        msg
    }
}

/// Risk scorer over the loaded artifacts. Read-only after construction.
#[derive(Debug, Default)]
pub struct RiskEngine {
    inner: Option<(ClusterModel, HashMap<String, f64>)>,
}

impl RiskEngine {
    pub fn new(model: ClusterModel, table: HashMap<String, f64>) -> Self {
        Self {
            inner: Some((model, table)),
        }
    }

    /// Permanently degraded engine; `assess` always answers `ModelUnavailable`.
    pub fn degraded() -> Self {
        Self { inner: None }
    }

    /// Load both artifacts, degrading (with an error log) on any failure.
    pub fn load(centroids_path: &str, table_path: &str) -> Self {
        let model = match artifacts::load_centroids(centroids_path) {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, path = centroids_path, "cluster model failed to load, risk scoring degraded");
                return Self::degraded();
            }
        };
        let table = match artifacts::load_risk_table(table_path) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, path = table_path, "risk table failed to load, risk scoring degraded");
                return Self::degraded();
            }
        };
        Self::new(model, table)
    }

    pub fn available(&self) -> bool {
        self.inner.is_some()
    }

    /// Score a coordinate at the given local hour.
    ///
    /// The cluster's base risk (default 0 for clusters absent from the
    /// table — the JSON keys load as strings) gets the nighttime multiplier
    /// when the hour is outside [6, 19], then clamps to the scale.
    pub fn assess(&self, lat: f64, lng: f64, local_hour: u32) -> Result<RiskAssessment, RiskError> {
        let (model, table) = self.inner.as_ref().ok_or(RiskError::ModelUnavailable)?;

        if !lat.is_finite() || !lng.is_finite() {
            return Err(RiskError::InvalidCoordinate(format!("{lat}/{lng}")));
        }

        let cluster_id = model.predict(lat, lng).ok_or(RiskError::ModelUnavailable)?;
        let base = table.get(&cluster_id.to_string()).copied().unwrap_or(0.0);

        let night_adjusted = local_hour < 6 || local_hour > 19;
        let mut level = base;
        if night_adjusted {
            level *= NIGHT_MULTIPLIER;
        }
        let level = round2(level.clamp(0.0, RISK_CAP));

        Ok(RiskAssessment {
            cluster_id,
            level,
            color: RiskColor::from_level(level),
            night_adjusted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskEngine {
        // Two zones: Guayaquil-ish and Quito-ish.
        let model = ClusterModel::new(vec![[-2.19, -79.89], [-0.18, -78.47]]);
        let mut table = HashMap::new();
        table.insert("0".to_string(), 6.0);
        table.insert("1".to_string(), 2.5);
        RiskEngine::new(model, table)
    }

    #[test]
    fn predicts_nearest_centroid() {
        let model = ClusterModel::new(vec![[-2.19, -79.89], [-0.18, -78.47]]);
        assert_eq!(model.predict(-2.20, -79.90), Some(0));
        assert_eq!(model.predict(-0.20, -78.50), Some(1));
        assert_eq!(ClusterModel::new(vec![]).predict(0.0, 0.0), None);
    }

    #[test]
    fn night_raises_risk_and_red_above_seven() {
        // Base 6.0 at hour 22 -> 7.2, red.
        let a = engine().assess(-2.19, -79.89, 22).unwrap();
        assert_eq!(a.cluster_id, 0);
        assert!((a.level - 7.2).abs() < 1e-9, "got {}", a.level);
        assert_eq!(a.color, RiskColor::Red);
        assert!(a.night_adjusted);
        assert!(a.message().contains("nocturno"));
    }

    #[test]
    fn daytime_keeps_the_base_level() {
        let a = engine().assess(-2.19, -79.89, 12).unwrap();
        assert_eq!(a.level, 6.0);
        assert_eq!(a.color, RiskColor::Yellow);
        assert!(!a.night_adjusted);
    }

    #[test]
    fn night_never_lowers_risk_and_cap_holds() {
        let e = engine();
        for base_cluster in [0usize, 1] {
            let (lat, lng) = if base_cluster == 0 {
                (-2.19, -79.89)
            } else {
                (-0.18, -78.47)
            };
            let day = e.assess(lat, lng, 12).unwrap();
            let night = e.assess(lat, lng, 2).unwrap();
            assert!(night.level >= day.level);
            assert!(night.level <= RISK_CAP);
        }

        // 9.5 * 1.2 clamps at 10.
        let model = ClusterModel::new(vec![[0.0, -79.0]]);
        let mut table = HashMap::new();
        table.insert("0".to_string(), 9.5);
        let a = RiskEngine::new(model, table).assess(0.0, -79.0, 23).unwrap();
        assert_eq!(a.level, RISK_CAP);
    }

    #[test]
    fn unknown_cluster_defaults_to_zero_risk() {
        let model = ClusterModel::new(vec![[0.0, -79.0]]);
        let a = RiskEngine::new(model, HashMap::new())
            .assess(0.0, -79.0, 12)
            .unwrap();
        assert_eq!(a.level, 0.0);
        assert_eq!(a.color, RiskColor::Green);
    }

    #[test]
    fn color_boundaries_are_strict() {
        assert_eq!(RiskColor::from_level(3.0), RiskColor::Green);
        assert_eq!(RiskColor::from_level(3.01), RiskColor::Yellow);
        assert_eq!(RiskColor::from_level(7.0), RiskColor::Yellow);
        assert_eq!(RiskColor::from_level(7.01), RiskColor::Red);
    }

    #[test]
    fn degraded_engine_answers_with_explicit_error() {
        let e = RiskEngine::degraded();
        assert!(!e.available());
        assert_eq!(e.assess(-2.19, -79.89, 12), Err(RiskError::ModelUnavailable));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let err = engine().assess(f64::NAN, -79.89, 12).unwrap_err();
        assert!(matches!(err, RiskError::InvalidCoordinate(_)));
    }
}
