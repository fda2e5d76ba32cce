//! identify.rs — Photo identification policy.
//!
//! Pure, single-shot classification: geo-filtered candidates plus oracle
//! similarity scores in, a tagged verdict out. No I/O besides the oracle
//! call, suitable for unit tests and offline evaluation.
//!
//! Policy: best similarity at or above the match threshold confirms the
//! site; otherwise a candidate close enough in plain distance becomes a
//! suggestion without claiming visual confirmation; otherwise not found,
//! with the nearest site offered as auxiliary info.

use serde::Serialize;
use std::path::Path;

use crate::candidates::Candidate;
use crate::geo::round2;
use crate::vision::SimilarityOracle;

/// Decision thresholds, normally sourced from `EngineConfig`.
#[derive(Debug, Clone, Copy)]
pub struct IdentifyThresholds {
    /// Minimum similarity accepted as a confirmed visual match.
    /// Calibrated empirically; false positives below it are expected.
    pub match_score_min: f32,
    /// Maximum distance for a proximity-only suggestion, in km.
    pub suggestion_radius_km: f64,
}

impl Default for IdentifyThresholds {
    fn default() -> Self {
        Self {
            match_score_min: 0.70,
            suggestion_radius_km: 0.20,
        }
    }
}

/// Nearest-site annotation attached to a `not_found` verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestSite {
    pub id: u64,
    pub nombre: String,
    pub distancia_km: f64,
}

/// Tagged identification verdict, serialized with the original wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum IdentifyOutcome {
    Success {
        mensaje: String,
        id: u64,
        nombre: String,
        distancia_km: f64,
        score: f32,
    },
    Suggestion {
        mensaje: String,
        id: u64,
        nombre: String,
        distancia_km: f64,
    },
    NotFound {
        mensaje: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sitio_cercano: Option<NearestSite>,
    },
}

impl IdentifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IdentifyOutcome::Success { .. })
    }
}

/// Classify one probe photo against distance-sorted candidates.
///
/// Candidates without a reference image never match visually; with no
/// reference images at all the outcome can only be suggestion/not_found.
/// Score ties keep the first (nearest) site, since iteration follows the
/// sorted candidate list.
pub async fn identify(
    candidates: &[Candidate<'_>],
    probe: &Path,
    oracle: &dyn SimilarityOracle,
    thresholds: IdentifyThresholds,
) -> IdentifyOutcome {
    if candidates.is_empty() {
        return IdentifyOutcome::NotFound {
            mensaje: "No se encontraron sitios registrados en tu ubicación (10 km).".to_string(),
            sitio_cercano: None,
        };
    }

    let mut best_score = 0.0_f32;
    let mut best: Option<&Candidate<'_>> = None;

    for candidate in candidates {
        let Some(reference) = candidate.site.reference_image.as_deref() else {
            continue;
        };
        let score = oracle.similarity(probe, Path::new(reference)).await;
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    if let Some(matched) = best {
        if best_score >= thresholds.match_score_min {
            return IdentifyOutcome::Success {
                mensaje: format!("¡Sitio identificado! Estás en {}", matched.site.name),
                id: matched.site.id,
                nombre: matched.site.name.clone(),
                distancia_km: round2(matched.distance_km),
                score: round2(best_score as f64) as f32,
            };
        }
    }

    let nearest = &candidates[0];
    if nearest.distance_km <= thresholds.suggestion_radius_km {
        return IdentifyOutcome::Suggestion {
            mensaje: format!("¿Estás en {}?", nearest.site.name),
            id: nearest.site.id,
            nombre: nearest.site.name.clone(),
            distancia_km: round2(nearest.distance_km),
        };
    }

    IdentifyOutcome::NotFound {
        mensaje: "No se pudo identificar el sitio con la foto enviada.".to_string(),
        sitio_cercano: Some(NearestSite {
            id: nearest.site.id,
            nombre: nearest.site.name.clone(),
            distancia_km: round2(nearest.distance_km),
        }),
    }
}
