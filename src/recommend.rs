//! recommend.rs — Contextual recommendation without a photo match.
//!
//! Scans every usable site in the catalog (no hard radius cutoff), ranks by
//! category-biased distance, and reports the winner with its true distance.
//! A winner farther than the configured cap is returned as an annotation,
//! not claimed as a recommendation.

use serde::Serialize;
use tracing::{info, warn};

use crate::bias::{effective_distance, preferred_category, QueryContext, ZoneType};
use crate::catalog::{Category, Site, SiteCatalog};
use crate::geo::{haversine_km, round2, RegionBounds};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recommendation {
    /// Nothing in the catalog has a usable location.
    NoValidSites { mensaje: String },
    /// Best candidate is beyond the cap; annotated, not recommended.
    OutOfRange {
        mensaje: String,
        id: u64,
        nombre: String,
        categoria: Category,
        provincia: String,
        lat: f64,
        lon: f64,
        distancia_km: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        tipo_zona_detectada: Option<ZoneType>,
    },
    Match {
        id: u64,
        nombre: String,
        categoria: Category,
        provincia: String,
        lat: f64,
        lon: f64,
        distancia_km: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        tipo_zona_detectada: Option<ZoneType>,
    },
}

/// Pick the site with the minimum *effective* (category-biased) distance,
/// tracking the true distance separately. The reported distance is always
/// the true one.
pub fn recommend_by_context(
    catalog: &SiteCatalog,
    lat: f64,
    lon: f64,
    context: Option<&QueryContext>,
    bounds: &RegionBounds,
    bias_factor: f64,
    max_distance_km: f64,
) -> Recommendation {
    let preferred = context.and_then(|c| preferred_category(&c.detections));
    let zone = context.and_then(|c| c.zone_type);

    let mut best: Option<(&Site, f64)> = None; // (site, true distance)
    let mut best_effective = f64::INFINITY;
    let mut checked = 0u32;
    let mut skipped_invalid = 0u32;

    for site in catalog.active_sites() {
        checked += 1;
        if !bounds.contains(site.lat, site.lon) {
            skipped_invalid += 1;
            warn!(
                site_id = site.id,
                lat = site.lat,
                lon = site.lon,
                "site coordinates unusable for recommendation, skipped"
            );
            continue;
        }

        let true_km = haversine_km(lat, lon, site.lat, site.lon);
        if !true_km.is_finite() {
            skipped_invalid += 1;
            warn!(site_id = site.id, "distance not computable, skipped");
            continue;
        }

        let effective = effective_distance(true_km, site.category, preferred, bias_factor);
        if effective < best_effective {
            best_effective = effective;
            best = Some((site, true_km));
        }
    }

    info!(
        checked,
        skipped_invalid,
        preferred_category = preferred.map(|c| c.tag()),
        "contextual recommendation scan"
    );

    let Some((site, true_km)) = best else {
        return Recommendation::NoValidSites {
            mensaje: "No hay sitios turísticos con ubicación válida".to_string(),
        };
    };

    if true_km > max_distance_km {
        return Recommendation::OutOfRange {
            mensaje: format!(
                "No se encontraron sitios turísticos dentro de {max_distance_km} km. \
                 Sitio más cercano a {} km.",
                round2(true_km)
            ),
            id: site.id,
            nombre: site.name.clone(),
            categoria: site.category,
            provincia: site.province.clone(),
            lat: site.lat,
            lon: site.lon,
            distancia_km: round2(true_km),
            tipo_zona_detectada: zone,
        };
    }

    Recommendation::Match {
        id: site.id,
        nombre: site.name.clone(),
        categoria: site.category,
        provincia: site.province.clone(),
        lat: site.lat,
        lon: site.lon,
        distancia_km: round2(true_km),
        tipo_zona_detectada: zone,
    }
}
