//! candidates.rs — Geo-fencing: bound the catalog to sites within a radius
//! of the query point, nearest first.
//!
//! Sites with invalid or out-of-region coordinates are skipped silently and
//! reported through a side-channel counter, never as per-item errors.

use crate::catalog::{Site, SiteCatalog};
use crate::geo::{haversine_km, RegionBounds};
use tracing::warn;

/// A catalog site within the active search radius, paired with its true
/// distance in km. Request-scoped, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub site: &'a Site,
    pub distance_km: f64,
}

/// Diagnostics for one filter pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub checked: u32,
    pub skipped_invalid: u32,
}

/// Active sites within `radius_km` of the query point, sorted ascending by
/// distance. Tolerates an empty catalog.
pub fn candidates_within<'a>(
    catalog: &'a SiteCatalog,
    lat: f64,
    lon: f64,
    radius_km: f64,
    bounds: &RegionBounds,
) -> (Vec<Candidate<'a>>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut out = Vec::new();

    for site in catalog.active_sites() {
        stats.checked += 1;

        if !bounds.contains(site.lat, site.lon) {
            stats.skipped_invalid += 1;
            warn!(
                site_id = site.id,
                lat = site.lat,
                lon = site.lon,
                "site coordinates outside configured region, skipped"
            );
            continue;
        }

        let distance_km = haversine_km(lat, lon, site.lat, site.lon);
        if !distance_km.is_finite() {
            stats.skipped_invalid += 1;
            warn!(site_id = site.id, "distance not computable, skipped");
            continue;
        }

        if distance_km <= radius_km {
            out.push(Candidate { site, distance_km });
        }
    }

    out.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;

    fn site(id: u64, lat: f64, lon: f64, active: bool) -> Site {
        Site {
            id,
            name: format!("site-{id}"),
            category: Category::Otro,
            province: "Guayas".into(),
            lat,
            lon,
            active,
            reference_image: None,
            description: None,
        }
    }

    #[test]
    fn sorted_ascending_and_radius_bounded() {
        // Query at Guayaquil; sites at ~0, ~5 and ~300 km.
        let catalog = SiteCatalog::new(vec![
            site(1, -2.2300, -79.8800, true), // a few km south
            site(2, -2.1894, -79.8891, true), // at the query point
            site(3, -0.1807, -78.4678, true), // Quito, ~270 km
        ]);
        let (cands, stats) =
            candidates_within(&catalog, -2.1894, -79.8891, 50.0, &RegionBounds::ecuador());

        assert_eq!(stats.checked, 3);
        assert_eq!(stats.skipped_invalid, 0);
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].site.id, 2);
        assert_eq!(cands[1].site.id, 1);
        assert!(cands[0].distance_km <= cands[1].distance_km);
    }

    #[test]
    fn narrow_results_are_subset_of_wide() {
        let catalog = SiteCatalog::new(vec![
            site(1, -2.20, -79.89, true),
            site(2, -2.30, -79.95, true),
            site(3, -2.60, -80.10, true),
        ]);
        let bounds = RegionBounds::ecuador();
        let (narrow, _) = candidates_within(&catalog, -2.19, -79.89, 10.0, &bounds);
        let (wide, _) = candidates_within(&catalog, -2.19, -79.89, 50.0, &bounds);

        for c in &narrow {
            assert!(wide.iter().any(|w| w.site.id == c.site.id));
        }
        assert!(narrow.len() <= wide.len());
    }

    #[test]
    fn inactive_and_out_of_region_sites_are_excluded() {
        let catalog = SiteCatalog::new(vec![
            site(1, -2.20, -79.89, false),  // inactive
            site(2, 40.4168, -3.7038, true), // Madrid, out of region
            site(3, -2.20, -79.89, true),
        ]);
        let (cands, stats) =
            candidates_within(&catalog, -2.19, -79.89, 50.0, &RegionBounds::ecuador());

        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].site.id, 3);
        // the inactive site never reaches the filter, the foreign one is counted
        assert_eq!(stats.checked, 2);
        assert_eq!(stats.skipped_invalid, 1);
    }

    #[test]
    fn empty_catalog_yields_empty_list() {
        let catalog = SiteCatalog::default();
        let (cands, stats) =
            candidates_within(&catalog, -2.19, -79.89, 50.0, &RegionBounds::ecuador());
        assert!(cands.is_empty());
        assert_eq!(stats.checked, 0);
    }
}
