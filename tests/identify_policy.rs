// tests/identify_policy.rs
//
// End-to-end checks of the photo identification policy: candidate filter
// with the narrow radius, then the decision over mock oracle scores.

use std::path::Path;

use toursight::candidates::candidates_within;
use toursight::catalog::{Category, Site, SiteCatalog};
use toursight::geo::RegionBounds;
use toursight::identify::{identify, IdentifyOutcome, IdentifyThresholds};
use toursight::vision::mock::MockOracle;

const IDENTIFY_RADIUS_KM: f64 = 10.0;

fn cultural_site(reference: Option<&str>) -> Site {
    Site {
        id: 7,
        name: "Centro Histórico".to_string(),
        category: Category::Cultural,
        province: "Guayas".to_string(),
        lat: -2.19,
        lon: -79.89,
        active: true,
        reference_image: reference.map(str::to_string),
        description: None,
    }
}

async fn run(
    catalog: &SiteCatalog,
    query_lat: f64,
    query_lon: f64,
    oracle: &MockOracle,
) -> IdentifyOutcome {
    let (candidates, _) = candidates_within(
        catalog,
        query_lat,
        query_lon,
        IDENTIFY_RADIUS_KM,
        &RegionBounds::ecuador(),
    );
    identify(
        &candidates,
        Path::new("probe.jpg"),
        oracle,
        IdentifyThresholds::default(),
    )
    .await
}

#[tokio::test]
async fn confident_similarity_confirms_the_site() {
    // One cultural site, probe taken ~5 km away, similarity 0.85.
    let catalog = SiteCatalog::new(vec![cultural_site(Some("refs/centro.jpg"))]);
    let oracle = MockOracle::fixed(0.0).with_score("refs/centro.jpg", 0.85);

    let out = run(&catalog, -2.2350, -79.89, &oracle).await;
    match out {
        IdentifyOutcome::Success {
            id,
            score,
            distancia_km,
            mensaje,
            ..
        } => {
            assert_eq!(id, 7);
            assert!((score - 0.85).abs() < 1e-6, "got {score}");
            assert!((distancia_km - 5.0).abs() < 0.1, "got {distancia_km}");
            assert!(mensaje.contains("Centro Histórico"));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn weak_similarity_near_the_site_becomes_a_suggestion() {
    // Same catalog, similarity only 0.40, but the probe is ~0.1 km away.
    let catalog = SiteCatalog::new(vec![cultural_site(Some("refs/centro.jpg"))]);
    let oracle = MockOracle::fixed(0.0).with_score("refs/centro.jpg", 0.40);

    let out = run(&catalog, -2.1909, -79.89, &oracle).await;
    match out {
        IdentifyOutcome::Suggestion { id, nombre, .. } => {
            assert_eq!(id, 7);
            assert_eq!(nombre, "Centro Histórico");
        }
        other => panic!("expected suggestion, got {other:?}"),
    }
}

#[tokio::test]
async fn beyond_the_search_radius_nothing_is_found() {
    // Probe ~15 km away: the candidate list is empty.
    let catalog = SiteCatalog::new(vec![cultural_site(Some("refs/centro.jpg"))]);
    let oracle = MockOracle::fixed(0.99);

    let out = run(&catalog, -2.3250, -79.89, &oracle).await;
    match out {
        IdentifyOutcome::NotFound { sitio_cercano, .. } => {
            assert!(sitio_cercano.is_none());
        }
        other => panic!("expected not_found, got {other:?}"),
    }
}

#[tokio::test]
async fn without_reference_images_success_is_impossible() {
    // Even a maximally confident oracle cannot confirm a site that has no
    // reference photo to compare against.
    let catalog = SiteCatalog::new(vec![cultural_site(None)]);
    let oracle = MockOracle::fixed(0.99);

    let out = run(&catalog, -2.19, -79.89, &oracle).await;
    assert!(
        !out.is_success(),
        "no reference image must never yield success, got {out:?}"
    );
    // At the site itself the fallback is a proximity suggestion.
    assert!(matches!(out, IdentifyOutcome::Suggestion { .. }));
}

#[tokio::test]
async fn weak_similarity_far_from_everything_reports_the_nearest() {
    // Probe ~3 km out: inside the search radius, outside the suggestion one.
    let catalog = SiteCatalog::new(vec![cultural_site(Some("refs/centro.jpg"))]);
    let oracle = MockOracle::fixed(0.0).with_score("refs/centro.jpg", 0.30);

    let out = run(&catalog, -2.2170, -79.89, &oracle).await;
    match out {
        IdentifyOutcome::NotFound { sitio_cercano, .. } => {
            let near = sitio_cercano.expect("nearest site annotation");
            assert_eq!(near.id, 7);
            assert!(near.distancia_km > 0.20);
        }
        other => panic!("expected not_found with nearest info, got {other:?}"),
    }
}
