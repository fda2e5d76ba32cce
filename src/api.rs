use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

use crate::achievements::DynVisitTracker;
use crate::bias::{infer_zone_type, QueryContext, ZoneType};
use crate::candidates::candidates_within;
use crate::catalog::{Category, SiteCatalog};
use crate::config::EngineConfig;
use crate::geo::round2;
use crate::identify::{identify, IdentifyOutcome, IdentifyThresholds};
use crate::recommend::recommend_by_context;
use crate::risk::RiskEngine;
use crate::vision::{DynDetector, DynOracle};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub catalog: Arc<SiteCatalog>,
    pub oracle: DynOracle,
    pub detector: DynDetector,
    pub risk: Arc<RiskEngine>,
    pub visits: DynVisitTracker,
}

pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(state.config.media_dir.clone());

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sitios/cercanos", get(nearby_sites))
        .route("/sitios/recomendar", post(identify_site))
        .route("/reconocer/analizar", post(analyze_image))
        .route("/recomendar/contexto", post(recommend_context))
        .route("/riesgo/calcular", get(risk_zone))
        .nest_service("/media", media)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---- shared helpers ----

fn client_error(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

fn server_error(msg: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": msg })),
    )
        .into_response()
}

fn parse_coords(lat: Option<&str>, lon: Option<&str>) -> Option<(f64, f64)> {
    let lat = lat?.trim().parse::<f64>().ok()?;
    let lon = lon?.trim().parse::<f64>().ok()?;
    Some((lat, lon))
}

/// Short anonymized id for an uploaded probe; raw image bytes never reach
/// the logs.
fn probe_id(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// ---- GET /sitios/cercanos ----

#[derive(Deserialize)]
struct NearbyParams {
    lat: Option<String>,
    lon: Option<String>,
}

#[derive(Serialize)]
struct NearbySite {
    id: u64,
    nombre: String,
    categoria: Category,
    provincia: String,
    distancia_km: f64,
    lat: f64,
    lon: f64,
    imagen_url: String,
}

#[derive(Serialize)]
struct NearbyResp {
    total: usize,
    sitios: Vec<NearbySite>,
}

async fn nearby_sites(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Response {
    let Some((lat, lon)) = parse_coords(params.lat.as_deref(), params.lon.as_deref()) else {
        return client_error("Parámetros lat y lon son requeridos");
    };
    counter!("nearby_requests_total").increment(1);

    let cfg = &state.config;
    let (candidates, stats) =
        candidates_within(&state.catalog, lat, lon, cfg.nearby_radius_km, &cfg.region);
    info!(
        total = candidates.len(),
        skipped_invalid = stats.skipped_invalid,
        "nearby sites query"
    );

    let sitios = candidates
        .iter()
        .take(cfg.nearby_limit)
        .map(|c| NearbySite {
            id: c.site.id,
            nombre: c.site.name.clone(),
            categoria: c.site.category,
            provincia: c.site.province.clone(),
            distancia_km: round2(c.distance_km),
            lat: c.site.lat,
            lon: c.site.lon,
            imagen_url: c
                .site
                .reference_image
                .as_deref()
                .map(|r| format!("/media/{r}"))
                .unwrap_or_default(),
        })
        .collect::<Vec<_>>();

    Json(NearbyResp {
        total: candidates.len(),
        sitios,
    })
    .into_response()
}

// ---- POST /sitios/recomendar (multipart: imagen, lat, lon, usuario?) ----

#[derive(Default)]
struct IdentifyForm {
    image: Option<Vec<u8>>,
    lat: Option<String>,
    lon: Option<String>,
    user: Option<String>,
}

async fn read_identify_form(multipart: &mut Multipart) -> anyhow::Result<IdentifyForm> {
    let mut form = IdentifyForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "imagen" => form.image = Some(field.bytes().await?.to_vec()),
            "lat" => form.lat = Some(field.text().await?),
            "lon" => form.lon = Some(field.text().await?),
            "usuario" => form.user = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

#[derive(Serialize)]
struct IdentifyResponse {
    #[serde(flatten)]
    outcome: IdentifyOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    logro: Option<String>,
}

async fn identify_site(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    counter!("identify_requests_total").increment(1);

    let form = match read_identify_form(&mut multipart).await {
        Ok(f) => f,
        Err(e) => return client_error(&format!("Formulario inválido: {e}")),
    };
    let (Some(image), Some(lat_raw), Some(lon_raw)) =
        (form.image, form.lat.as_deref(), form.lon.as_deref())
    else {
        return client_error("Faltan datos: imagen, lat, lon");
    };
    let Some((lat, lon)) = parse_coords(Some(lat_raw), Some(lon_raw)) else {
        return client_error("Coordenadas inválidas");
    };

    match run_identification(&state, image, lat, lon, form.user.as_deref()).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            error!(error = %e, "identification failed unexpectedly");
            server_error(e.to_string())
        }
    }
}

async fn run_identification(
    state: &AppState,
    image: Vec<u8>,
    lat: f64,
    lon: f64,
    user: Option<&str>,
) -> anyhow::Result<IdentifyResponse> {
    let probe_tag = probe_id(&image);

    // Spool the probe to a temp file for the oracle; removed on drop.
    let probe = tempfile::NamedTempFile::new()?;
    std::fs::write(probe.path(), &image)?;

    let cfg = &state.config;
    let (candidates, stats) =
        candidates_within(&state.catalog, lat, lon, cfg.identify_radius_km, &cfg.region);
    info!(
        probe = %probe_tag,
        candidates = candidates.len(),
        skipped_invalid = stats.skipped_invalid,
        "photo identification"
    );

    let thresholds = IdentifyThresholds {
        match_score_min: cfg.match_score_min,
        suggestion_radius_km: cfg.suggestion_radius_km,
    };
    let outcome = identify(&candidates, probe.path(), state.oracle.as_ref(), thresholds).await;

    // Visit counter + achievement signal, only on a confirmed match.
    let logro = if outcome.is_success() {
        counter!("identify_success_total").increment(1);
        user.and_then(|u| state.visits.record_visit(u))
            .map(str::to_string)
    } else {
        None
    };

    Ok(IdentifyResponse { outcome, logro })
}

// ---- POST /reconocer/analizar (multipart: imagen) ----

#[derive(Serialize)]
struct DetectionResp {
    detecciones: BTreeMap<String, u32>,
    total_emprendimientos: u32,
    tipo_zona: ZoneType,
}

async fn analyze_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    counter!("detect_requests_total").increment(1);

    let mut image: Option<Vec<u8>> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                if name == "imagen" {
                    match field.bytes().await {
                        Ok(bytes) => image = Some(bytes.to_vec()),
                        Err(e) => return client_error(&format!("Formulario inválido: {e}")),
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return client_error(&format!("Formulario inválido: {e}")),
        }
    }
    let Some(image) = image else {
        return client_error("No se envió imagen");
    };

    match run_detection(&state, image).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            error!(error = %e, "image analysis failed unexpectedly");
            server_error(e.to_string())
        }
    }
}

async fn run_detection(state: &AppState, image: Vec<u8>) -> anyhow::Result<DetectionResp> {
    let probe = tempfile::NamedTempFile::new()?;
    std::fs::write(probe.path(), &image)?;

    let detections = state.detector.detect(probe.path()).await;
    let (total, zone) = infer_zone_type(&detections);

    Ok(DetectionResp {
        detecciones: detections,
        total_emprendimientos: total,
        tipo_zona: zone,
    })
}

// ---- POST /recomendar/contexto ----

#[derive(Deserialize)]
struct ContextRequest {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    contexto: Option<QueryContext>,
}

async fn recommend_context(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Response {
    let (Some(lat), Some(lon)) = (req.lat, req.lon) else {
        return client_error("Parámetros lat y lon son requeridos");
    };
    counter!("recommend_requests_total").increment(1);

    let cfg = &state.config;
    let rec = recommend_by_context(
        &state.catalog,
        lat,
        lon,
        req.contexto.as_ref(),
        &cfg.region,
        cfg.bias_factor,
        cfg.max_recommend_km,
    );
    Json(rec).into_response()
}

// ---- GET /riesgo/calcular ----

#[derive(Deserialize)]
struct RiskParams {
    lat: Option<String>,
    lng: Option<String>,
}

fn risk_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "status": "error", "msg": msg }))).into_response()
}

async fn risk_zone(State(state): State<AppState>, Query(params): Query<RiskParams>) -> Response {
    counter!("risk_requests_total").increment(1);

    if !state.risk.available() || params.lat.is_none() || params.lng.is_none() {
        return risk_error(StatusCode::BAD_REQUEST, "Faltan datos o modelo no cargado");
    }
    let Some((lat, lng)) = parse_coords(params.lat.as_deref(), params.lng.as_deref()) else {
        return risk_error(StatusCode::BAD_REQUEST, "Coordenadas inválidas");
    };

    use chrono::Timelike;
    let hour = chrono::Local::now().hour();

    match state.risk.assess(lat, lng, hour) {
        Ok(a) => Json(json!({
            "status": "success",
            "cluster_id": a.cluster_id,
            "nivel_riesgo": a.level,
            "color": a.color.hex(),
            "mensaje": a.message(),
        }))
        .into_response(),
        Err(e) => risk_error(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}
