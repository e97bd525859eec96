//! Trip analysis HTTP endpoints.
//!
//! - POST /api/v1/trips/analyze      → JSON table + map
//! - POST /api/v1/trips/analyze/csv  → CSV attachment
//! - POST /api/v1/trips/analyze/gpx  → GPX attachment

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::services::enrich::EnrichmentBundle;
use crate::services::gpx::write_gpx;
use crate::services::polyline::Coordinate;
use crate::services::risk::{RiskAssessment, RiskTier};
use crate::services::table::{table_rows, write_csv, TableRow};
use crate::services::trip::{
    analyze_trip, AnalyzedCheckpoint, MapView, TripAnalysis, TripRequest, TripServices,
    TripSettings,
};

/// Shared application state for trip endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) services: Arc<TripServices>,
    pub(crate) settings: Arc<TripSettings>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One analysed checkpoint with raw values.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckpointResult {
    /// Distance marker in km from the start
    pub distance_km: f64,
    pub coordinate: Coordinate,
    /// True for the extra checkpoint at the destination
    pub is_destination: bool,
    /// Estimated passage time including accumulated delay
    pub arrival: DateTime<Utc>,
    /// Local passage time, HH:MM
    pub local_time: String,
    /// Delay carried in from earlier checkpoints, in minutes
    pub accumulated_delay_minutes: i64,
    pub conditions: EnrichmentBundle,
    /// Wind-chill adjusted temperature in Celsius
    pub feels_like_c: Option<f64>,
    pub risk: RiskAssessment,
}

impl From<&AnalyzedCheckpoint> for CheckpointResult {
    fn from(cp: &AnalyzedCheckpoint) -> Self {
        Self {
            distance_km: cp.checkpoint.distance_km,
            coordinate: cp.checkpoint.coordinate,
            is_destination: cp.checkpoint.is_destination,
            arrival: cp.arrival,
            local_time: cp.local_arrival.format("%H:%M").to_string(),
            accumulated_delay_minutes: cp.accumulated_delay_minutes,
            conditions: cp.bundle.clone(),
            feels_like_c: cp.bundle.feels_like_c(),
            risk: cp.assessment.clone(),
        }
    }
}

/// Response for POST /api/v1/trips/analyze.
#[derive(Debug, Serialize, ToSchema)]
pub struct TripAnalysisResponse {
    pub analysis_id: Uuid,
    /// Start address as resolved by the directions service
    pub origin: String,
    /// End address as resolved by the directions service
    pub destination: String,
    pub departure: DateTime<Utc>,
    /// IANA zone used for local times (e.g. "Europe/Oslo")
    pub timezone: String,
    /// e.g. "Route: 412 km | Time: 5 t 55 min"
    pub summary: String,
    /// Highest tier along the route
    pub overall_risk: RiskTier,
    pub banner: String,
    /// Sum of per-checkpoint delays, in minutes
    pub total_delay_minutes: i64,
    pub interval_km: f64,
    /// Non-fatal problems (unreadable time, missing weather, ...)
    pub warnings: Vec<String>,
    pub map: MapView,
    /// Display rows, one per checkpoint
    pub table: Vec<TableRow>,
    pub checkpoints: Vec<CheckpointResult>,
}

impl From<TripAnalysis> for TripAnalysisResponse {
    fn from(analysis: TripAnalysis) -> Self {
        Self {
            analysis_id: analysis.analysis_id,
            summary: analysis.summary(),
            overall_risk: analysis.overall_tier(),
            banner: analysis.banner(),
            total_delay_minutes: analysis.total_delay_minutes(),
            map: analysis.map_view(),
            table: table_rows(&analysis),
            checkpoints: analysis.checkpoints.iter().map(CheckpointResult::from).collect(),
            origin: analysis.route.start_address,
            destination: analysis.route.end_address,
            departure: analysis.departure,
            timezone: analysis.timezone.name().to_string(),
            interval_km: analysis.interval_km,
            warnings: analysis.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Analyse road risk along a route.
///
/// Samples checkpoints at a fixed interval, looks up the weather at each
/// checkpoint's estimated passage time and scores the driving risk.
#[utoipa::path(
    post,
    path = "/api/v1/trips/analyze",
    tag = "Trips",
    request_body = TripRequest,
    responses(
        (status = 200, description = "Checkpoint table and map data", body = TripAnalysisResponse),
        (status = 400, description = "Invalid request (empty place, bad date, interval out of range)", body = ErrorResponse),
        (status = 422, description = "Directions service found no route", body = ErrorResponse),
        (status = 502, description = "Directions service unreachable", body = ErrorResponse),
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> Result<Json<TripAnalysisResponse>, AppError> {
    let analysis = analyze_trip(&state.services, &state.settings, &request).await?;
    Ok(Json(analysis.into()))
}

/// Analyse a route and download the checkpoint table as CSV.
#[utoipa::path(
    post,
    path = "/api/v1/trips/analyze/csv",
    tag = "Trips",
    request_body = TripRequest,
    responses(
        (status = 200, description = "Checkpoint table", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Directions service found no route", body = ErrorResponse),
        (status = 502, description = "Directions service unreachable", body = ErrorResponse),
    )
)]
pub async fn analyze_csv(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = analyze_trip(&state.services, &state.settings, &request).await?;
    let body = write_csv(&table_rows(&analysis))?;
    Ok(attachment(
        "text/csv; charset=utf-8",
        &format!("trip-{}.csv", analysis.analysis_id),
        body,
    ))
}

/// Analyse a route and download checkpoints and track as GPX.
#[utoipa::path(
    post,
    path = "/api/v1/trips/analyze/gpx",
    tag = "Trips",
    request_body = TripRequest,
    responses(
        (status = 200, description = "GPX 1.1 document", content_type = "application/gpx+xml", body = String),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Directions service found no route", body = ErrorResponse),
        (status = 502, description = "Directions service unreachable", body = ErrorResponse),
    )
)]
pub async fn analyze_gpx(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = analyze_trip(&state.services, &state.settings, &request).await?;
    let body = write_gpx(&analysis)?;
    Ok(attachment(
        "application/gpx+xml",
        &format!("trip-{}.gpx", analysis.analysis_id),
        body,
    ))
}

fn attachment(content_type: &str, filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}
