//! Trip analysis pipeline.
//!
//! One request runs one linear pass: directions lookup, checkpoint sampling,
//! then a sequential enrich-and-score fold that carries the accumulated
//! weather delay forward so later checkpoints are looked up at a later time.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{AppError, UpstreamError};
use crate::services::daylight::SunriseClient;
use crate::services::enrich::{ChargerSearch, Enricher, EnrichmentBundle, EnrichmentSettings};
use crate::services::google::GoogleMapsClient;
use crate::services::polyline::Coordinate;
use crate::services::risk::{assess, RiskAssessment, RiskTier};
use crate::services::sampler::{
    Checkpoint, CheckpointSampler, Route, SamplerConfig, SamplerError,
};
use crate::services::yr::YrClient;

/// Allowed range for a per-request checkpoint interval.
pub const MIN_INTERVAL_KM: f64 = 10.0;
pub const MAX_INTERVAL_KM: f64 = 500.0;

/// Input for one analysis.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TripRequest {
    /// Free-text start place (e.g. "Sandnessjøen")
    pub origin: String,
    /// Free-text destination (e.g. "Trondheim")
    pub destination: String,
    /// Local departure date, "YYYY-MM-DD". Defaults to today.
    pub date: Option<String>,
    /// Local departure time, "HH:MM". Defaults to now.
    pub time: Option<String>,
    /// Override the configured checkpoint interval (10–500 km)
    pub interval_km: Option<f64>,
}

/// HTTP clients for every external lookup.
#[derive(Debug, Clone)]
pub struct TripServices {
    pub google: GoogleMapsClient,
    pub yr: YrClient,
    pub sunrise: SunriseClient,
}

impl TripServices {
    pub fn from_config(config: &AppConfig) -> reqwest::Result<Self> {
        let timeout = std::time::Duration::from_secs(config.http_timeout_secs);
        Ok(Self {
            google: GoogleMapsClient::new(
                &config.google_maps_base_url,
                &config.google_maps_api_key,
                &config.maps_language,
                timeout,
            )?,
            yr: YrClient::new(&config.yr_base_url, &config.yr_user_agent, timeout)?,
            sunrise: SunriseClient::new(&config.sunrise_base_url, timeout)?,
        })
    }
}

/// Defaults applied to every analysis.
#[derive(Debug, Clone)]
pub struct TripSettings {
    pub sampler: SamplerConfig,
    pub enrichment: EnrichmentSettings,
}

impl TripSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sampler: SamplerConfig {
                interval_km: config.checkpoint_interval_km,
                include_destination: config.include_destination_checkpoint,
            },
            enrichment: EnrichmentSettings {
                daylight_lookup: config.enable_daylight_lookup,
                charger_search: config.enable_charger_search.then(|| ChargerSearch {
                    radius_m: config.charger_search_radius_m,
                    keyword: config.charger_search_keyword.clone(),
                }),
                timezone: config.timezone,
            },
        }
    }

    pub fn timezone(&self) -> Tz {
        self.enrichment.timezone
    }
}

/// A checkpoint after enrichment and scoring.
#[derive(Debug, Clone)]
pub struct AnalyzedCheckpoint {
    pub checkpoint: Checkpoint,
    /// Base arrival plus the delay accumulated at earlier checkpoints.
    pub arrival: DateTime<Utc>,
    pub local_arrival: DateTime<Tz>,
    pub accumulated_delay_minutes: i64,
    pub bundle: EnrichmentBundle,
    pub assessment: RiskAssessment,
}

impl AnalyzedCheckpoint {
    pub fn place(&self) -> &str {
        self.bundle.locality.as_deref().unwrap_or("unknown")
    }

    /// Map popup text, e.g. `Mosjøen: 8/10 🔴`
    pub fn popup(&self) -> String {
        format!("{}: {}", self.place(), self.assessment.status_text())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MapMarker {
    pub coordinate: Coordinate,
    /// Marker colour: "green", "orange" or "red"
    pub color: String,
    pub popup: String,
}

/// Data needed to draw the route and its checkpoints on a map.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MapView {
    pub center: Coordinate,
    /// Route path, Google encoded polyline (precision 5)
    pub encoded_polyline: String,
    pub markers: Vec<MapMarker>,
}

/// Result of one analysis. Lives only as long as the request.
#[derive(Debug, Clone)]
pub struct TripAnalysis {
    pub analysis_id: Uuid,
    pub route: Route,
    pub departure: DateTime<Utc>,
    pub timezone: Tz,
    pub interval_km: f64,
    pub checkpoints: Vec<AnalyzedCheckpoint>,
    pub warnings: Vec<String>,
}

impl TripAnalysis {
    /// e.g. `Route: 412 km | Time: 5 t 55 min`
    pub fn summary(&self) -> String {
        format!(
            "Route: {} | Time: {}",
            self.route.distance_text, self.route.duration_text
        )
    }

    /// The highest-scoring checkpoint (the first one on ties).
    pub fn worst_checkpoint(&self) -> Option<&AnalyzedCheckpoint> {
        self.checkpoints
            .iter()
            .rev()
            .max_by_key(|c| c.assessment.score)
    }

    pub fn overall_tier(&self) -> RiskTier {
        self.worst_checkpoint()
            .map(|c| c.assessment.tier)
            .unwrap_or(RiskTier::Low)
    }

    pub fn total_delay_minutes(&self) -> i64 {
        self.checkpoints
            .iter()
            .map(|c| c.assessment.delay_minutes)
            .sum()
    }

    /// One-line verdict for the whole trip.
    pub fn banner(&self) -> String {
        let Some(worst) = self.worst_checkpoint() else {
            return "No checkpoints analysed".to_string();
        };
        match worst.assessment.tier {
            RiskTier::High => format!(
                "{} High risk near {} (KM {:.0}): {}. Expect about {} min extra.",
                RiskTier::High.status_symbol(),
                worst.place(),
                worst.checkpoint.distance_km,
                worst.assessment.reason_labels(),
                self.total_delay_minutes()
            ),
            RiskTier::Moderate => format!(
                "{} Moderate risk near {} (KM {:.0}): {}. Drive carefully.",
                RiskTier::Moderate.status_symbol(),
                worst.place(),
                worst.checkpoint.distance_km,
                worst.assessment.reason_labels()
            ),
            RiskTier::Low => format!(
                "{} Good driving conditions along the route.",
                RiskTier::Low.status_symbol()
            ),
        }
    }

    pub fn map_view(&self) -> MapView {
        let center = self
            .route
            .path
            .first()
            .copied()
            .unwrap_or_else(|| Coordinate::new(0.0, 0.0));

        MapView {
            center,
            encoded_polyline: self.route.encoded_polyline.clone(),
            markers: self
                .checkpoints
                .iter()
                .map(|c| MapMarker {
                    coordinate: c.checkpoint.coordinate,
                    color: c.assessment.tier.marker_color().to_string(),
                    popup: c.popup(),
                })
                .collect(),
        }
    }
}

/// Resolve the local departure date and time into a UTC instant.
///
/// A missing date means today; a date that does not parse is rejected. A
/// missing time means the current clock time; a time that does not parse
/// falls back to it as well and returns a warning.
pub fn resolve_departure(
    date: Option<&str>,
    time: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Option<String>), AppError> {
    let local_now = now.with_timezone(&tz);

    let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        })?,
        None => local_now.date_naive(),
    };

    let mut warning = None;
    let clock = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) => match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(t) => t,
            Err(_) => {
                warning = Some(format!(
                    "Could not read time '{}' (expected HH:MM); using current time",
                    raw
                ));
                local_now.time()
            }
        },
        None => local_now.time(),
    };

    let naive = date.and_time(clock);
    // A clock time inside a spring-forward gap resolves to the instant after it
    let departure = tz
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Departure {} {} does not exist in {}",
                date,
                clock.format("%H:%M"),
                tz
            ))
        })?;

    Ok((departure.with_timezone(&Utc), warning))
}

fn validate_request(request: &TripRequest) -> Result<(), AppError> {
    if request.origin.trim().is_empty() {
        return Err(AppError::BadRequest("origin must not be empty".to_string()));
    }
    if request.destination.trim().is_empty() {
        return Err(AppError::BadRequest(
            "destination must not be empty".to_string(),
        ));
    }
    if let Some(interval) = request.interval_km {
        // NaN fails both comparisons, so check finiteness first
        if !interval.is_finite() || !(MIN_INTERVAL_KM..=MAX_INTERVAL_KM).contains(&interval) {
            return Err(AppError::BadRequest(format!(
                "interval_km must be between {} and {}",
                MIN_INTERVAL_KM, MAX_INTERVAL_KM
            )));
        }
    }
    Ok(())
}

fn sampler_error(err: SamplerError) -> AppError {
    match err {
        SamplerError::TooFewPoints(_) | SamplerError::NonPositiveDistance(_) => {
            AppError::RouteNotFound(format!("route has no usable geometry ({})", err))
        }
        SamplerError::InvalidInterval(_) => AppError::BadRequest(err.to_string()),
    }
}

fn directions_error(err: UpstreamError) -> AppError {
    match err {
        UpstreamError::ApiStatus(status) => AppError::RouteNotFound(status),
        UpstreamError::Empty => AppError::RouteNotFound("ZERO_RESULTS".to_string()),
        other => AppError::ExternalServiceError(format!("Directions lookup failed: {}", other)),
    }
}

/// Run a full analysis for one request.
///
/// A failed directions lookup aborts the run. Every other lookup failure is
/// absorbed into the affected checkpoint.
pub async fn analyze_trip(
    services: &TripServices,
    settings: &TripSettings,
    request: &TripRequest,
) -> Result<TripAnalysis, AppError> {
    validate_request(request)?;

    let analysis_id = Uuid::new_v4();
    let tz = settings.timezone();
    let mut warnings = Vec::new();

    let (departure, time_warning) = resolve_departure(
        request.date.as_deref(),
        request.time.as_deref(),
        tz,
        Utc::now(),
    )?;
    warnings.extend(time_warning);

    let origin = request.origin.trim();
    let destination = request.destination.trim();
    tracing::info!(
        "Analysis {}: {} -> {} departing {}",
        analysis_id,
        origin,
        destination,
        departure.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
    );

    let route = services
        .google
        .directions(origin, destination, departure)
        .await
        .map_err(|e| {
            tracing::warn!("Analysis {}: directions lookup failed: {}", analysis_id, e);
            directions_error(e)
        })?;

    let sampler_config = SamplerConfig {
        interval_km: request.interval_km.unwrap_or(settings.sampler.interval_km),
        ..settings.sampler
    };

    let sampler = CheckpointSampler::new(&route, departure, sampler_config).map_err(|e| {
        tracing::warn!("Analysis {}: unusable route: {}", analysis_id, e);
        sampler_error(e)
    })?;

    let enricher = Enricher::new(
        &services.google,
        &services.yr,
        &services.sunrise,
        &settings.enrichment,
    );

    let mut checkpoints = Vec::new();
    let mut delay_minutes_total: i64 = 0;
    let mut weather_gaps = 0;

    for checkpoint in sampler {
        let arrival = checkpoint.estimated_arrival + Duration::minutes(delay_minutes_total);
        let bundle = enricher.enrich(checkpoint.coordinate, arrival).await;
        let local_arrival = arrival.with_timezone(&tz);
        let assessment = assess(&bundle, local_arrival.time());

        tracing::debug!(
            "Analysis {}: KM {:.0} score {} ({})",
            analysis_id,
            checkpoint.distance_km,
            assessment.score,
            assessment.reason_labels()
        );

        if bundle.temperature_c.is_none() {
            weather_gaps += 1;
        }

        let accumulated_delay_minutes = delay_minutes_total;
        delay_minutes_total += assessment.delay_minutes;

        checkpoints.push(AnalyzedCheckpoint {
            checkpoint,
            arrival,
            local_arrival,
            accumulated_delay_minutes,
            bundle,
            assessment,
        });
    }

    if weather_gaps > 0 {
        warnings.push(format!(
            "Weather data unavailable for {} of {} checkpoints",
            weather_gaps,
            checkpoints.len()
        ));
    }

    tracing::info!(
        "Analysis {}: {} checkpoints, {} min expected delay",
        analysis_id,
        checkpoints.len(),
        delay_minutes_total
    );

    Ok(TripAnalysis {
        analysis_id,
        route,
        departure,
        timezone: tz,
        interval_km: sampler_config.interval_km,
        checkpoints,
        warnings,
    })
}
