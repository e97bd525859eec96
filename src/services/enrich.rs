//! Per-checkpoint enrichment: weather at passage time plus the surrounding
//! context (elevation, place name, daylight, chargers).
//!
//! Every lookup is independent. A failed lookup leaves its field empty and is
//! logged; it never aborts the analysis.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::daylight::SunriseClient;
use crate::services::google::GoogleMapsClient;
use crate::services::polyline::Coordinate;
use crate::services::yr::YrClient;

/// Everything known about a checkpoint at its estimated passage time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct EnrichmentBundle {
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    /// yr.no weather symbol, e.g. "lightsnow_night"
    pub symbol_code: Option<String>,
    pub elevation_m: Option<f64>,
    pub locality: Option<String>,
    pub is_daylight: Option<bool>,
    pub chargers: Vec<String>,
}

impl EnrichmentBundle {
    /// Wind-chill adjusted temperature, when both inputs are known.
    pub fn feels_like_c(&self) -> Option<f64> {
        match (self.temperature_c, self.wind_speed_ms) {
            (Some(t), Some(w)) => Some(calculate_feels_like(t, w)),
            _ => None,
        }
    }
}

/// Calculate the "feels like" temperature using the North American Wind Chill Index.
///
/// Formula: 13.12 + 0.6215*T - 11.37*V^0.16 + 0.3965*T*V^0.16
/// Applied when T <= 10°C and V >= 4.8 km/h.
pub fn calculate_feels_like(temperature_c: f64, wind_speed_ms: f64) -> f64 {
    let wind_speed_kmh = wind_speed_ms * 3.6;

    if temperature_c > 10.0 || wind_speed_kmh < 4.8 {
        return temperature_c;
    }

    let v016 = wind_speed_kmh.powf(0.16);
    13.12 + 0.6215 * temperature_c - 11.37 * v016 + 0.3965 * temperature_c * v016
}

#[derive(Debug, Clone)]
pub struct ChargerSearch {
    pub radius_m: u32,
    pub keyword: String,
}

/// Which optional lookups run, and the zone used to pick the sunrise date.
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub daylight_lookup: bool,
    pub charger_search: Option<ChargerSearch>,
    pub timezone: Tz,
}

pub struct Enricher<'a> {
    google: &'a GoogleMapsClient,
    yr: &'a YrClient,
    sunrise: &'a SunriseClient,
    settings: &'a EnrichmentSettings,
}

impl<'a> Enricher<'a> {
    pub fn new(
        google: &'a GoogleMapsClient,
        yr: &'a YrClient,
        sunrise: &'a SunriseClient,
        settings: &'a EnrichmentSettings,
    ) -> Self {
        Self {
            google,
            yr,
            sunrise,
            settings,
        }
    }

    /// Run all lookups for one point, one after another.
    pub async fn enrich(&self, at: Coordinate, arrival: DateTime<Utc>) -> EnrichmentBundle {
        let mut bundle = EnrichmentBundle::default();

        // Elevation first: yr.no uses it to height-correct temperatures
        match self.google.elevation(at.lat, at.lon).await {
            Ok(elevation) => bundle.elevation_m = Some(elevation),
            Err(e) => tracing::warn!(
                "Elevation lookup failed for ({}, {}): {}",
                at.lat,
                at.lon,
                e
            ),
        }

        match self
            .yr
            .reading_at(at.lat, at.lon, bundle.elevation_m, arrival)
            .await
        {
            Ok(reading) => {
                bundle.temperature_c = reading.temperature_c;
                bundle.wind_speed_ms = reading.wind_speed_ms;
                bundle.wind_gust_ms = reading.wind_gust_ms;
                bundle.precipitation_mm = reading.precipitation_mm;
                bundle.cloud_cover_pct = reading.cloud_cover_pct;
                bundle.symbol_code = reading.symbol_code;
            }
            Err(e) => tracing::warn!(
                "Weather lookup failed for ({}, {}) at {}: {}",
                at.lat,
                at.lon,
                arrival,
                e
            ),
        }

        match self.google.reverse_geocode(at.lat, at.lon).await {
            Ok(name) => bundle.locality = Some(name),
            Err(e) => tracing::warn!(
                "Reverse geocode failed for ({}, {}): {}",
                at.lat,
                at.lon,
                e
            ),
        }

        if let Some(search) = &self.settings.charger_search {
            match self
                .google
                .nearby_places(at.lat, at.lon, search.radius_m, &search.keyword)
                .await
            {
                Ok(names) => bundle.chargers = names,
                Err(e) => tracing::warn!(
                    "Charger search failed for ({}, {}): {}",
                    at.lat,
                    at.lon,
                    e
                ),
            }
        }

        if self.settings.daylight_lookup {
            let local_date = arrival.with_timezone(&self.settings.timezone).date_naive();
            match self.sunrise.sun_times(at.lat, at.lon, local_date).await {
                Ok(times) => bundle.is_daylight = times.is_daylight(arrival),
                Err(e) => tracing::warn!(
                    "Sunrise lookup failed for ({}, {}) on {}: {}",
                    at.lat,
                    at.lon,
                    local_date,
                    e
                ),
            }
        }

        bundle
    }
}
