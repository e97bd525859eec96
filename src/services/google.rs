//! Google Maps Platform web service client.
//!
//! Covers the four lookups the planner needs: directions, reverse geocoding,
//! elevation and nearby places. All of them share the same `status` envelope,
//! so a non-`OK` status is surfaced as [`UpstreamError::ApiStatus`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::UpstreamError;
use crate::helpers::round_to;
use crate::services::polyline;
use crate::services::sampler::Route;

const DIRECTIONS_PATH: &str = "/maps/api/directions/json";
const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const ELEVATION_PATH: &str = "/maps/api/elevation/json";
const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";

/// Result types accepted when reverse geocoding a checkpoint.
const LOCALITY_RESULT_TYPES: &str = "locality|administrative_area_level_2";

#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

// --- Google JSON response types ---

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: TextValue,
    duration: TextValue,
    duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    status: String,
    #[serde(default)]
    results: Vec<ElevationResult>,
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: f64,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
}

impl GoogleMapsClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        language: &str,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        })
    }

    /// Look up a driving route between two free-text places.
    ///
    /// The first leg of the first route is used. Duration in traffic is
    /// preferred over the plain duration when the provider returns it.
    pub async fn directions(
        &self,
        origin: &str,
        destination: &str,
        departure: DateTime<Utc>,
    ) -> Result<Route, UpstreamError> {
        // departure_time must not lie in the past
        let departure_time = if departure > Utc::now() {
            departure.timestamp().to_string()
        } else {
            "now".to_string()
        };

        let response: DirectionsResponse = self
            .get_json(
                DIRECTIONS_PATH,
                vec![
                    ("origin", origin.to_string()),
                    ("destination", destination.to_string()),
                    ("departure_time", departure_time),
                ],
            )
            .await?;

        if response.status != "OK" {
            return Err(UpstreamError::ApiStatus(response.status));
        }

        let route = response.routes.into_iter().next().ok_or(UpstreamError::Empty)?;
        let leg = route.legs.into_iter().next().ok_or(UpstreamError::Empty)?;

        let path = polyline::decode(&route.overview_polyline.points)
            .map_err(|e| UpstreamError::Malformed(format!("overview polyline: {}", e)))?;

        let duration = leg.duration_in_traffic.unwrap_or(leg.duration);

        Ok(Route {
            path,
            encoded_polyline: route.overview_polyline.points,
            distance_m: leg.distance.value,
            duration_secs: duration.value,
            distance_text: leg.distance.text,
            duration_text: duration.text,
            start_address: leg.start_address,
            end_address: leg.end_address,
        })
    }

    /// Name of the locality (or municipality) containing a point.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<String, UpstreamError> {
        let response: GeocodeResponse = self
            .get_json(
                GEOCODE_PATH,
                vec![
                    ("latlng", latlng(lat, lon)?),
                    ("result_type", LOCALITY_RESULT_TYPES.to_string()),
                ],
            )
            .await?;

        match response.status.as_str() {
            "OK" => response
                .results
                .into_iter()
                .next()
                .and_then(|r| r.address_components.into_iter().next())
                .map(|c| c.long_name)
                .ok_or(UpstreamError::Empty),
            "ZERO_RESULTS" => Err(UpstreamError::Empty),
            _ => Err(UpstreamError::ApiStatus(response.status)),
        }
    }

    /// Terrain elevation in metres above sea level.
    pub async fn elevation(&self, lat: f64, lon: f64) -> Result<f64, UpstreamError> {
        let response: ElevationResponse = self
            .get_json(ELEVATION_PATH, vec![("locations", latlng(lat, lon)?)])
            .await?;

        if response.status != "OK" {
            return Err(UpstreamError::ApiStatus(response.status));
        }

        response
            .results
            .first()
            .map(|r| r.elevation)
            .ok_or(UpstreamError::Empty)
    }

    /// Names of places matching `keyword` within `radius_m` of a point.
    ///
    /// `ZERO_RESULTS` is an empty list, not an error.
    pub async fn nearby_places(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        keyword: &str,
    ) -> Result<Vec<String>, UpstreamError> {
        let response: PlacesResponse = self
            .get_json(
                NEARBY_SEARCH_PATH,
                vec![
                    ("location", latlng(lat, lon)?),
                    ("radius", radius_m.to_string()),
                    ("keyword", keyword.to_string()),
                ],
            )
            .await?;

        match response.status.as_str() {
            "OK" => Ok(response.results.into_iter().map(|p| p.name).collect()),
            "ZERO_RESULTS" => Ok(Vec::new()),
            _ => Err(UpstreamError::ApiStatus(response.status)),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, UpstreamError> {
        params.push(("language", self.language.clone()));
        params.push(("key", self.api_key.clone()));

        let url = reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| UpstreamError::Malformed(format!("Google Maps URL: {}", e)))?;

        // Errors carry the request URL, which contains the API key
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Http(e.without_url()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::Http(e.without_url()))
    }
}

fn latlng(lat: f64, lon: f64) -> Result<String, UpstreamError> {
    match (round_to(lat, 5), round_to(lon, 5)) {
        (Some(lat), Some(lon)) => Ok(format!("{},{}", lat, lon)),
        _ => Err(UpstreamError::Malformed("non-finite coordinate".into())),
    }
}
