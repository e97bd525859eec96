//! yr.no Locationforecast 2.0 client.
//!
//! Fetches the compact forecast timeseries from the MET Norway API and picks
//! the entry closest to a checkpoint's estimated passage time.
//! See: https://api.met.no/weatherapi/locationforecast/2.0/documentation

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::UpstreamError;
use crate::helpers::round_to;

const YR_COMPACT_PATH: &str = "/weatherapi/locationforecast/2.0/compact";

/// Client for the yr.no Locationforecast API.
#[derive(Debug, Clone)]
pub struct YrClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

/// Instantaneous weather at one timeseries entry.
///
/// Every value is optional: yr.no omits parameters it has no data for, and a
/// missing reading must stay distinguishable from a genuine zero.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub time: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_gust_ms: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    /// Precipitation over the next hour (next six hours when the hourly block is absent).
    pub precipitation_mm: Option<f64>,
    /// yr.no weather symbol, e.g. "lightsnow", "fog", "clearsky_night".
    pub symbol_code: Option<String>,
}

// --- yr.no JSON response types ---

#[derive(Debug, Deserialize)]
struct YrResponse {
    properties: YrProperties,
}

#[derive(Debug, Deserialize)]
struct YrProperties {
    timeseries: Vec<YrTimeseries>,
}

#[derive(Debug, Deserialize)]
struct YrTimeseries {
    time: String,
    data: YrData,
}

#[derive(Debug, Deserialize)]
struct YrData {
    instant: YrInstant,
    next_1_hours: Option<YrPeriod>,
    next_6_hours: Option<YrPeriod>,
}

#[derive(Debug, Deserialize)]
struct YrInstant {
    details: YrInstantDetails,
}

#[derive(Debug, Deserialize)]
struct YrInstantDetails {
    air_temperature: Option<f64>,
    wind_speed: Option<f64>,
    wind_speed_of_gust: Option<f64>,
    cloud_area_fraction: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YrPeriod {
    summary: Option<YrSummary>,
    details: Option<YrPeriodDetails>,
}

#[derive(Debug, Deserialize)]
struct YrSummary {
    symbol_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YrPeriodDetails {
    precipitation_amount: Option<f64>,
}

impl YrClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Fetch the full compact timeseries for a location.
    ///
    /// `altitude` (metres) lets yr.no height-correct the temperature; it is
    /// omitted when the elevation lookup did not produce a value.
    pub async fn fetch_timeseries(
        &self,
        lat: f64,
        lon: f64,
        altitude: Option<f64>,
    ) -> Result<serde_json::Value, UpstreamError> {
        // Limit to 4 decimal places per yr.no terms of service
        let lat = round_to(lat, 4).ok_or_else(|| UpstreamError::Malformed("latitude".into()))?;
        let lon = round_to(lon, 4).ok_or_else(|| UpstreamError::Malformed("longitude".into()))?;

        let mut params = vec![("lat", format!("{:.4}", lat)), ("lon", format!("{:.4}", lon))];
        if let Some(alt) = altitude.filter(|a| a.is_finite()) {
            params.push(("altitude", format!("{:.0}", alt)));
        }

        let url = reqwest::Url::parse_with_params(
            &format!("{}{}", self.base_url, YR_COMPACT_PATH),
            &params,
        )
        .map_err(|e| UpstreamError::Malformed(format!("yr.no URL: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| UpstreamError::Malformed(format!("Invalid User-Agent: {}", e)))?,
        );

        let response = self.client.get(url).headers(headers).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    /// Fetch the timeseries and return the reading closest to `time`.
    pub async fn reading_at(
        &self,
        lat: f64,
        lon: f64,
        altitude: Option<f64>,
        time: DateTime<Utc>,
    ) -> Result<WeatherReading, UpstreamError> {
        let raw_json = self.fetch_timeseries(lat, lon, altitude).await?;
        extract_reading_at_time(&raw_json, time)
    }
}

/// Pick the timeseries entry nearest to `target` and convert it.
///
/// Pure function (no I/O). Nearest means minimum absolute time difference;
/// on a tie the earlier entry wins. Entries with unparseable timestamps are
/// skipped.
pub fn extract_reading_at_time(
    raw_json: &serde_json::Value,
    target: DateTime<Utc>,
) -> Result<WeatherReading, UpstreamError> {
    let yr_response: YrResponse = serde_json::from_value(raw_json.clone())
        .map_err(|e| UpstreamError::Malformed(format!("yr.no response structure: {}", e)))?;

    let target_ts = target.timestamp();
    let (time, closest) = yr_response
        .properties
        .timeseries
        .iter()
        .filter_map(|ts| {
            DateTime::parse_from_rfc3339(&ts.time)
                .ok()
                .map(|dt| (dt.with_timezone(&Utc), ts))
        })
        .min_by_key(|(time, _)| (time.timestamp() - target_ts).unsigned_abs())
        .ok_or(UpstreamError::Empty)?;

    Ok(parse_timeseries_entry(time, closest))
}

/// Convert a single yr.no timeseries entry.
fn parse_timeseries_entry(time: DateTime<Utc>, entry: &YrTimeseries) -> WeatherReading {
    let instant = &entry.data.instant.details;

    // Prefer next_1_hours, fall back to next_6_hours
    let period = entry
        .data
        .next_1_hours
        .as_ref()
        .or(entry.data.next_6_hours.as_ref());

    WeatherReading {
        time,
        temperature_c: instant.air_temperature,
        wind_speed_ms: instant.wind_speed,
        wind_gust_ms: instant.wind_speed_of_gust,
        cloud_cover_pct: instant.cloud_area_fraction,
        precipitation_mm: period
            .and_then(|p| p.details.as_ref())
            .and_then(|d| d.precipitation_amount),
        symbol_code: period
            .and_then(|p| p.summary.as_ref())
            .and_then(|s| s.symbol_code.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn two_entry_series() -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "properties": {
                "timeseries": [
                    {
                        "time": "2026-01-15T07:00:00Z",
                        "data": {
                            "instant": {
                                "details": {
                                    "air_temperature": -5.0,
                                    "wind_speed": 3.2,
                                    "cloud_area_fraction": 50.0
                                }
                            },
                            "next_1_hours": {
                                "summary": { "symbol_code": "cloudy" },
                                "details": { "precipitation_amount": 0.0 }
                            }
                        }
                    },
                    {
                        "time": "2026-01-15T08:00:00Z",
                        "data": {
                            "instant": {
                                "details": {
                                    "air_temperature": -0.5,
                                    "wind_speed": 4.0,
                                    "wind_speed_of_gust": 9.1
                                }
                            },
                            "next_1_hours": {
                                "summary": { "symbol_code": "lightsleet" },
                                "details": { "precipitation_amount": 0.3 }
                            }
                        }
                    }
                ]
            }
        })
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn test_extract_nearest_entry() {
        let reading =
            extract_reading_at_time(&two_entry_series(), at("2026-01-15T07:50:00Z")).unwrap();
        assert_eq!(reading.time, at("2026-01-15T08:00:00Z"));
        assert_eq!(reading.temperature_c, Some(-0.5));
        assert_eq!(reading.precipitation_mm, Some(0.3));
        assert_eq!(reading.wind_gust_ms, Some(9.1));
        assert_eq!(reading.symbol_code.as_deref(), Some("lightsleet"));
    }

    #[test]
    fn test_extract_tie_prefers_earlier_entry() {
        // 07:30 is 30 min from both entries; the first one wins
        let reading =
            extract_reading_at_time(&two_entry_series(), at("2026-01-15T07:30:00Z")).unwrap();
        assert_eq!(reading.temperature_c, Some(-5.0));
    }

    #[test]
    fn test_extract_missing_values_stay_none() {
        let reading =
            extract_reading_at_time(&two_entry_series(), at("2026-01-15T07:00:00Z")).unwrap();
        assert_eq!(reading.wind_gust_ms, None);
        assert_eq!(reading.precipitation_mm, Some(0.0));
    }

    #[test]
    fn test_extract_falls_back_to_six_hour_period() {
        let json = serde_json::json!({
            "properties": {
                "timeseries": [{
                    "time": "2026-01-20T12:00:00Z",
                    "data": {
                        "instant": { "details": { "air_temperature": 1.0 } },
                        "next_6_hours": {
                            "summary": { "symbol_code": "rain" },
                            "details": { "precipitation_amount": 2.4 }
                        }
                    }
                }]
            }
        });
        let reading = extract_reading_at_time(&json, at("2026-01-20T13:00:00Z")).unwrap();
        assert_eq!(reading.precipitation_mm, Some(2.4));
        assert_eq!(reading.symbol_code.as_deref(), Some("rain"));
    }

    #[test]
    fn test_extract_empty_timeseries() {
        let json = serde_json::json!({ "properties": { "timeseries": [] } });
        let result = extract_reading_at_time(&json, at("2026-01-15T07:00:00Z"));
        assert!(matches!(result, Err(UpstreamError::Empty)));
    }

    #[test]
    fn test_extract_malformed_payload() {
        let json = serde_json::json!({ "error": "nope" });
        let result = extract_reading_at_time(&json, at("2026-01-15T07:00:00Z"));
        assert!(matches!(result, Err(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_reading_at_sends_rounded_coordinates_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(YR_COMPACT_PATH))
            .and(query_param("lat", "63.4305"))
            .and(query_param("lon", "10.3951"))
            .and(query_param("altitude", "120"))
            .and(header("user-agent", "test-agent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(two_entry_series()))
            .mount(&server)
            .await;

        let client =
            YrClient::new(&server.uri(), "test-agent/1.0", Duration::from_secs(2)).unwrap();
        let reading = client
            .reading_at(63.430_49, 10.395_06, Some(120.4), at("2026-01-15T08:05:00Z"))
            .await
            .unwrap();
        assert_eq!(reading.temperature_c, Some(-0.5));
    }

    #[tokio::test]
    async fn test_reading_at_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(YR_COMPACT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            YrClient::new(&server.uri(), "test-agent/1.0", Duration::from_secs(2)).unwrap();
        let result = client
            .reading_at(63.43, 10.39, None, at("2026-01-15T08:00:00Z"))
            .await;
        assert!(matches!(result, Err(UpstreamError::Status(status)) if status.as_u16() == 503));
    }
}
