//! Sunrise/sunset lookup (sunrise-sunset.org).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::UpstreamError;
use crate::helpers::round_to;

const SUN_TIMES_PATH: &str = "/json";

#[derive(Debug, Clone)]
pub struct SunriseClient {
    client: reqwest::Client,
    base_url: String,
}

/// Sunrise and sunset for one place and date, in UTC.
///
/// Either side is `None` when the sun does not rise or set that day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

impl SunTimes {
    /// `sunrise <= at < sunset`, or `None` when either bound is unknown.
    pub fn is_daylight(&self, at: DateTime<Utc>) -> Option<bool> {
        match (self.sunrise, self.sunset) {
            (Some(sunrise), Some(sunset)) if sunrise < sunset => {
                Some(sunrise <= at && at < sunset)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SunResponse {
    status: String,
    results: Option<SunResults>,
}

#[derive(Debug, Deserialize)]
struct SunResults {
    sunrise: String,
    sunset: String,
}

impl SunriseClient {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn sun_times(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<SunTimes, UpstreamError> {
        let (lat, lon) = match (round_to(lat, 4), round_to(lon, 4)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(UpstreamError::Malformed("non-finite coordinate".into())),
        };

        let url = reqwest::Url::parse_with_params(
            &format!("{}{}", self.base_url, SUN_TIMES_PATH),
            &[
                ("lat", lat.to_string()),
                ("lng", lon.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("formatted", "0".to_string()),
            ],
        )
        .map_err(|e| UpstreamError::Malformed(format!("sunrise URL: {}", e)))?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let body: SunResponse = response.json().await?;
        if body.status != "OK" {
            return Err(UpstreamError::ApiStatus(body.status));
        }
        let results = body.results.ok_or(UpstreamError::Empty)?;

        Ok(SunTimes {
            sunrise: parse_sun_time(&results.sunrise),
            sunset: parse_sun_time(&results.sunset),
        })
    }
}

/// Parse a provider timestamp. The epoch placeholder used for polar
/// day/night maps to `None`.
fn parse_sun_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| dt.year() > 1970)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn test_is_daylight_window() {
        let times = SunTimes {
            sunrise: Some(at("2026-01-15T09:10:00Z")),
            sunset: Some(at("2026-01-15T14:05:00Z")),
        };
        assert_eq!(times.is_daylight(at("2026-01-15T09:10:00Z")), Some(true));
        assert_eq!(times.is_daylight(at("2026-01-15T12:00:00Z")), Some(true));
        assert_eq!(times.is_daylight(at("2026-01-15T14:05:00Z")), Some(false));
        assert_eq!(times.is_daylight(at("2026-01-15T07:00:00Z")), Some(false));
    }

    #[test]
    fn test_is_daylight_unknown_without_bounds() {
        let times = SunTimes {
            sunrise: None,
            sunset: None,
        };
        assert_eq!(times.is_daylight(at("2026-06-21T12:00:00Z")), None);
    }

    #[test]
    fn test_polar_placeholder_is_none() {
        assert_eq!(parse_sun_time("1970-01-01T00:00:01+00:00"), None);
        assert!(parse_sun_time("2026-06-21T01:02:03+00:00").is_some());
        assert_eq!(parse_sun_time("garbage"), None);
    }

    #[tokio::test]
    async fn test_sun_times_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUN_TIMES_PATH))
            .and(query_param("lat", "63.4305"))
            .and(query_param("lng", "10.3951"))
            .and(query_param("date", "2026-01-15"))
            .and(query_param("formatted", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": {
                    "sunrise": "2026-01-15T08:53:12+00:00",
                    "sunset": "2026-01-15T14:19:40+00:00",
                    "day_length": 19588
                }
            })))
            .mount(&server)
            .await;

        let client = SunriseClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let times = client.sun_times(63.430_49, 10.395_06, date).await.unwrap();
        assert_eq!(times.sunrise, Some(at("2026-01-15T08:53:12Z")));
        assert_eq!(times.is_daylight(at("2026-01-15T16:00:00Z")), Some(false));
    }

    #[tokio::test]
    async fn test_sun_times_invalid_request_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUN_TIMES_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "INVALID_DATE", "results": "" })),
            )
            .mount(&server)
            .await;

        let client = SunriseClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_err!(client.sun_times(63.43, 10.39, date).await);
    }
}
