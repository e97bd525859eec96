use chrono_tz::Tz;

const DEFAULT_USER_AGENT: &str = "RoadRiskPlanner/0.1 github.com/road-risk/road-risk-api";
const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";
const DEFAULT_YR_BASE_URL: &str = "https://api.met.no";
const DEFAULT_SUNRISE_BASE_URL: &str = "https://api.sunrise-sunset.org";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_maps_api_key: String,
    pub yr_user_agent: String,
    pub port: u16,
    /// Distance between sampled checkpoints.
    pub checkpoint_interval_km: f64,
    /// Append a checkpoint at the destination when it is not on an interval boundary.
    pub include_destination_checkpoint: bool,
    /// Per-request timeout for every outbound HTTP call.
    pub http_timeout_secs: u64,
    /// Zone used to interpret the user's date/time and to report local passage times.
    pub timezone: Tz,
    pub maps_language: String,
    pub enable_daylight_lookup: bool,
    pub enable_charger_search: bool,
    pub charger_search_radius_m: u32,
    pub charger_search_keyword: String,
    pub google_maps_base_url: String,
    pub yr_base_url: String,
    pub sunrise_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_maps_api_key = lookup("GOOGLE_MAPS_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;

        let checkpoint_interval_km: f64 = parse_or(&lookup, "CHECKPOINT_INTERVAL_KM", 80.0)?;
        if !checkpoint_interval_km.is_finite() || checkpoint_interval_km <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "CHECKPOINT_INTERVAL_KM",
                value: checkpoint_interval_km.to_string(),
            });
        }

        let http_timeout_secs: u64 = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 5)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                value: http_timeout_secs.to_string(),
            });
        }

        let timezone = match lookup("TRIP_TIMEZONE") {
            Some(value) => value.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                name: "TRIP_TIMEZONE",
                value,
            })?,
            None => chrono_tz::Europe::Oslo,
        };

        Ok(Self {
            google_maps_api_key,
            yr_user_agent: lookup("YR_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            checkpoint_interval_km,
            include_destination_checkpoint: parse_flag(
                &lookup,
                "INCLUDE_DESTINATION_CHECKPOINT",
                true,
            )?,
            http_timeout_secs,
            timezone,
            maps_language: lookup("MAPS_LANGUAGE").unwrap_or_else(|| "no".to_string()),
            enable_daylight_lookup: parse_flag(&lookup, "ENABLE_DAYLIGHT_LOOKUP", true)?,
            enable_charger_search: parse_flag(&lookup, "ENABLE_CHARGER_SEARCH", false)?,
            charger_search_radius_m: parse_or(&lookup, "CHARGER_SEARCH_RADIUS_M", 5000)?,
            charger_search_keyword: lookup("CHARGER_SEARCH_KEYWORD")
                .unwrap_or_else(|| "ev charging station".to_string()),
            google_maps_base_url: lookup("GOOGLE_MAPS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_MAPS_BASE_URL.to_string()),
            yr_base_url: lookup("YR_BASE_URL").unwrap_or_else(|| DEFAULT_YR_BASE_URL.to_string()),
            sunrise_base_url: lookup("SUNRISE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SUNRISE_BASE_URL.to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::from_lookup(lookup_from(&[("GOOGLE_MAPS_API_KEY", "test-key")]))
            .unwrap();

        assert_eq!(config.google_maps_api_key, "test-key");
        assert_eq!(config.port, 8080);
        assert_eq!(config.checkpoint_interval_km, 80.0);
        assert!(config.include_destination_checkpoint);
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.timezone, chrono_tz::Europe::Oslo);
        assert_eq!(config.maps_language, "no");
        assert!(config.enable_daylight_lookup);
        assert!(!config.enable_charger_search);
        assert!(config.yr_user_agent.contains("RoadRiskPlanner"));
        assert_eq!(config.yr_base_url, "https://api.met.no");
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_MAPS_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[("GOOGLE_MAPS_API_KEY", "  ")]));
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_MAPS_API_KEY", "k"),
            ("PORT", "9000"),
            ("CHECKPOINT_INTERVAL_KM", "50"),
            ("INCLUDE_DESTINATION_CHECKPOINT", "false"),
            ("TRIP_TIMEZONE", "Europe/Stockholm"),
            ("ENABLE_CHARGER_SEARCH", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.checkpoint_interval_km, 50.0);
        assert!(!config.include_destination_checkpoint);
        assert_eq!(config.timezone, chrono_tz::Europe::Stockholm);
        assert!(config.enable_charger_search);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_interval = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_MAPS_API_KEY", "k"),
            ("CHECKPOINT_INTERVAL_KM", "-5"),
        ]));
        assert!(bad_interval.is_err());

        let bad_zone = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_MAPS_API_KEY", "k"),
            ("TRIP_TIMEZONE", "Mars/Olympus"),
        ]));
        assert!(bad_zone.unwrap_err().to_string().contains("TRIP_TIMEZONE"));

        let zero_timeout = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_MAPS_API_KEY", "k"),
            ("HTTP_TIMEOUT_SECS", "0"),
        ]));
        assert!(matches!(
            zero_timeout,
            Err(ConfigError::Invalid { name: "HTTP_TIMEOUT_SECS", .. })
        ));

        let bad_flag = AppConfig::from_lookup(lookup_from(&[
            ("GOOGLE_MAPS_API_KEY", "k"),
            ("ENABLE_DAYLIGHT_LOOKUP", "sometimes"),
        ]));
        assert!(bad_flag.is_err());
    }
}
