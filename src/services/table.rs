//! Tabular view of an analysis and its CSV export.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::helpers::format_reading;
use crate::services::trip::{AnalyzedCheckpoint, TripAnalysis};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error flushing CSV: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Column headers, in display order.
pub const COLUMNS: [&str; 14] = [
    "KM",
    "Time",
    "Place",
    "Elevation",
    "Temp",
    "Feels like",
    "Precipitation",
    "Wind",
    "Gust",
    "Weather",
    "Daylight",
    "Risk",
    "Reasons",
    "Chargers",
];

/// One display row per checkpoint. Missing values read `unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TableRow {
    pub km: String,
    /// Local passage time, HH:MM
    pub time: String,
    pub place: String,
    pub elevation: String,
    pub temp: String,
    pub feels_like: String,
    pub precipitation: String,
    pub wind: String,
    pub gust: String,
    pub weather: String,
    pub daylight: String,
    /// e.g. "8/10 🔴"
    pub risk: String,
    pub reasons: String,
    pub chargers: String,
}

impl TableRow {
    pub fn from_checkpoint(cp: &AnalyzedCheckpoint) -> Self {
        let b = &cp.bundle;
        Self {
            km: format!("{:.0}", cp.checkpoint.distance_km),
            time: cp.local_arrival.format("%H:%M").to_string(),
            place: cp.place().to_string(),
            elevation: match b.elevation_m {
                Some(e) if e.is_finite() => format!("{:.0} m", e),
                _ => "unknown".to_string(),
            },
            temp: format_reading(b.temperature_c, "°C"),
            feels_like: format_reading(b.feels_like_c(), "°C"),
            precipitation: format_reading(b.precipitation_mm, " mm"),
            wind: format_reading(b.wind_speed_ms, " m/s"),
            gust: format_reading(b.wind_gust_ms, " m/s"),
            weather: b.symbol_code.clone().unwrap_or_else(|| "unknown".to_string()),
            daylight: match b.is_daylight {
                Some(true) => "yes",
                Some(false) => "no",
                None => "unknown",
            }
            .to_string(),
            risk: cp.assessment.status_text(),
            reasons: cp.assessment.reason_labels(),
            chargers: if b.chargers.is_empty() {
                "none".to_string()
            } else {
                b.chargers.join("; ")
            },
        }
    }

    fn fields(&self) -> [&str; 14] {
        [
            self.km.as_str(),
            self.time.as_str(),
            self.place.as_str(),
            self.elevation.as_str(),
            self.temp.as_str(),
            self.feels_like.as_str(),
            self.precipitation.as_str(),
            self.wind.as_str(),
            self.gust.as_str(),
            self.weather.as_str(),
            self.daylight.as_str(),
            self.risk.as_str(),
            self.reasons.as_str(),
            self.chargers.as_str(),
        ]
    }
}

pub fn table_rows(analysis: &TripAnalysis) -> Vec<TableRow> {
    analysis
        .checkpoints
        .iter()
        .map(TableRow::from_checkpoint)
        .collect()
}

/// Render rows as CSV with a header line.
pub fn write_csv(rows: &[TableRow]) -> Result<String, TableError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.write_record(row.fields())?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::enrich::EnrichmentBundle;
    use crate::services::polyline::Coordinate;
    use crate::services::risk::assess;
    use crate::services::sampler::Checkpoint;
    use chrono::{DateTime, Utc};

    fn analyzed(bundle: EnrichmentBundle) -> AnalyzedCheckpoint {
        let arrival: DateTime<Utc> = "2026-01-15T09:25:00Z".parse().unwrap();
        let local_arrival = arrival.with_timezone(&chrono_tz::Europe::Oslo);
        let assessment = assess(&bundle, local_arrival.time());
        AnalyzedCheckpoint {
            checkpoint: Checkpoint {
                distance_km: 160.0,
                fraction: 0.4,
                coordinate: Coordinate::new(64.47, 11.5),
                estimated_elapsed_secs: 8000.0,
                estimated_arrival: arrival,
                is_destination: false,
            },
            arrival,
            local_arrival,
            accumulated_delay_minutes: 0,
            bundle,
            assessment,
        }
    }

    fn icy_bundle() -> EnrichmentBundle {
        EnrichmentBundle {
            temperature_c: Some(-0.46),
            wind_speed_ms: Some(5.0),
            precipitation_mm: Some(0.3),
            symbol_code: Some("lightsleet".to_string()),
            elevation_m: Some(104.6),
            locality: Some("Grong".to_string()),
            is_daylight: Some(true),
            chargers: vec!["Mer Grong".to_string(), "Circle K".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_row_display_values() {
        let row = TableRow::from_checkpoint(&analyzed(icy_bundle()));
        assert_eq!(row.km, "160");
        assert_eq!(row.time, "10:25");
        assert_eq!(row.place, "Grong");
        assert_eq!(row.elevation, "105 m");
        assert_eq!(row.temp, "-0.5°C");
        assert_eq!(row.precipitation, "0.3 mm");
        assert_eq!(row.gust, "unknown");
        assert_eq!(row.daylight, "yes");
        assert_eq!(row.risk, "8/10 🔴");
        assert_eq!(row.reasons, "icy road");
        assert_eq!(row.chargers, "Mer Grong; Circle K");
    }

    #[test]
    fn test_row_missing_values_are_unknown() {
        let row = TableRow::from_checkpoint(&analyzed(EnrichmentBundle::default()));
        assert_eq!(row.place, "unknown");
        assert_eq!(row.elevation, "unknown");
        assert_eq!(row.temp, "unknown");
        assert_eq!(row.feels_like, "unknown");
        assert_eq!(row.weather, "unknown");
        assert_eq!(row.daylight, "unknown");
        assert_eq!(row.chargers, "none");
        assert_eq!(row.reasons, "weather unavailable");
    }

    #[test]
    fn test_csv_export() {
        let rows = vec![TableRow::from_checkpoint(&analyzed(icy_bundle()))];
        let csv = write_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "KM,Time,Place,Elevation,Temp,Feels like,Precipitation,Wind,Gust,Weather,Daylight,Risk,Reasons,Chargers"
        );
        let data = lines.next().unwrap();
        assert!(data.starts_with("160,10:25,Grong,105 m,-0.5°C,"));
        assert!(data.ends_with("8/10 🔴,icy road,Mer Grong; Circle K"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_quotes_commas() {
        let mut bundle = icy_bundle();
        bundle.locality = Some("Steinkjer, Trøndelag".to_string());
        let csv = write_csv(&[TableRow::from_checkpoint(&analyzed(bundle))]).unwrap();
        assert!(csv.contains("\"Steinkjer, Trøndelag\""));
    }

    #[test]
    fn test_csv_empty_table_has_header_only() {
        let csv = write_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
