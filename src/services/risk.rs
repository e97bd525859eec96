//! Heuristic road-risk scoring.
//!
//! `assess` is pure: the same bundle and clock time always produce the same
//! assessment. Scores start at 1 and are clamped to 10.

use chrono::NaiveTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::enrich::EnrichmentBundle;

const BASE_SCORE: i32 = 1;
const MAX_SCORE: i32 = 10;

/// Near-freezing band where wet roads turn to ice.
const NEAR_FREEZING_MIN_C: f64 = -1.5;
const NEAR_FREEZING_MAX_C: f64 = 0.5;
const PRECIPITATION_THRESHOLD_MM: f64 = 0.1;
const STRONG_WIND_MS: f64 = 12.0;
const STORM_WIND_MS: f64 = 20.0;
const HIGH_ELEVATION_M: f64 = 700.0;

/// Hours considered dark when no sunrise/sunset data is available.
const FALLBACK_DAWN_HOUR: u32 = 7;
const FALLBACK_DUSK_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 7 => RiskTier::High,
            s if s >= 4 => RiskTier::Moderate,
            _ => RiskTier::Low,
        }
    }

    pub fn status_symbol(self) -> &'static str {
        match self {
            RiskTier::High => "🔴",
            RiskTier::Moderate => "🟡",
            RiskTier::Low => "🟢",
        }
    }

    pub fn marker_color(self) -> &'static str {
        match self {
            RiskTier::High => "red",
            RiskTier::Moderate => "orange",
            RiskTier::Low => "green",
        }
    }

    /// Expected slowdown through a checkpoint of this tier.
    pub fn delay_minutes(self) -> i64 {
        match self {
            RiskTier::High => 15,
            RiskTier::Moderate => 5,
            RiskTier::Low => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    IcyRoad,
    BlackIce,
    WinterConditions,
    Precipitation,
    StrongWind,
    Storm,
    Darkness,
    HighElevation,
    Fog,
    WeatherUnavailable,
    GoodConditions,
}

impl RiskReason {
    pub fn label(self) -> &'static str {
        match self {
            RiskReason::IcyRoad => "icy road",
            RiskReason::BlackIce => "possible black ice",
            RiskReason::WinterConditions => "winter conditions",
            RiskReason::Precipitation => "precipitation",
            RiskReason::StrongWind => "strong wind",
            RiskReason::Storm => "storm",
            RiskReason::Darkness => "darkness",
            RiskReason::HighElevation => "mountain pass",
            RiskReason::Fog => "fog",
            RiskReason::WeatherUnavailable => "weather unavailable",
            RiskReason::GoodConditions => "good conditions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RiskAssessment {
    /// 1 (benign) to 10 (severe)
    pub score: u8,
    pub tier: RiskTier,
    pub reasons: Vec<RiskReason>,
    pub delay_minutes: i64,
}

impl RiskAssessment {
    /// e.g. `8/10 🔴`
    pub fn status_text(&self) -> String {
        format!("{}/10 {}", self.score, self.tier.status_symbol())
    }

    pub fn reason_labels(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Score one checkpoint from its enrichment and local clock time.
pub fn assess(bundle: &EnrichmentBundle, local_time: NaiveTime) -> RiskAssessment {
    let mut points = 0;
    let mut reasons = Vec::new();

    let precip = bundle.precipitation_mm.unwrap_or(0.0);
    let wet = precip > PRECIPITATION_THRESHOLD_MM;

    let near_freezing = matches!(
        bundle.temperature_c,
        Some(t) if (NEAR_FREEZING_MIN_C..=NEAR_FREEZING_MAX_C).contains(&t)
    );

    match bundle.temperature_c {
        Some(_) if near_freezing && wet => {
            points += 7;
            reasons.push(RiskReason::IcyRoad);
        }
        Some(_) if near_freezing => {
            points += 4;
            reasons.push(RiskReason::BlackIce);
        }
        Some(t) if t < NEAR_FREEZING_MIN_C => {
            points += 2;
            reasons.push(RiskReason::WinterConditions);
        }
        _ => {}
    }

    if wet && !near_freezing {
        points += 2;
        reasons.push(RiskReason::Precipitation);
    }

    match bundle.wind_speed_ms {
        Some(w) if w > STORM_WIND_MS => {
            points += 3;
            reasons.push(RiskReason::Storm);
        }
        Some(w) if w > STRONG_WIND_MS => {
            points += 2;
            reasons.push(RiskReason::StrongWind);
        }
        _ => {}
    }

    if is_dark(bundle.is_daylight, local_time) {
        points += 1;
        reasons.push(RiskReason::Darkness);
    }

    if bundle.elevation_m.is_some_and(|e| e > HIGH_ELEVATION_M) {
        points += 1;
        reasons.push(RiskReason::HighElevation);
    }

    if bundle
        .symbol_code
        .as_deref()
        .is_some_and(|s| s.contains("fog"))
    {
        points += 1;
        reasons.push(RiskReason::Fog);
    }

    if bundle.temperature_c.is_none() {
        reasons.push(RiskReason::WeatherUnavailable);
    } else if reasons.is_empty() {
        reasons.push(RiskReason::GoodConditions);
    }

    let score = (BASE_SCORE + points).clamp(BASE_SCORE, MAX_SCORE) as u8;
    let tier = RiskTier::from_score(score);

    RiskAssessment {
        score,
        tier,
        reasons,
        delay_minutes: tier.delay_minutes(),
    }
}

fn is_dark(is_daylight: Option<bool>, local_time: NaiveTime) -> bool {
    match is_daylight {
        Some(daylight) => !daylight,
        None => {
            let dawn = NaiveTime::from_hms_opt(FALLBACK_DAWN_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
            let dusk = NaiveTime::from_hms_opt(FALLBACK_DUSK_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
            local_time < dawn || local_time >= dusk
        }
    }
}
