//! Route sampler.
//!
//! Walks a decoded route path and yields checkpoints every `interval_km` of
//! driven distance, each with its estimated elapsed time and arrival time
//! (even pacing: time is proportional to distance).
//!
//! Segment lengths are great-circle (haversine) distances between consecutive
//! path vertices. The summed path length is scaled to the provider's reported
//! total distance, so the final vertex sits exactly at the route's length and
//! the number of checkpoints depends only on that total and the interval.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::services::polyline::Coordinate;

/// Mean earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in metres.
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

#[derive(Debug, Error, PartialEq)]
pub enum SamplerError {
    #[error("route path needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("route distance must be positive, got {0} m")]
    NonPositiveDistance(f64),
    #[error("checkpoint interval must be positive, got {0} km")]
    InvalidInterval(f64),
}

/// A driving route as returned by the directions lookup.
#[derive(Debug, Clone)]
pub struct Route {
    /// Decoded overview path, start to destination.
    pub path: Vec<Coordinate>,
    /// The path as the provider encoded it.
    pub encoded_polyline: String,
    pub distance_m: f64,
    /// Traffic-aware duration when the provider supplies one.
    pub duration_secs: f64,
    pub distance_text: String,
    pub duration_text: String,
    pub start_address: String,
    pub end_address: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub interval_km: f64,
    /// Also emit a checkpoint at the destination when it falls between interval marks.
    pub include_destination: bool,
}

/// A sampled point along the route.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Distance marker: a multiple of the interval, or the full route length
    /// for the destination checkpoint.
    pub distance_km: f64,
    /// Share of the route driven when this checkpoint is reached (0.0..=1.0).
    pub fraction: f64,
    pub coordinate: Coordinate,
    pub estimated_elapsed_secs: f64,
    /// Departure + elapsed. Excludes any accumulated weather delay.
    pub estimated_arrival: DateTime<Utc>,
    pub is_destination: bool,
}

/// Lazy, consume-once checkpoint sequence over a route.
pub struct CheckpointSampler<'a> {
    path: &'a [Coordinate],
    total_m: f64,
    duration_secs: f64,
    departure: DateTime<Utc>,
    interval_m: f64,
    include_destination: bool,
    /// Multiplies haversine lengths so the path sums to `total_m`.
    scale: f64,
    vertex: usize,
    cumulative_m: f64,
    next_k: u64,
    max_k: u64,
    destination_done: bool,
}

impl<'a> CheckpointSampler<'a> {
    pub fn new(
        route: &'a Route,
        departure: DateTime<Utc>,
        config: SamplerConfig,
    ) -> Result<Self, SamplerError> {
        if route.path.len() < 2 {
            return Err(SamplerError::TooFewPoints(route.path.len()));
        }
        if !route.distance_m.is_finite() || route.distance_m <= 0.0 {
            return Err(SamplerError::NonPositiveDistance(route.distance_m));
        }
        if !config.interval_km.is_finite() || config.interval_km <= 0.0 {
            return Err(SamplerError::InvalidInterval(config.interval_km));
        }

        let path_length_m: f64 = route
            .path
            .windows(2)
            .map(|pair| haversine_distance_m(pair[0], pair[1]))
            .sum();
        let scale = if path_length_m > 0.0 {
            route.distance_m / path_length_m
        } else {
            0.0
        };

        let interval_m = config.interval_km * 1000.0;

        Ok(Self {
            path: &route.path,
            total_m: route.distance_m,
            duration_secs: route.duration_secs.max(0.0),
            departure,
            interval_m,
            include_destination: config.include_destination,
            scale,
            vertex: 0,
            cumulative_m: 0.0,
            next_k: 0,
            max_k: (route.distance_m / interval_m).floor() as u64,
            destination_done: false,
        })
    }

    /// Move to the next path vertex, accumulating scaled distance.
    fn advance(&mut self) {
        let prev = self.path[self.vertex];
        self.vertex += 1;
        if self.vertex == self.path.len() - 1 {
            // Pin the final vertex to the reported length; avoids float drift
            // leaving the last interval mark unreached.
            self.cumulative_m = self.total_m;
        } else {
            self.cumulative_m += haversine_distance_m(prev, self.path[self.vertex]) * self.scale;
        }
    }

    fn checkpoint(&self, distance_km: f64, fraction: f64, is_destination: bool) -> Checkpoint {
        let elapsed = fraction * self.duration_secs;
        Checkpoint {
            distance_km,
            fraction,
            coordinate: self.path[self.vertex],
            estimated_elapsed_secs: elapsed,
            estimated_arrival: self.departure + Duration::seconds(elapsed as i64),
            is_destination,
        }
    }
}

impl Iterator for CheckpointSampler<'_> {
    type Item = Checkpoint;

    fn next(&mut self) -> Option<Checkpoint> {
        while self.next_k <= self.max_k {
            let target_m = self.next_k as f64 * self.interval_m;
            if self.cumulative_m >= target_m {
                let fraction = (self.cumulative_m / self.total_m).clamp(0.0, 1.0);
                let cp = self.checkpoint(target_m / 1000.0, fraction, false);
                self.next_k += 1;
                return Some(cp);
            }
            if self.vertex + 1 >= self.path.len() {
                break;
            }
            self.advance();
        }

        if self.include_destination && !self.destination_done {
            self.destination_done = true;
            let last_mark_m = self.max_k as f64 * self.interval_m;
            if self.total_m > last_mark_m {
                while self.vertex + 1 < self.path.len() {
                    self.advance();
                }
                return Some(self.checkpoint(self.total_m / 1000.0, 1.0, true));
            }
        }

        None
    }
}
