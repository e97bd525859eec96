//! Encoded polyline codec (Google "Encoded Polyline Algorithm Format").
//!
//! Coordinates are stored as zig-zag encoded deltas of `value * 1e5`, split
//! into 5-bit chunks offset by 63 into printable ASCII.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Fixed-point factor for precision 5 (the directions API's precision).
const PRECISION_FACTOR: f64 = 1e5;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("invalid polyline byte {byte:#04x} at position {position}")]
    InvalidByte { byte: u8, position: usize },
    #[error("polyline truncated at position {0}")]
    Truncated(usize),
}

/// Decode an encoded polyline into coordinates.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut position = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while position < bytes.len() {
        let (dlat, next) = decode_value(bytes, position)?;
        let (dlon, next) = decode_value(bytes, next)?;
        position = next;

        lat += dlat;
        lon += dlon;
        coordinates.push(Coordinate::new(
            lat as f64 / PRECISION_FACTOR,
            lon as f64 / PRECISION_FACTOR,
        ));
    }

    Ok(coordinates)
}

/// Read one zig-zag varint starting at `start`; returns the value and the next position.
fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    let mut position = start;

    loop {
        let byte = *bytes.get(position).ok_or(PolylineError::Truncated(position))?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(PolylineError::InvalidByte { byte, position });
        }
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        position += 1;
        if chunk < 0x20 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((value, position))
}

/// Encode coordinates as a polyline at precision 5.
pub fn encode(coordinates: &[Coordinate]) -> String {
    let mut out = String::with_capacity(coordinates.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for coord in coordinates {
        let lat = (coord.lat * PRECISION_FACTOR).round() as i64;
        let lon = (coord.lon * PRECISION_FACTOR).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}
