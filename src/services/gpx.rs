//! GPX export of an analysed trip.
//!
//! Writes a GPX 1.1 document with:
//! - `<metadata>`: trip name (start → end) and departure time
//! - one `<wpt>` per checkpoint, named `KM <n> <place>`, with risk in `<desc>`
//!   and `rr:` extensions (distance, score, tier)
//! - a single `<trk>` carrying the decoded route path

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use thiserror::Error;

use crate::services::trip::{AnalyzedCheckpoint, TripAnalysis};

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const RR_NAMESPACE: &str = "https://github.com/road-risk/road-risk-api/gpx";

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("IO error writing GPX: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("GPX output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serialize the analysis as a GPX document.
pub fn write_gpx(analysis: &TripAnalysis) -> Result<String, GpxError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("gpx").with_attributes([
        ("xmlns", GPX_NAMESPACE),
        ("xmlns:rr", RR_NAMESPACE),
        ("version", "1.1"),
        ("creator", concat!("road-risk-api ", env!("CARGO_PKG_VERSION"))),
    ])))?;

    let trip_name = format!(
        "{} → {}",
        analysis.route.start_address, analysis.route.end_address
    );

    writer.write_event(Event::Start(BytesStart::new("metadata")))?;
    write_text_element(&mut writer, "name", &trip_name)?;
    write_text_element(&mut writer, "desc", &analysis.summary())?;
    write_text_element(&mut writer, "time", &analysis.departure.to_rfc3339())?;
    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    for cp in &analysis.checkpoints {
        write_waypoint(&mut writer, cp)?;
    }

    writer.write_event(Event::Start(BytesStart::new("trk")))?;
    write_text_element(&mut writer, "name", &trip_name)?;
    writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
    for point in &analysis.route.path {
        let lat = format!("{:.5}", point.lat);
        let lon = format!("{:.5}", point.lon);
        writer.write_event(Event::Empty(
            BytesStart::new("trkpt").with_attributes([("lat", lat.as_str()), ("lon", lon.as_str())]),
        ))?;
    }
    writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
    writer.write_event(Event::End(BytesEnd::new("trk")))?;

    writer.write_event(Event::End(BytesEnd::new("gpx")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_waypoint<W: Write>(
    writer: &mut Writer<W>,
    cp: &AnalyzedCheckpoint,
) -> Result<(), GpxError> {
    let lat = format!("{:.5}", cp.checkpoint.coordinate.lat);
    let lon = format!("{:.5}", cp.checkpoint.coordinate.lon);
    writer.write_event(Event::Start(
        BytesStart::new("wpt").with_attributes([("lat", lat.as_str()), ("lon", lon.as_str())]),
    ))?;

    // GPX 1.1 requires ele before time, time before name
    if let Some(ele) = cp.bundle.elevation_m.filter(|e| e.is_finite()) {
        write_text_element(writer, "ele", &format!("{:.0}", ele))?;
    }
    write_text_element(writer, "time", &cp.arrival.to_rfc3339())?;
    write_text_element(
        writer,
        "name",
        &format!("KM {:.0} {}", cp.checkpoint.distance_km, cp.place()),
    )?;
    write_text_element(
        writer,
        "desc",
        &format!(
            "Risk {}: {}",
            cp.assessment.status_text(),
            cp.assessment.reason_labels()
        ),
    )?;
    write_text_element(writer, "type", "checkpoint")?;

    writer.write_event(Event::Start(BytesStart::new("extensions")))?;
    write_text_element(
        writer,
        "rr:distance_km",
        &format!("{:.1}", cp.checkpoint.distance_km),
    )?;
    write_text_element(writer, "rr:risk_score", &cp.assessment.score.to_string())?;
    write_text_element(
        writer,
        "rr:risk_tier",
        &format!("{:?}", cp.assessment.tier).to_lowercase(),
    )?;
    writer.write_event(Event::End(BytesEnd::new("extensions")))?;

    writer.write_event(Event::End(BytesEnd::new("wpt")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), GpxError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
