pub mod daylight;
pub mod enrich;
pub mod google;
pub mod gpx;
pub mod polyline;
pub mod risk;
pub mod sampler;
pub mod table;
pub mod trip;
pub mod yr;
