//! Constellation stick figures.
//!
//! An edge is considered only if both endpoints have RA in [0, 360] and Dec
//! inside the chart's declination band; it is then kept only if both
//! projected endpoints land on the chart disc. RA is not pre-filtered, the
//! disc test takes care of edges on the far side of the sky.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::{ChartError, ChartResult};
use crate::projection::Projector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstellationEdge {
    pub ra1: f64,
    pub dec1: f64,
    pub ra2: f64,
    pub dec2: f64,
}

/// A projected edge in chart units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

pub fn load_lines(path: impl AsRef<Path>) -> ChartResult<Vec<ConstellationEdge>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ChartError::lines(path, e.to_string()))?;
    let edges = read_lines(file).map_err(|e| ChartError::lines(path, e.to_string()))?;
    info!(path = %path.display(), edges = edges.len(), "loaded constellation lines");
    Ok(edges)
}

/// Headerless `ra1,dec1,ra2,dec2` rows, degrees.
pub fn read_lines<R: Read>(reader: R) -> Result<Vec<ConstellationEdge>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect()
}

fn ra_in_range(ra: f64) -> bool {
    (0.0..=360.0).contains(&ra)
}

pub fn project_lines(edges: &[ConstellationEdge], projector: &Projector) -> Vec<ChartLine> {
    let (min_dec, max_dec) = projector.dec_band();
    let in_band = |dec: f64| dec >= min_dec && dec <= max_dec;

    edges
        .iter()
        .filter(|e| ra_in_range(e.ra1) && ra_in_range(e.ra2))
        .filter(|e| in_band(e.dec1) && in_band(e.dec2))
        .filter_map(|e| {
            let (x1, y1) = projector.project(e.ra1, e.dec1)?;
            let (x2, y2) = projector.project(e.ra2, e.dec2)?;
            Some(ChartLine { x1, y1, x2, y2 })
        })
        .collect()
}
