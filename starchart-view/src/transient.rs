//! Planet positions interpolated from the hourly sample table.
//!
//! An external job writes one sample per body per hour, stamped at HH:30
//! UTC. For an instant `t` the two bracketing samples are
//! `t_minus ≤ t < t_plus`, one hour apart, and the position is linear in
//! between. RA is interpolated the short way around: a 359° → 1° step
//! passes through 0°, not 180°.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use starchart_catalog::PrePoint;
use starchart_core::wrap_degrees;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::config::BodyMagnitude;
use crate::error::{ChartError, ChartResult};

const MS_PER_HOUR: i64 = 3_600_000;
const SAMPLE_MINUTE_MS: i64 = 30 * 60_000;
/// Bodies drawn smaller than this are left off the chart.
pub const MIN_BODY_DIAMETER: f64 = 0.1;

/// Source of sampled body positions.
pub trait BodyPositions {
    /// (RA, Dec) in degrees of `body` at exactly `at`, if a sample exists.
    fn position(&self, body: &str, at: DateTime<Utc>) -> Option<(f64, f64)>;
}

/// The two samples around an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub minus: DateTime<Utc>,
    pub plus: DateTime<Utc>,
    /// Milliseconds from `minus` to the requested instant.
    pub offset_ms: i64,
}

impl Bracket {
    pub fn around(at: DateTime<Utc>) -> Self {
        let t = at.timestamp_millis();
        let anchor = t.div_euclid(MS_PER_HOUR) * MS_PER_HOUR + SAMPLE_MINUTE_MS;
        let minus = if anchor > t { anchor - MS_PER_HOUR } else { anchor };
        let sub_ms = (at.timestamp_subsec_nanos() % 1_000_000) as i64;
        let minus_at = at
            - chrono::Duration::milliseconds(t - minus)
            - chrono::Duration::nanoseconds(sub_ms);
        Self {
            minus: minus_at,
            plus: minus_at + chrono::Duration::milliseconds(MS_PER_HOUR),
            offset_ms: t - minus,
        }
    }

    /// Interpolation fraction in [0, 1).
    pub fn fraction(&self) -> f64 {
        self.offset_ms as f64 / MS_PER_HOUR as f64
    }
}

/// Linear RA interpolation across the 0/360 seam, result in [0, 360).
pub fn interpolate_ra(ra_minus: f64, ra_plus: f64, fraction: f64) -> f64 {
    let (mut ra_minus, mut ra_plus) = (ra_minus, ra_plus);
    let span = ra_plus - ra_minus;
    if span.abs() >= 180.0 {
        if span > 0.0 {
            ra_plus -= 360.0;
        } else {
            ra_minus -= 360.0;
        }
    }
    wrap_degrees(ra_minus + (ra_plus - ra_minus) * fraction)
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    timestamp: String,
    name: String,
    ra: f64,
    dec: f64,
}

/// In-memory copy of the sample table, keyed by lower-case body name and
/// sample time.
#[derive(Debug, Clone, Default)]
pub struct TransientTable {
    samples: HashMap<(String, i64), (f64, f64)>,
}

impl TransientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a CSV table with a `timestamp,name,ra,dec` header.
    pub fn load(path: impl AsRef<Path>) -> ChartResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| ChartError::transient_table(path, e.to_string()))?;
        let table = Self::from_reader(file)
            .map_err(|message| ChartError::transient_table(path, message))?;
        info!(path = %path.display(), samples = table.len(), "loaded transient body table");
        Ok(table)
    }

    /// Parse CSV from any reader; the error is a human-readable message.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, String> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut table = Self::new();
        for (index, row) in rdr.deserialize::<SampleRow>().enumerate() {
            let row = row.map_err(|e| format!("row {}: {}", index + 1, e))?;
            let at = parse_timestamp(&row.timestamp)
                .ok_or_else(|| format!("row {}: bad timestamp '{}'", index + 1, row.timestamp))?;
            table.insert(&row.name, at, row.ra, row.dec);
        }
        Ok(table)
    }

    /// Add or replace one sample.
    pub fn insert(&mut self, body: &str, at: DateTime<Utc>, ra: f64, dec: f64) {
        self.samples
            .insert((body.to_lowercase(), at.timestamp()), (ra, dec));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl BodyPositions for TransientTable {
    fn position(&self, body: &str, at: DateTime<Utc>) -> Option<(f64, f64)> {
        self.samples
            .get(&(body.to_lowercase(), at.timestamp()))
            .copied()
    }
}

/// Turns sampled positions into sized, not yet projected, chart points.
#[derive(Debug, Clone)]
pub struct BodyInterpolator<P> {
    source: P,
    bodies: Vec<BodyMagnitude>,
    max_diameter: f64,
}

impl<P: BodyPositions> BodyInterpolator<P> {
    pub fn new(source: P, bodies: Vec<BodyMagnitude>, max_diameter: f64) -> Self {
        Self {
            source,
            bodies,
            max_diameter,
        }
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    /// Bodies whose interpolated Dec lies within `view_deg / 2` of
    /// `dec_center`, sized with the star scale/offset and capped at the
    /// maximum diameter.
    ///
    /// # Arguments
    /// * `at` - Instant to interpolate to
    /// * `dec_center` - Declination of the chart center in degrees
    /// * `view_deg` - Chart width in degrees
    /// * `size_scale`, `size_offset` - Star sizing of the selected view profile
    ///
    /// # Returns
    /// Unprojected points. Bodies lacking either sample, drawn smaller than
    /// [`MIN_BODY_DIAMETER`], or outside the band (including a NaN band) are
    /// left out.
    pub fn positions_at(
        &self,
        at: DateTime<Utc>,
        dec_center: f64,
        view_deg: f64,
        size_scale: f64,
        size_offset: f64,
    ) -> Vec<PrePoint> {
        let max_dec = dec_center + view_deg / 2.0;
        let min_dec = dec_center - view_deg / 2.0;
        let bracket = Bracket::around(at);
        let f = bracket.fraction();

        let mut points = Vec::new();
        for body in &self.bodies {
            let diameter = (size_scale * body.magnitude + size_offset).min(self.max_diameter);
            if diameter < MIN_BODY_DIAMETER {
                continue;
            }
            let (Some((ra_m, dec_m)), Some((ra_p, dec_p))) = (
                self.source.position(&body.name, bracket.minus),
                self.source.position(&body.name, bracket.plus),
            ) else {
                debug!(body = %body.name, at = %at, "no bracketing samples");
                continue;
            };

            let dec = dec_m + (dec_p - dec_m) * f;
            if !(min_dec..=max_dec).contains(&dec) {
                continue;
            }
            points.push(PrePoint {
                diameter,
                ra: interpolate_ra(ra_m, ra_p, f),
                dec,
            });
        }
        points
    }
}
