//! Stereographic sky-to-chart projection and viewport clipping.
//!
//! The chart is a disc of radius 250 units centered on the requested
//! position; `scale = 500 / view` (view in radians), so a field `view` wide
//! spans roughly the full 500-unit diameter.
//!
//! For a target at (α, δ) and center (α₀, δ₀), with Δα = α − α₀:
//!
//! ```text
//! x' = cos δ · sin Δα
//! y' = sin δ · cos δ₀ − cos δ · cos Δα · sin δ₀
//! z' = sin δ · sin δ₀ + cos δ · cos δ₀ · cos Δα
//! d  = 2 / (z' + 1)                          z' ≥ −0.9
//! d  = 20 · √(0.19 / (1.00001 − z'²))        z' < −0.9
//! x  = x' · d · scale,   y = y' · d · scale
//! ```
//!
//! The second branch keeps `d` finite near the anti-center, where
//! `2 / (z' + 1)` diverges.

use serde::Serialize;
use starchart_catalog::PrePoint;
use starchart_core::constants::DEG_TO_RAD;
use starchart_core::{clamp_dec, wrap_degrees};

/// Radius of the chart disc in chart units.
pub const CHART_RADIUS: f64 = 250.0;
const CHART_RADIUS_SQ: f64 = CHART_RADIUS * CHART_RADIUS;

const MIN_VIEW_DEG: f64 = 0.000001;
const FALLBACK_VIEW_DEG: f64 = 0.00001;
const MAX_VIEW_DEG: f64 = 270.0;
const ANTI_CENTER_Z: f64 = -0.9;

/// A projected star or planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub diameter: f64,
    pub x: f64,
    pub y: f64,
}

/// View width actually used for scaling: tiny, negative and NaN widths
/// become 1e-5°, and anything wider than 270° is capped.
pub fn effective_view(view_deg: f64) -> f64 {
    if view_deg >= MIN_VIEW_DEG {
        view_deg.min(MAX_VIEW_DEG)
    } else {
        FALLBACK_VIEW_DEG
    }
}

/// Projection for one chart center and view width.
///
/// The trigonometry of the center is computed once, so projecting a batch
/// is a tight loop over the points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    center_ra_deg: f64,
    center_dec_deg: f64,
    view_deg: f64,
    ra0: f64,
    sin_dec0: f64,
    cos_dec0: f64,
    scale: f64,
}

impl Projector {
    /// Center RA is wrapped, center Dec clamped and the view passed
    /// through [`effective_view`].
    pub fn new(center_ra_deg: f64, center_dec_deg: f64, view_deg: f64) -> Self {
        let center_ra_deg = wrap_degrees(center_ra_deg);
        let center_dec_deg = clamp_dec(center_dec_deg);
        let view_deg = effective_view(view_deg);
        let dec0 = center_dec_deg * DEG_TO_RAD;
        Self {
            center_ra_deg,
            center_dec_deg,
            view_deg,
            ra0: center_ra_deg * DEG_TO_RAD,
            sin_dec0: libm::sin(dec0),
            cos_dec0: libm::cos(dec0),
            scale: 500.0 / (view_deg * DEG_TO_RAD),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_ra_deg, self.center_dec_deg)
    }

    pub fn view_deg(&self) -> f64 {
        self.view_deg
    }

    /// Chart units per radian at the center.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Declination band `[center − view/2, center + view/2]`, clamped to the poles.
    pub fn dec_band(&self) -> (f64, f64) {
        let half = self.view_deg / 2.0;
        (
            clamp_dec(self.center_dec_deg - half),
            clamp_dec(self.center_dec_deg + half),
        )
    }

    /// Chart coordinates of (`ra_deg`, `dec_deg`), or `None` outside the disc.
    pub fn project(&self, ra_deg: f64, dec_deg: f64) -> Option<(f64, f64)> {
        let dec = clamp_dec(dec_deg) * DEG_TO_RAD;
        let delta_ra = ra_deg * DEG_TO_RAD - self.ra0;

        let (sin_dec, cos_dec) = (libm::sin(dec), libm::cos(dec));
        let (sin_dra, cos_dra) = (libm::sin(delta_ra), libm::cos(delta_ra));

        let xp = cos_dec * sin_dra;
        let yp = sin_dec * self.cos_dec0 - cos_dec * cos_dra * self.sin_dec0;
        let zp = sin_dec * self.sin_dec0 + cos_dec * self.cos_dec0 * cos_dra;

        let d = if zp < ANTI_CENTER_Z {
            20.0 * libm::sqrt((1.0 - 0.81) / (1.00001 - zp * zp))
        } else {
            2.0 / (zp + 1.0)
        };

        let x = xp * d * self.scale;
        let y = yp * d * self.scale;

        // negated so NaN is rejected too
        if !(x * x + y * y <= CHART_RADIUS_SQ) {
            return None;
        }
        Some((x, y))
    }

    pub fn project_point(&self, point: &PrePoint) -> Option<ChartPoint> {
        self.project(point.ra, point.dec).map(|(x, y)| ChartPoint {
            diameter: point.diameter,
            x,
            y,
        })
    }

    /// Project a batch, dropping everything outside the disc.
    pub fn project_points(&self, points: &[PrePoint]) -> Vec<ChartPoint> {
        points.iter().filter_map(|p| self.project_point(p)).collect()
    }
}

/// One-off projection of a single position.
pub fn project(
    ra_deg: f64,
    dec_deg: f64,
    center_ra_deg: f64,
    center_dec_deg: f64,
    view_deg: f64,
) -> Option<(f64, f64)> {
    Projector::new(center_ra_deg, center_dec_deg, view_deg).project(ra_deg, dec_deg)
}
