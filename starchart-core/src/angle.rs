//! Angle normalization and separation, in degrees.
//!
//! | Quantity | Range | Function |
//! |----------|-------|----------|
//! | Right ascension | [0, 360) | [`wrap_degrees`] |
//! | Declination | [-90, +90] | [`clamp_dec`] |
//!
//! RA wraps because 370° and 10° are the same direction. Declination clamps
//! because there is nothing past the pole; a request for dec 95° is treated
//! as a glitch upstream and pinned to 90°.

use crate::constants::{DEG_TO_RAD, FULL_CIRCLE_DEG, RAD_TO_DEG};

/// Wraps an angle in degrees to [0, 360).
///
/// `rem_euclid` can round a tiny negative input up to exactly 360.0, which is
/// folded back to 0.0.
#[inline]
pub fn wrap_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(FULL_CIRCLE_DEG);
    if w >= FULL_CIRCLE_DEG {
        0.0
    } else {
        w
    }
}

/// Clamps a declination in degrees to [-90, +90].
#[inline]
pub fn clamp_dec(deg: f64) -> f64 {
    deg.clamp(-90.0, 90.0)
}

#[inline]
pub fn vincenty_angular_separation(
    sin_lat1: f64,
    cos_lat1: f64,
    sin_lat2: f64,
    cos_lat2: f64,
    delta_lon: f64,
) -> f64 {
    let (sin_delta_lon, cos_delta_lon) = libm::sincos(delta_lon);

    let num = libm::sqrt(
        (cos_lat2 * sin_delta_lon).powi(2)
            + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    libm::atan2(num, den)
}

/// Great-circle distance between two sky positions, all in degrees.
///
/// Uses the Vincenty form, which stays accurate for both tiny separations
/// (a zoomed chart) and near-antipodal ones (a 270° view).
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (sin_d1, cos_d1) = libm::sincos(dec1 * DEG_TO_RAD);
    let (sin_d2, cos_d2) = libm::sincos(dec2 * DEG_TO_RAD);
    let delta = (ra2 - ra1) * DEG_TO_RAD;
    vincenty_angular_separation(sin_d1, cos_d1, sin_d2, cos_d2, delta) * RAD_TO_DEG
}
