//! Coordinate parsing from user-supplied strings.
//!
//! Right ascension accepts sexagesimal hours or decimal degrees:
//!
//! ```text
//! 12:34:56.7     12h34m56.7s     12 hours 34 minutes 56 seconds     188.736
//! ```
//!
//! Declination accepts sexagesimal degrees or decimal degrees:
//!
//! ```text
//! -45:30:15      -45d30m15s      -45d 30' 15"     -45.504
//! ```
//!
//! Signs are only valid at the beginning: `-12:34:56` works, `12:-34:56` does not.
//! Values are returned in degrees and are not range checked; the projector
//! wraps RA and clamps declination itself.

use crate::constants::DEGREES_PER_HOUR;
use crate::errors::{CoordError, CoordResult};
use once_cell::sync::Lazy;
use regex::Regex;

static HMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?xi)
        ^\s*
        ([+-])?                 # optional sign
        (\d{1,3})               # hours
        \s*[h:]\s*
        (\d{1,2})               # minutes
        \s*[m:']\s*
        (\d{1,2}(?:\.\d+)?)     # seconds
        \s*[s"]?
        \s*$
        "#,
    )
    .unwrap()
});

static DMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?xi)
        ^\s*
        ([+-])?                 # optional sign
        (\d{1,3})               # degrees
        \s*[d:]\s*
        (\d{1,2})               # arcminutes
        \s*[m:']\s*
        (\d{1,2}(?:\.\d+)?)     # arcseconds
        \s*(?:s|"|'')?
        \s*$
        "#,
    )
    .unwrap()
});

/// Parse hours-minutes-seconds into degrees (1h = 15°).
pub fn parse_hms(s: &str) -> CoordResult<f64> {
    let normalized = normalize_input(s);
    let caps = HMS_REGEX
        .captures(&normalized)
        .ok_or_else(|| CoordError::invalid_coordinate(s, "not in HMS format"))?;
    sexagesimal(&caps, s).map(|hours| hours * DEGREES_PER_HOUR)
}

/// Parse degrees-minutes-seconds into degrees.
pub fn parse_dms(s: &str) -> CoordResult<f64> {
    let normalized = normalize_input(s);
    let caps = DMS_REGEX
        .captures(&normalized)
        .ok_or_else(|| CoordError::invalid_coordinate(s, "not in DMS format"))?;
    sexagesimal(&caps, s)
}

/// Parse a right ascension: HMS first, then decimal degrees.
pub fn parse_ra(s: &str) -> CoordResult<f64> {
    parse_hms(s).or_else(|_| parse_decimal(s, "ra"))
}

/// Parse a declination: DMS first, then decimal degrees.
pub fn parse_dec(s: &str) -> CoordResult<f64> {
    parse_dms(s).or_else(|_| parse_decimal(s, "dec"))
}

fn parse_decimal(s: &str, name: &str) -> CoordResult<f64> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|_| CoordError::invalid_coordinate(s, format!("cannot parse {} as number", name)))?;
    if !value.is_finite() {
        return Err(CoordError::not_finite(name, value));
    }
    Ok(value)
}

fn sexagesimal(caps: &regex::Captures, original: &str) -> CoordResult<f64> {
    let sign = caps
        .get(1)
        .map_or(1.0, |m| if m.as_str() == "-" { -1.0 } else { 1.0 });
    let field = |i: usize| -> CoordResult<f64> {
        caps[i]
            .parse::<f64>()
            .map_err(|e| CoordError::invalid_coordinate(original, e.to_string()))
    };
    let whole = field(2)?;
    let minutes = field(3)?;
    let seconds = field(4)?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(CoordError::invalid_coordinate(
            original,
            "minutes and seconds must be below 60",
        ));
    }
    Ok(sign * (whole + minutes / 60.0 + seconds / 3600.0))
}

fn normalize_input(s: &str) -> String {
    let mut result = s.trim().to_lowercase();

    for (long, short) in [
        ("degrees", "d"),
        ("degree", "d"),
        ("deg", "d"),
        ("*", "d"),
        ("arcminutes", "m"),
        ("arcminute", "m"),
        ("arcmin", "m"),
        ("minutes", "m"),
        ("minute", "m"),
        ("min", "m"),
        ("arcseconds", "s"),
        ("arcsecond", "s"),
        ("arcsec", "s"),
        ("seconds", "s"),
        ("second", "s"),
        ("sec", "s"),
        ("hours", "h"),
        ("hour", "h"),
        ("hrs", "h"),
        ("hr", "h"),
    ] {
        result = result.replace(long, short);
    }

    result
}
