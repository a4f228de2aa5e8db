//! Shared angle handling for the starchart crates.
//!
//! Everything here works in degrees at the API surface, because the catalog
//! files, the transient-body table and the chart requests all carry degrees.
//! Radians only appear inside the trigonometry.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`angle`] | RA wrapping, declination clamping, angular separation |
//! | [`parse`] | HMS / DMS / decimal coordinate strings |
//! | [`constants`] | π multiples and unit conversions |
//! | [`errors`] | [`CoordError`] |

pub mod angle;
pub mod constants;
pub mod errors;
pub mod parse;

pub use angle::{angular_separation_deg, clamp_dec, wrap_degrees};
pub use errors::{CoordError, CoordResult};
pub use parse::{parse_dec, parse_dms, parse_hms, parse_ra};
