//! Error type for coordinate input.
//!
//! Chart requests arrive with right ascension and declination as strings typed
//! by a person. Out-of-range numbers are clamped further down the pipeline, so
//! the only thing that is rejected outright is text that is not a coordinate
//! at all.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Input text is not an angle in any accepted notation.
    #[error("Invalid coordinate '{input}': {message}")]
    InvalidCoordinate { input: String, message: String },

    /// A numeric value that cannot be clamped into range (NaN or infinite).
    #[error("Coordinate {name} is not finite: {value}")]
    NotFinite { name: String, value: f64 },
}

pub type CoordResult<T> = Result<T, CoordError>;

impl CoordError {
    pub fn invalid_coordinate(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn not_finite(name: impl Into<String>, value: f64) -> Self {
        Self::NotFinite {
            name: name.into(),
            value,
        }
    }
}
