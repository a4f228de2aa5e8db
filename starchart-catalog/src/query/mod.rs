//! Read side of the catalog.
//!
//! - [`profile`]: the view-width ladder that picks tier, magnitude cutoff and star sizing
//! - [`cone`]: cone search over one tier and [`find_stars`] for chart requests

pub mod cone;
pub mod profile;

pub use cone::{cone_search, find_stars, ConeSearchParams, ConeSearchResult, PrePoint, StarField};
pub use profile::{select, ViewProfile, VIEW_PROFILES};
