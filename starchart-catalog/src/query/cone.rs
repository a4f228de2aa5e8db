//! Cone search over one tier, and the star half of a chart request.
//!
//! [`cone_search`] enumerates the cells that may overlap the cone, reads
//! those cells from the tier (which stops at the magnitude cutoff), then
//! drops every candidate that lies outside the true angular radius. Cells are
//! coarse, so that last step is what keeps out-of-field stars from reaching
//! the projector.
//!
//! [`find_stars`] wraps this for chart requests: pick the view profile, search
//! half the view width, and size each star by its magnitude.

use serde::Serialize;
use starchart_core::{angular_separation_deg, clamp_dec, wrap_degrees};
use tracing::debug;

use super::profile::{select, ViewProfile};
use crate::store::{CatalogSet, StoredStar, TierCatalog};
use crate::tiling::cells_in_radius;

/// Parameters for a cone search query.
#[derive(Debug, Clone)]
pub struct ConeSearchParams {
    /// Cone center right ascension, in degrees.
    pub ra_deg: f64,
    /// Cone center declination, in degrees.
    pub dec_deg: f64,
    /// Search radius, in degrees.
    pub radius_deg: f64,
    /// If set, exclude stars at or fainter than this magnitude.
    pub max_mag: Option<f64>,
    /// If set, return at most this many results (closest first).
    pub max_results: Option<usize>,
}

impl ConeSearchParams {
    pub fn new(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Self {
        Self {
            ra_deg,
            dec_deg,
            radius_deg,
            max_mag: None,
            max_results: None,
        }
    }
}

/// A single star returned from a cone search.
#[derive(Debug, Clone)]
pub struct ConeSearchResult {
    pub star: StoredStar,
    /// Angular distance from the search center, in degrees.
    pub distance_deg: f64,
}

/// Search for stars within a cone on the sky, nearest first.
pub fn cone_search(catalog: &TierCatalog, params: &ConeSearchParams) -> Vec<ConeSearchResult> {
    let ra = wrap_degrees(params.ra_deg);
    let dec = clamp_dec(params.dec_deg);
    let radius = params.radius_deg.max(0.0);

    let cells = cells_in_radius(ra, dec, radius, catalog.tier().resolution());
    let candidates = catalog.query(&cells, params.max_mag.unwrap_or(f64::INFINITY));
    debug!(
        tier = %catalog.tier(),
        cells = cells.len(),
        candidates = candidates.len(),
        "cone search"
    );

    let mut results: Vec<ConeSearchResult> = candidates
        .into_iter()
        .filter_map(|star| {
            let distance_deg = angular_separation_deg(ra, dec, star.ra, star.dec);
            (distance_deg <= radius).then_some(ConeSearchResult { star, distance_deg })
        })
        .collect();

    results.sort_by(|a, b| a.distance_deg.total_cmp(&b.distance_deg));

    if let Some(max_results) = params.max_results {
        results.truncate(max_results);
    }

    results
}

/// A sized object still in sky coordinates, waiting for projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrePoint {
    pub diameter: f64,
    pub ra: f64,
    pub dec: f64,
}

/// Stars for one chart request plus the sizing they were drawn with.
#[derive(Debug, Clone)]
pub struct StarField {
    pub profile: &'static ViewProfile,
    pub points: Vec<PrePoint>,
}

impl StarField {
    pub fn size_scale(&self) -> f64 {
        self.profile.size_scale()
    }

    pub fn size_offset(&self) -> f64 {
        self.profile.size_offset()
    }
}

/// Stars inside a `view_deg`-wide field centered on (`ra`, `dec`).
///
/// # Arguments
/// * `catalogs` - The three opened tiers
/// * `ra` - Field center right ascension in degrees
/// * `dec` - Field center declination in degrees
/// * `view_deg` - Field width in degrees; picks the tier and magnitude limit
///
/// # Returns
/// Sized, unprojected points plus the [`ViewProfile`] that produced them.
/// The tier's magnitude boundary is the only brightness filter applied.
pub fn find_stars(catalogs: &CatalogSet, ra: f64, dec: f64, view_deg: f64) -> StarField {
    let profile = select(view_deg);
    debug!(
        view_deg,
        tier = %profile.tier,
        limit = profile.query_limit(),
        "selected view profile"
    );

    let params = ConeSearchParams {
        max_mag: Some(profile.query_limit()),
        ..ConeSearchParams::new(ra, dec, view_deg / 2.0)
    };
    let points = cone_search(catalogs.get(profile.tier), &params)
        .into_iter()
        .map(|r| PrePoint {
            diameter: profile.diameter(r.star.mag as f64),
            ra: r.star.ra,
            dec: r.star.dec,
        })
        .collect();

    StarField { profile, points }
}
