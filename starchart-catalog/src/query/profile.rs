//! Field-of-view ladder: which tier to search, how deep, and how to size stars.
//!
//! Wide views read the coarse bright tier with a low magnitude limit; narrow
//! views read the full tier with a progressively fainter limit. The ladder is
//! a fixed table ordered by descending threshold and the selected entry is
//! the first whose threshold is at or below the requested view.

use crate::store::CatalogTier;
use serde::Serialize;

/// One rung of the view ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewProfile {
    /// Smallest view width (degrees) this entry applies to.
    pub min_view_deg: f64,
    pub tier: CatalogTier,
    /// Magnitude that sets the size scale, and the query cutoff unless `catch_all`.
    pub magnitude_limit: f64,
    /// Last rung: queries the full tier with no magnitude cutoff.
    pub catch_all: bool,
}

impl ViewProfile {
    const fn new(min_view_deg: f64, tier: CatalogTier, magnitude_limit: f64) -> Self {
        Self {
            min_view_deg,
            tier,
            magnitude_limit,
            catch_all: false,
        }
    }

    pub fn size_scale(&self) -> f64 {
        0.0505 * self.magnitude_limit - 1.2726
    }

    pub fn size_offset(&self) -> f64 {
        0.3667 * self.magnitude_limit + 3.6543
    }

    /// Drawn diameter of an object of magnitude `mag` under this profile.
    pub fn diameter(&self, mag: f64) -> f64 {
        self.size_scale() * mag + self.size_offset()
    }

    /// Exclusive magnitude bound passed to the store.
    pub fn query_limit(&self) -> f64 {
        if self.catch_all {
            f64::INFINITY
        } else {
            self.magnitude_limit
        }
    }
}

pub static VIEW_PROFILES: [ViewProfile; 16] = [
    ViewProfile::new(110.0, CatalogTier::Bright, 4.0),
    ViewProfile::new(60.0, CatalogTier::Bright, 5.0),
    ViewProfile::new(40.0, CatalogTier::Bright, 6.0),
    ViewProfile::new(25.0, CatalogTier::Mid, 7.0),
    ViewProfile::new(15.0, CatalogTier::Mid, 8.0),
    ViewProfile::new(5.0, CatalogTier::Mid, 9.0),
    ViewProfile::new(3.0, CatalogTier::Full, 10.0),
    ViewProfile::new(2.0, CatalogTier::Full, 11.0),
    ViewProfile::new(1.5, CatalogTier::Full, 12.0),
    ViewProfile::new(1.0, CatalogTier::Full, 13.0),
    ViewProfile::new(0.7, CatalogTier::Full, 13.5),
    ViewProfile::new(0.6, CatalogTier::Full, 13.9),
    ViewProfile::new(0.5, CatalogTier::Full, 14.3),
    ViewProfile::new(0.4, CatalogTier::Full, 14.6),
    ViewProfile::new(0.3, CatalogTier::Full, 14.8),
    ViewProfile {
        min_view_deg: 0.0,
        tier: CatalogTier::Full,
        magnitude_limit: 15.0,
        catch_all: true,
    },
];

/// Pick the profile for a view width in degrees.
///
/// Non-positive and NaN widths land on the catch-all entry.
pub fn select(view_deg: f64) -> &'static ViewProfile {
    let last = &VIEW_PROFILES[VIEW_PROFILES.len() - 1];
    VIEW_PROFILES
        .iter()
        .find(|p| view_deg >= p.min_view_deg)
        .unwrap_or(last)
}
