//! One chart request, end to end.
//!
//! [`FinderChart`] holds everything static (the three tiers, the planet
//! table, the constellation edges) and [`FinderChart::render_field`] turns
//! a center, a view width and an instant into projected stars, planets and
//! lines. Rendering is read-only, so one `FinderChart` can serve concurrent
//! requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use starchart_catalog::{find_stars, CatalogSet};
use starchart_core::{clamp_dec, CoordError};
use tracing::debug;

use crate::config::ChartConfig;
use crate::error::ChartResult;
use crate::lines::{load_lines, project_lines, ChartLine, ConstellationEdge};
use crate::projection::{ChartPoint, Projector};
use crate::transient::{BodyInterpolator, TransientTable};

/// Everything drawn on one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartField {
    pub stars: Vec<ChartPoint>,
    pub planets: Vec<ChartPoint>,
    pub lines: Vec<ChartLine>,
}

pub struct FinderChart {
    catalogs: CatalogSet,
    bodies: Option<BodyInterpolator<TransientTable>>,
    edges: Vec<ConstellationEdge>,
    min_line_view_deg: f64,
}

impl FinderChart {
    /// Open the tier files and load the optional tables named in `config`.
    ///
    /// A missing or corrupt tier is reported as
    /// [`CatalogError::CatalogUnavailable`](starchart_catalog::CatalogError).
    pub fn open(config: &ChartConfig) -> ChartResult<Self> {
        let catalogs = CatalogSet::open(&config.catalog_dir)?;
        let table = config
            .transient_table
            .as_ref()
            .map(TransientTable::load)
            .transpose()?;
        let edges = match &config.constellation_lines {
            Some(path) => load_lines(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(config, catalogs, table, edges))
    }

    /// Assemble from already-loaded parts.
    pub fn new(
        config: &ChartConfig,
        catalogs: CatalogSet,
        table: Option<TransientTable>,
        edges: Vec<ConstellationEdge>,
    ) -> Self {
        let bodies = table.map(|t| {
            BodyInterpolator::new(t, config.bodies.clone(), config.max_body_diameter)
        });
        Self {
            catalogs,
            bodies,
            edges,
            min_line_view_deg: config.min_line_view_deg,
        }
    }

    pub fn catalogs(&self) -> &CatalogSet {
        &self.catalogs
    }

    /// Stars, planets and lines for a `view_deg`-wide chart centered on
    /// (`center_ra`, `center_dec`) at instant `at`.
    ///
    /// Out-of-range RA, Dec and view are wrapped or clamped. Only non-finite
    /// center coordinates or view widths are rejected.
    pub fn render_field(
        &self,
        center_ra: f64,
        center_dec: f64,
        view_deg: f64,
        at: DateTime<Utc>,
    ) -> ChartResult<ChartField> {
        if !center_ra.is_finite() {
            return Err(CoordError::not_finite("center RA", center_ra).into());
        }
        if !center_dec.is_finite() {
            return Err(CoordError::not_finite("center Dec", center_dec).into());
        }
        if !view_deg.is_finite() {
            return Err(CoordError::not_finite("view width", view_deg).into());
        }

        let projector = Projector::new(center_ra, center_dec, view_deg);
        let star_field = find_stars(&self.catalogs, center_ra, center_dec, view_deg);
        let stars = projector.project_points(&star_field.points);

        let planets = match &self.bodies {
            Some(bodies) => projector.project_points(&bodies.positions_at(
                at,
                clamp_dec(center_dec),
                view_deg,
                star_field.size_scale(),
                star_field.size_offset(),
            )),
            None => Vec::new(),
        };

        let lines = if view_deg > self.min_line_view_deg {
            project_lines(&self.edges, &projector)
        } else {
            Vec::new()
        };

        debug!(
            candidates = star_field.points.len(),
            stars = stars.len(),
            planets = planets.len(),
            lines = lines.len(),
            "rendered field"
        );
        Ok(ChartField {
            stars,
            planets,
            lines,
        })
    }
}
