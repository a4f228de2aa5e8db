//! Finder-chart field rendering.
//!
//! Takes a chart center, a view width and an instant, and produces what a
//! front end needs to draw the chart: star and planet discs and constellation
//! line segments, all in chart units on a 500-unit disc. No pixels are drawn
//! here.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`projection`] | [`Projector`]: stereographic projection and disc clipping |
//! | [`transient`] | Hourly planet table, bracketing and RA-seam interpolation |
//! | [`lines`] | Constellation edges and their projection |
//! | [`config`] | [`ChartConfig`] JSON loading and validation |
//! | [`field`] | [`FinderChart::render_field`] |
//!
//! ```ignore
//! use starchart_view::{ChartConfig, FinderChart};
//!
//! let config = ChartConfig::load("chart.json")?;
//! let chart = FinderChart::open(&config)?;
//! let field = chart.render_field(83.82, -5.39, 20.0, chrono::Utc::now())?;
//! println!("{} stars, {} planets", field.stars.len(), field.planets.len());
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod lines;
pub mod projection;
pub mod transient;

pub use config::{BodyMagnitude, ChartConfig, Observatory};
pub use error::{ChartError, ChartResult};
pub use field::{ChartField, FinderChart};
pub use lines::{ChartLine, ConstellationEdge};
pub use projection::{project, ChartPoint, Projector};
pub use transient::{interpolate_ra, BodyInterpolator, BodyPositions, TransientTable};
