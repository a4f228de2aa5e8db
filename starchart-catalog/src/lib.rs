//! Tiered, HEALPix-indexed star catalog for finder charts.
//!
//! The source is the Guide Star Catalog 1.2 distribution: a tree of region
//! files, each an ASCII header followed by bit-packed 12-byte records. The
//! builder turns that tree into three memory-mapped tier files with coarser
//! cells and shallower magnitude cuts for wider views, so a chart query
//! never scans more than its zoom level needs.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`gsc`] | Region file decoder ([`GscReader`](gsc::GscReader), [`StarRecord`](gsc::StarRecord)) |
//! | [`tiling`] | Nested HEALPix cells at 48 / 192 / 768, cone cell enumeration |
//! | [`store`] | Tier file format, [`TierCatalog`](store::TierCatalog), [`CatalogSet`](store::CatalogSet) |
//! | [`builder`] | [`build_catalogs`](builder::build_catalogs): parallel decode, count/scatter/sort index |
//! | [`query`] | View profiles, [`cone_search`](query::cone_search), [`find_stars`](query::find_stars) |
//!
//! # Quick Start
//!
//! ```ignore
//! use starchart_catalog::{build_catalogs, find_stars};
//!
//! let catalogs = build_catalogs("/data/gsc", "/data/starchart")?;
//! let field = find_stars(&catalogs, 83.633, -5.375, 20.0);
//! for p in &field.points {
//!     println!("{:.4} {:.4} d={:.2}", p.ra, p.dec, p.diameter);
//! }
//! ```
//!
//! # Features
//!
//! - **`cli`**: enables the `forge` and `query-catalog` binaries for building
//!   and inspecting tier files from the command line.

pub mod builder;
pub mod error;
pub mod gsc;
pub mod query;
pub mod store;
pub mod tiling;

pub use builder::{build_catalogs, build_catalogs_with, BuildOptions, BuildReport};
pub use error::{CatalogError, CatalogResult};
pub use gsc::StarRecord;
pub use query::{find_stars, select, PrePoint, StarField, ViewProfile};
pub use store::{CatalogSet, CatalogTier, StoredStar, TierCatalog, TierHeader};
pub use tiling::Resolution;
