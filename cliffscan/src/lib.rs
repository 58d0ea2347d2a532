//! Steep-terrain footprint extraction.
//!
//! The scanner partitions a search region into a grid of small
//! rectangular tiles, samples an elevation window for each tile,
//! masks cells steeper than a slope threshold, labels connected
//! regions of the mask, keeps regions taller than a height threshold,
//! and vectorizes each surviving region into a simple polygon
//! footprint with centroid, mean elevation, and slope percentile
//! attributes.
//!
//! Footprints straddling a tile boundary are found once per tile and
//! are not deduplicated across tiles; the per-tile windows exist to
//! bound the working set of a single reduction, not to partition the
//! terrain exactly.

mod boundary;
mod components;
mod enrich;
mod error;
mod footprint;
mod grid;
mod slope;
mod vectorize;

pub use crate::{
    boundary::open as open_boundary,
    components::{label_components, Component},
    enrich::{
        class_histogram, lithology_fractions, population_within, LithologyFractions, RoadIndex,
    },
    error::ScanError,
    footprint::{scan_raster, scan_tile, Footprint, ScanParams},
    grid::GridBounds,
    slope::slope_grid,
    vectorize::vectorize,
};

/// Meters per degree of latitude.
pub const METERS_PER_DEG: f64 = 111_320.0;
