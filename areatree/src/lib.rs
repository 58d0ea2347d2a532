//! Aggregation of a scraped climbing-area tree.
//!
//! The scraper emits a hierarchy of named areas; each area either
//! contains sub-areas or terminal routes, never a mix of siblings.
//! Areas usually carry coordinates, often inherited verbatim from
//! their parent; routes never do. The aggregator walks the tree once,
//! keying accumulation by the nearest ancestor coordinate, and
//! produces one count record per distinct coordinate.

mod aggregate;
mod error;
mod node;

pub use crate::{
    aggregate::{aggregate, rows, AreaCounts, AreaRow},
    error::TreeError,
    node::{load, CoordKey, Node},
};
