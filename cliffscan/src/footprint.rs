//! Per-tile footprint extraction.

use crate::{label_components, slope_grid, vectorize, ScanError};
use geo::{geometry::Rect, Centroid};
use log::debug;
use ned::{Raster, TileStore};
use serde::{Deserialize, Serialize};

/// Scan thresholds and geometry knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    /// Cells steeper than this (degrees) count as cliff terrain.
    pub steep_threshold: f64,

    /// Connected regions must be strictly taller than this (meters).
    pub height_threshold: f64,

    /// Dilation radius applied before vectorizing, in cells.
    pub buffer_cells: usize,

    /// Douglas-Peucker tolerance for footprint rings, degrees.
    pub simplify_epsilon: f64,

    /// Centroid coordinates are rounded to this, degrees.
    pub centroid_round: f64,

    /// Elevation sampling density. 3600 is one arcsecond, roughly 10 m
    /// in the study region.
    pub samples_per_degree: u32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            steep_threshold: 70.0,
            height_threshold: 50.0,
            buffer_cells: 1,
            simplify_epsilon: 5e-4,
            centroid_round: 1e-2,
            samples_per_degree: 3600,
        }
    }
}

/// One vectorized region of tall, steep terrain.
///
/// The `geo` column carries the footprint polygon as a GeoJSON
/// geometry string, which is how it survives the round trip through
/// CSV between pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    /// Max minus min elevation over the region's cells, meters.
    pub height: f64,

    /// Number of steep cells contributing to the region.
    pub pixel_count: u64,

    pub latitude: f64,
    pub longitude: f64,

    /// Mean elevation over the region's cells, meters.
    pub elevation: f64,

    pub slope_p10: f64,
    pub slope_p20: f64,
    pub slope_p30: f64,
    pub slope_p40: f64,
    pub slope_p50: f64,
    pub slope_p60: f64,
    pub slope_p70: f64,
    pub slope_p80: f64,
    pub slope_p90: f64,

    #[serde(rename = ".geo")]
    pub geo: String,
}

impl Footprint {
    /// Decodes the GeoJSON geometry column.
    pub fn polygon(&self) -> Result<geo::Polygon<f64>, ScanError> {
        let geometry: geojson::Geometry = serde_json::from_str(&self.geo)?;
        match geo::geometry::Geometry::<f64>::try_from(geometry)? {
            geo::geometry::Geometry::Polygon(polygon) => Ok(polygon),
            _ => Err(ScanError::NotAPolygon),
        }
    }
}

/// Runs the whole footprint pipeline over one grid tile.
///
/// A tile with no tall steep regions yields an empty vec; that is the
/// common case, not an error.
pub fn scan_tile(
    store: &TileStore,
    rect: &Rect<f64>,
    params: &ScanParams,
) -> Result<Vec<Footprint>, ScanError> {
    let raster = Raster::window(store, rect, params.samples_per_degree)?;
    let footprints = scan_raster(&raster, params)?;
    debug!(
        "tile ({:.2}, {:.2}) produced {} footprints",
        rect.min().x,
        rect.min().y,
        footprints.len()
    );
    Ok(footprints)
}

/// Footprint pipeline over an already-sampled elevation window.
pub fn scan_raster(raster: &Raster, params: &ScanParams) -> Result<Vec<Footprint>, ScanError> {
    let slopes = slope_grid(raster);
    let mask: Vec<bool> = slopes.iter().map(|&s| s > params.steep_threshold).collect();

    let components = label_components(&mask, raster.cols(), raster.rows(), raster);
    let mut footprints = Vec::new();
    for component in components {
        if component.height() <= params.height_threshold {
            continue;
        }

        let polygon = vectorize(
            &component.cells,
            raster,
            params.buffer_cells,
            params.simplify_epsilon,
        );
        let centroid = polygon
            .centroid()
            .map_or_else(|| raster.center(component.cells[0].0, component.cells[0].1).into(), |p| p);

        let mut cell_slopes: Vec<f64> = component
            .cells
            .iter()
            .map(|&(c, r)| slopes[r * raster.cols() + c])
            .collect();
        cell_slopes.sort_by(|a, b| a.total_cmp(b));
        let p = |pct: f64| percentile(&cell_slopes, pct);

        #[allow(clippy::cast_precision_loss)]
        let elevation = component
            .cells
            .iter()
            .map(|&(c, r)| raster.get(c, r))
            .sum::<f64>()
            / component.cells.len() as f64;

        footprints.push(Footprint {
            height: component.height(),
            pixel_count: component.cells.len() as u64,
            latitude: round_to(centroid.y(), params.centroid_round),
            longitude: round_to(centroid.x(), params.centroid_round),
            elevation,
            slope_p10: p(10.0),
            slope_p20: p(20.0),
            slope_p30: p(30.0),
            slope_p40: p(40.0),
            slope_p50: p(50.0),
            slope_p60: p(60.0),
            slope_p70: p(70.0),
            slope_p80: p(80.0),
            slope_p90: p(90.0),
            geo: serde_json::to_string(&geojson::Geometry::new(geojson::Value::from(&polygon)))?,
        });
    }

    Ok(footprints)
}

/// Nearest-rank percentile over pre-sorted values.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    assert!(!sorted.is_empty());
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let rank = ((pct / 100.0 * sorted.len() as f64).ceil() as usize).max(1) - 1;
    sorted[rank.min(sorted.len() - 1)]
}

fn round_to(value: f64, tolerance: f64) -> f64 {
    (value / tolerance).round() * tolerance
}
