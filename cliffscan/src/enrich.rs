//! Per-footprint enrichment reducers: lithology class fractions,
//! population within a radius, and road proximity.

use crate::{ScanError, METERS_PER_DEG};
use geo::{
    geometry::{Coord, Geometry, Point, Polygon},
    Contains, LinesIter,
};
use ned::Raster;
use rstar::{primitives::Line as SegmentM, RTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Lithology classes with some bearing on rocky terrain, as fractions
/// of the classified cells around a footprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LithologyFractions {
    pub geology_carbonate: f64,
    pub geology_non_carbonate: f64,
    pub geology_silicic_residual: f64,
    pub geology_colluvial_sediment: f64,
    pub geology_glacial_till_coarse: f64,
    pub geology_alluvium: f64,
}

/// Frequency histogram of class codes whose cell centers fall inside
/// `polygon`. Code 0 is the no-data fill and is not counted.
pub fn class_histogram(raster: &Raster, polygon: &Polygon<f64>) -> BTreeMap<i16, u64> {
    let mut histogram = BTreeMap::new();
    for row in 0..raster.rows() {
        for col in 0..raster.cols() {
            if !polygon.contains(&Point::from(raster.center(col, row))) {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let code = raster.get(col, row).round() as i16;
            if code > 0 {
                *histogram.entry(code).or_insert(0) += 1;
            }
        }
    }
    histogram
}

/// Reduces a class histogram to named lithology fractions.
///
/// A region can contain no classified cells at all; a sentinel count
/// of one is folded into the denominator so the fractions are defined
/// (all zero) rather than a division by zero.
pub fn lithology_fractions(histogram: &BTreeMap<i16, u64>) -> LithologyFractions {
    let total = histogram.values().sum::<u64>() + 1;
    #[allow(clippy::cast_precision_loss)]
    let frac = |code: i16| histogram.get(&code).copied().unwrap_or(0) as f64 / total as f64;
    LithologyFractions {
        geology_carbonate: frac(1),
        geology_non_carbonate: frac(3),
        geology_silicic_residual: frac(5),
        geology_colluvial_sediment: frac(8),
        geology_glacial_till_coarse: frac(11),
        geology_alluvium: frac(19),
    }
}

/// Sums population raster cells within `radius_km` of `center`.
pub fn population_within(raster: &Raster, center: Coord<f64>, radius_km: f64) -> f64 {
    raster.sum_within(center, radius_km * 1000.0)
}

/// Road segments indexed for within-distance queries.
///
/// Segments are projected once into local equirectangular meters
/// around the dataset's reference latitude, which keeps queries
/// metric without dragging a projection library in; at the few-km
/// distances asked of it the approximation error is negligible.
pub struct RoadIndex {
    tree: RTree<SegmentM<[f64; 2]>>,
    ref_lat: f64,
}

impl RoadIndex {
    /// Loads every line geometry from a GeoJSON file.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let collection = crate::open_boundary(path)?;
        let mut lines = Vec::new();
        for geometry in &collection {
            match geometry {
                Geometry::Line(line) => lines.push(*line),
                Geometry::LineString(ls) => lines.extend(ls.lines_iter()),
                Geometry::MultiLineString(mls) => lines.extend(mls.lines_iter()),
                // Roads exported as thin polygons still contribute
                // their rings.
                Geometry::Polygon(p) => lines.extend(p.lines_iter()),
                _ => {}
            }
        }
        Ok(Self::from_lines(&lines))
    }

    pub fn from_lines(lines: &[geo::Line<f64>]) -> Self {
        let ref_lat = if lines.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let sum: f64 = lines.iter().map(|l| l.start.y).sum();
            sum / lines.len() as f64
        };
        let segments = lines
            .iter()
            .map(|line| {
                SegmentM::new(
                    project(line.start, ref_lat),
                    project(line.end, ref_lat),
                )
            })
            .collect();
        Self {
            tree: RTree::bulk_load(segments),
            ref_lat,
        }
    }

    /// Whether any road segment lies within `max_dist_m` meters of
    /// `coord`.
    pub fn within(&self, coord: Coord<f64>, max_dist_m: f64) -> bool {
        let point = project(coord, self.ref_lat);
        self.tree
            .locate_within_distance(point, max_dist_m * max_dist_m)
            .next()
            .is_some()
    }
}

fn project(coord: Coord<f64>, ref_lat: f64) -> [f64; 2] {
    [
        coord.x * METERS_PER_DEG * ref_lat.to_radians().cos(),
        coord.y * METERS_PER_DEG,
    ]
}

#[cfg(test)]
mod tests {
    use super::{class_histogram, lithology_fractions, population_within, RoadIndex};
    use approx::assert_relative_eq;
    use geo::{geometry::Coord, polygon, Line};
    use ned::Raster;
    use std::collections::BTreeMap;

    #[test]
    fn test_lithology_fractions() {
        let mut histogram = BTreeMap::new();
        histogram.insert(1, 3_u64); // carbonate
        histogram.insert(19, 5); // alluvium
        histogram.insert(7, 1); // unnamed class, denominator only
        let fractions = lithology_fractions(&histogram);
        // Denominator includes the sentinel.
        assert_relative_eq!(fractions.geology_carbonate, 0.3);
        assert_relative_eq!(fractions.geology_alluvium, 0.5);
        assert_relative_eq!(fractions.geology_non_carbonate, 0.0);
    }

    #[test]
    fn test_empty_histogram_is_defined() {
        let fractions = lithology_fractions(&BTreeMap::new());
        assert_relative_eq!(fractions.geology_carbonate, 0.0);
        assert_relative_eq!(fractions.geology_silicic_residual, 0.0);
        assert!(fractions.geology_alluvium.is_finite());
    }

    #[test]
    fn test_class_histogram_clips_to_polygon() {
        // Left half class 1, right half class 3; polygon covers the
        // left half only.
        let samples = (0..16)
            .map(|i| if i % 4 < 2 { 1.0 } else { 3.0 })
            .collect();
        let raster = Raster::from_samples(-120.0, 38.0, 0.25, 4, 4, samples);
        let left = polygon![
            (x: -120.0, y: 37.0),
            (x: -119.5, y: 37.0),
            (x: -119.5, y: 38.0),
            (x: -120.0, y: 38.0),
            (x: -120.0, y: 37.0),
        ];
        let histogram = class_histogram(&raster, &left);
        assert_eq!(histogram.get(&1), Some(&8));
        assert_eq!(histogram.get(&3), None);
    }

    #[test]
    fn test_population_within() {
        let raster = Raster::from_samples(-120.0, 38.0, 0.25, 4, 4, vec![10.0; 16]);
        let total = population_within(&raster, Coord { x: -119.5, y: 37.5 }, 500.0);
        assert_relative_eq!(total, 160.0);
    }

    #[test]
    fn test_road_within() {
        // A straight road running north at longitude -119.99,
        // latitude 37..38.
        let road = Line::new(
            Coord { x: -119.99, y: 37.0 },
            Coord { x: -119.99, y: 38.0 },
        );
        let index = RoadIndex::from_lines(&[road]);
        // ~0.01° of longitude at 37.5°N is ~880 m.
        let cliff = Coord { x: -120.0, y: 37.5 };
        assert!(index.within(cliff, 1000.0));
        assert!(!index.within(cliff, 500.0));
    }
}
