//! Regular tile grid over the search region.

use geo::{
    geometry::{Coord, GeometryCollection, Rect},
    Intersects,
};

/// Bounds and step size of the scan grid.
///
/// The step size is chosen empirically so that the elevation window
/// for one tile stays comfortably in memory; the defaults cover the
/// western United States at a quarter degree per tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            xmin: -125.0,
            xmax: -102.0,
            ymin: 31.0,
            ymax: 49.0,
            dx: 0.25,
            dy: 0.25,
        }
    }
}

impl GridBounds {
    /// The full bounding rectangle.
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.xmin,
                y: self.ymin,
            },
            Coord {
                x: self.xmax,
                y: self.ymax,
            },
        )
    }

    /// Builds the complete tile grid, optionally filtered to tiles
    /// intersecting `boundary`.
    ///
    /// Tiles are laid out on integer multiples of the step size from
    /// the grid origin, so the union of kept tiles covers every point
    /// of the boundary that lies within the bounding box: filtering
    /// only drops tiles disjoint from the boundary.
    pub fn build_grid(&self, boundary: Option<&GeometryCollection<f64>>) -> Vec<Rect<f64>> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nx = ((self.xmax - self.xmin) / self.dx).ceil() as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ny = ((self.ymax - self.ymin) / self.dy).ceil() as usize;

        let mut tiles = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (
                    self.xmin + i as f64 * self.dx,
                    self.ymin + j as f64 * self.dy,
                );
                let tile = Rect::new(
                    Coord { x, y },
                    Coord {
                        x: x + self.dx,
                        y: y + self.dy,
                    },
                );
                let keep = boundary.map_or(true, |boundary| {
                    boundary.intersects(&tile.to_polygon())
                });
                if keep {
                    tiles.push(tile);
                }
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::GridBounds;
    use geo::{
        geometry::{Coord, Geometry, GeometryCollection, Point},
        polygon, Contains, Intersects,
    };

    fn small_bounds() -> GridBounds {
        GridBounds {
            xmin: -121.0,
            xmax: -119.0,
            ymin: 37.0,
            ymax: 39.0,
            dx: 0.5,
            dy: 0.5,
        }
    }

    #[test]
    fn test_unfiltered_grid_covers_bbox() {
        let bounds = small_bounds();
        let tiles = bounds.build_grid(None);
        assert_eq!(tiles.len(), 16);
        // Every probe point within the bbox falls in some tile.
        for i in 0..20 {
            for j in 0..20 {
                let p = Coord {
                    x: -121.0 + 0.1 * f64::from(i) + 0.05,
                    y: 37.0 + 0.1 * f64::from(j) + 0.05,
                };
                assert!(tiles.iter().any(|t| t.contains(&Point::from(p))));
            }
        }
    }

    #[test]
    fn test_boundary_filter_keeps_coverage() {
        let bounds = small_bounds();
        let boundary = polygon![
            (x: -120.6, y: 37.4),
            (x: -119.4, y: 37.4),
            (x: -119.4, y: 38.6),
            (x: -120.6, y: 38.6),
            (x: -120.6, y: 37.4),
        ];
        let collection = GeometryCollection::from(vec![Geometry::Polygon(boundary.clone())]);
        let tiles = bounds.build_grid(Some(&collection));
        assert!(tiles.len() < 16);
        // No point of the boundary within the bbox lost to filtering.
        for i in 0..30 {
            for j in 0..30 {
                let p = Point::new(
                    -121.0 + 2.0 * f64::from(i) / 30.0,
                    37.0 + 2.0 * f64::from(j) / 30.0,
                );
                if boundary.contains(&p) {
                    assert!(tiles.iter().any(|t| t.intersects(&p)));
                }
            }
        }
    }
}
