//! Dense raster windows sampled through a [`TileStore`].

use crate::{NedError, TileStore, C};
use geo::{
    geometry::{Coord, Point, Rect},
    HaversineDistance,
};

/// A dense single-band grid over a geographic bounding box.
///
/// Row 0 is the northernmost row. Cells are georeferenced by their
/// centers. Although windows are usually filled with elevation, any
/// band stored in `.hgt` form (population density, lithology class
/// codes) reads through the same machinery.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Western edge of column 0.
    west: C,

    /// Northern edge of row 0.
    north: C,

    /// Degrees per cell.
    res: C,

    cols: usize,
    rows: usize,

    /// Row-major samples, `rows * cols` long.
    samples: Vec<f64>,
}

impl Raster {
    /// Samples a window covering `rect` from `store` at
    /// `samples_per_degree` resolution.
    pub fn window(
        store: &TileStore,
        rect: &Rect<C>,
        samples_per_degree: u32,
    ) -> Result<Self, NedError> {
        let res = 1.0 / C::from(samples_per_degree);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cols = ((rect.width() / res).ceil() as usize).max(1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rows = ((rect.height() / res).ceil() as usize).max(1);
        let west = rect.min().x;
        let north = rect.max().y;

        let mut samples = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let center = cell_center(west, north, res, col, row);
                samples.push(store.elevation(center)?);
            }
        }

        Ok(Self {
            west,
            north,
            res,
            cols,
            rows,
            samples,
        })
    }

    /// Builds a raster directly from samples. `samples` must be
    /// row-major with row 0 northernmost and `rows * cols` long.
    pub fn from_samples(west: C, north: C, res: C, cols: usize, rows: usize, samples: Vec<f64>) -> Self {
        assert_eq!(samples.len(), rows * cols);
        Self {
            west,
            north,
            res,
            cols,
            rows,
            samples,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Degrees per cell.
    pub fn res(&self) -> C {
        self.res
    }

    /// Western edge of column 0.
    pub fn west(&self) -> C {
        self.west
    }

    /// Northern edge of row 0.
    pub fn north(&self) -> C {
        self.north
    }

    /// Latitude through the middle of the window.
    pub fn mid_lat(&self) -> C {
        #[allow(clippy::cast_precision_loss)]
        let height = self.rows as C * self.res;
        self.north - height / 2.0
    }

    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.samples[row * self.cols + col]
    }

    /// Center coordinate of cell `(col, row)`.
    pub fn center(&self, col: usize, row: usize) -> Coord<C> {
        cell_center(self.west, self.north, self.res, col, row)
    }

    /// Sums all cells whose centers lie within `radius_m` meters of
    /// `center`.
    pub fn sum_within(&self, center: Coord<C>, radius_m: C) -> f64 {
        let center = Point::from(center);
        let mut sum = 0.0;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = Point::from(self.center(col, row));
                if center.haversine_distance(&cell) <= radius_m {
                    sum += self.get(col, row);
                }
            }
        }
        sum
    }
}

fn cell_center(west: C, north: C, res: C, col: usize, row: usize) -> Coord<C> {
    #[allow(clippy::cast_precision_loss)]
    Coord {
        x: west + (col as C + 0.5) * res,
        y: north - (row as C + 0.5) * res,
    }
}

#[cfg(test)]
mod tests {
    use super::Raster;
    use approx::assert_relative_eq;
    use geo::geometry::Coord;

    fn checkerboard() -> Raster {
        let samples = (0..16)
            .map(|i| if (i / 4 + i % 4) % 2 == 0 { 1.0 } else { 0.0 })
            .collect();
        Raster::from_samples(-120.0, 38.0, 0.25, 4, 4, samples)
    }

    #[test]
    fn test_georeferencing() {
        let raster = checkerboard();
        assert_relative_eq!(raster.center(0, 0).x, -119.875);
        assert_relative_eq!(raster.center(0, 0).y, 37.875);
        assert_relative_eq!(raster.center(3, 3).x, -119.125);
        assert_relative_eq!(raster.center(3, 3).y, 37.125);
        assert_relative_eq!(raster.mid_lat(), 37.5);
    }

    #[test]
    fn test_sum_within_covers_all_cells() {
        let raster = checkerboard();
        let total = raster.sum_within(Coord { x: -119.5, y: 37.5 }, 500_000.0);
        assert_relative_eq!(total, 8.0);
    }

    #[test]
    fn test_sum_within_single_cell() {
        let raster = checkerboard();
        // Radius small enough to only reach the cell containing the
        // query point.
        let sum = raster.sum_within(Coord { x: -119.875, y: 37.875 }, 1_000.0);
        assert_relative_eq!(sum, 1.0);
    }
}
