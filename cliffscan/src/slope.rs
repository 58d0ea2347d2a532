//! Per-cell slope from an elevation window.

use crate::METERS_PER_DEG;
use ned::Raster;

/// Computes slope angle (degrees) for every cell of `raster` using
/// Horn's 3×3 weighted finite-difference gradient. Border cells have
/// no full neighborhood and read as 0°, which a steepness mask treats
/// as flat.
///
/// Metric cell sizes are derived from the window's latitude:
/// north-south spacing is constant, east-west shrinks with
/// `cos(latitude)`.
pub fn slope_grid(raster: &Raster) -> Vec<f64> {
    let cols = raster.cols();
    let rows = raster.rows();
    let mut slopes = vec![0.0; cols * rows];
    if cols < 3 || rows < 3 {
        return slopes;
    }

    let cell_y = raster.res() * METERS_PER_DEG;
    let cell_x = cell_y * raster.mid_lat().to_radians().cos();

    for row in 1..rows - 1 {
        for col in 1..cols - 1 {
            let z = |dc: isize, dr: isize| {
                #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
                raster.get(
                    (col as isize + dc) as usize,
                    (row as isize + dr) as usize,
                )
            };
            // Row 0 is north, so dr = -1 looks north.
            let (nw, n, ne) = (z(-1, -1), z(0, -1), z(1, -1));
            let (w, e) = (z(-1, 0), z(1, 0));
            let (sw, s, se) = (z(-1, 1), z(0, 1), z(1, 1));

            let dz_dx = ((ne + 2.0 * e + se) - (nw + 2.0 * w + sw)) / (8.0 * cell_x);
            let dz_dy = ((nw + 2.0 * n + ne) - (sw + 2.0 * s + se)) / (8.0 * cell_y);
            slopes[row * cols + col] = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan().to_degrees();
        }
    }

    slopes
}
