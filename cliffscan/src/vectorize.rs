//! Raster component to polygon conversion.
//!
//! A labeled component is a set of grid cells. Vectorizing it takes
//! three steps: dilate the cell mask by a small buffer, trace the
//! outer boundary of the dilated mask into a single ring, and
//! simplify the ring. The dilation merges regions that touch only at
//! cell corners into one edge-connected blob, smooths the somewhat
//! arbitrary steepness cutoff, and keeps the traced ring simple;
//! simplification bounds the vertex count of exported geometry.

use geo::{
    geometry::{Coord, LineString, Polygon},
    Simplify,
};
use ned::Raster;
use std::collections::HashMap;

/// Converts one component's cells into a simple polygon in lon/lat
/// degrees.
///
/// `buffer_cells` is the dilation radius in cells (Chebyshev), the
/// raster analogue of a fixed positive map-unit buffer.
/// `simplify_epsilon` is the Douglas-Peucker tolerance in degrees; 0
/// keeps the raw traced ring.
pub fn vectorize(
    cells: &[(usize, usize)],
    raster: &Raster,
    buffer_cells: usize,
    simplify_epsilon: f64,
) -> Polygon<f64> {
    assert!(!cells.is_empty());

    // Work in a window just big enough for the dilated component.
    let min_c = cells.iter().map(|c| c.0).min().unwrap();
    let max_c = cells.iter().map(|c| c.0).max().unwrap();
    let min_r = cells.iter().map(|c| c.1).min().unwrap();
    let max_r = cells.iter().map(|c| c.1).max().unwrap();
    let x0 = min_c.saturating_sub(buffer_cells);
    let y0 = min_r.saturating_sub(buffer_cells);
    let x1 = (max_c + buffer_cells).min(raster.cols() - 1);
    let y1 = (max_r + buffer_cells).min(raster.rows() - 1);
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);

    let mut mask = vec![false; w * h];
    for &(c, r) in cells {
        mask[(r - y0) * w + (c - x0)] = true;
    }
    for _ in 0..buffer_cells {
        mask = dilate(&mask, w, h);
    }

    let ring = trace_outer_ring(&mask, w, h);
    let exterior: Vec<Coord<f64>> = ring
        .into_iter()
        .map(|(vx, vy)| {
            #[allow(clippy::cast_precision_loss)]
            Coord {
                x: raster.west() + (x0 as f64 + vx as f64) * raster.res(),
                y: raster.north() - (y0 as f64 + vy as f64) * raster.res(),
            }
        })
        .collect();

    let polygon = Polygon::new(LineString::from(exterior), vec![]);
    if simplify_epsilon > 0.0 {
        polygon.simplify(&simplify_epsilon)
    } else {
        polygon
    }
}

/// One pass of 8-neighborhood morphological dilation.
fn dilate(mask: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut out = vec![false; w * h];
    for r in 0..h {
        for c in 0..w {
            'probe: for dr in -1_isize..=1 {
                for dc in -1_isize..=1 {
                    #[allow(clippy::cast_possible_wrap)]
                    let (nc, nr) = (c as isize + dc, r as isize + dr);
                    if nc < 0 || nr < 0 {
                        continue;
                    }
                    #[allow(clippy::cast_sign_loss)]
                    let (nc, nr) = (nc as usize, nr as usize);
                    if nc < w && nr < h && mask[nr * w + nc] {
                        out[r * w + c] = true;
                        break 'probe;
                    }
                }
            }
        }
    }
    out
}

/// Traces the outer boundary of `mask` as a closed lattice-vertex
/// ring.
///
/// Every cell edge adjoining an unmasked (or out-of-window) cell
/// becomes a unit segment directed with the interior on its left
/// (screen coordinates, y down). Segments are then stitched start to
/// end; where two boundary loops meet at a pinch vertex the walk
/// prefers the sharpest clockwise turn, which keeps it on the outside
/// of the union and traverses the pinch as a single ring.
fn trace_outer_ring(mask: &[bool], w: usize, h: usize) -> Vec<(i64, i64)> {
    let at = |c: isize, r: isize| -> bool {
        #[allow(clippy::cast_possible_wrap)]
        if c < 0 || r < 0 || c >= w as isize || r >= h as isize {
            false
        } else {
            #[allow(clippy::cast_sign_loss)]
            mask[r as usize * w + c as usize]
        }
    };

    // Directed boundary segments keyed by start vertex.
    let mut edges: HashMap<(i64, i64), Vec<(i64, i64)>> = HashMap::new();
    let mut push = |from: (i64, i64), to: (i64, i64)| {
        edges.entry(from).or_default().push(to);
    };
    let mut start = None;
    for r in 0..h as isize {
        for c in 0..w as isize {
            if !at(c, r) {
                continue;
            }
            let (vc, vr) = (c as i64, r as i64);
            if !at(c, r - 1) {
                // Top edge, heading west.
                push((vc + 1, vr), (vc, vr));
                if start.is_none() {
                    start = Some((vc + 1, vr));
                }
            }
            if !at(c, r + 1) {
                // Bottom edge, heading east.
                push((vc, vr + 1), (vc + 1, vr + 1));
            }
            if !at(c - 1, r) {
                // Left edge, heading south.
                push((vc, vr), (vc, vr + 1));
            }
            if !at(c + 1, r) {
                // Right edge, heading north.
                push((vc + 1, vr + 1), (vc + 1, vr));
            }
        }
    }

    // The first top edge found belongs to the topmost masked row, so
    // it always lies on the outer ring.
    let start = start.expect("component has at least one cell");
    let mut ring = vec![start];
    let mut current = start;
    let mut dir = (-1_i64, 0_i64);
    // First hop: consume the starting edge itself.
    take_edge(&mut edges, current, (current.0 - 1, current.1));
    current = (current.0 - 1, current.1);

    let budget = 4 * w * h + 8;
    for _ in 0..budget {
        if current == start {
            break;
        }
        ring.push(current);
        // Clockwise-most available continuation: right turn, then
        // straight, then left, then back the way we came.
        let preferences = [
            (-dir.1, dir.0),
            dir,
            (dir.1, -dir.0),
            (-dir.0, -dir.1),
        ];
        let mut advanced = false;
        for d in preferences {
            let next = (current.0 + d.0, current.1 + d.1);
            if take_edge(&mut edges, current, next) {
                current = next;
                dir = d;
                advanced = true;
                break;
            }
        }
        if !advanced {
            break;
        }
    }
    ring
}

fn take_edge(
    edges: &mut HashMap<(i64, i64), Vec<(i64, i64)>>,
    from: (i64, i64),
    to: (i64, i64),
) -> bool {
    if let Some(ends) = edges.get_mut(&from) {
        if let Some(pos) = ends.iter().position(|&e| e == to) {
            ends.swap_remove(pos);
            return true;
        }
    }
    false
}
