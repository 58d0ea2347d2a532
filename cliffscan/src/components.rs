//! Connected-component labeling of the steep-terrain mask.

use ned::Raster;

/// One 8-connected region of masked cells.
#[derive(Debug, Clone)]
pub struct Component {
    /// `(col, row)` of every member cell.
    pub cells: Vec<(usize, usize)>,

    /// Lowest elevation among member cells, meters.
    pub min_elev: f64,

    /// Highest elevation among member cells, meters.
    pub max_elev: f64,
}

impl Component {
    /// Top-to-bottom height of the region, meters.
    pub fn height(&self) -> f64 {
        self.max_elev - self.min_elev
    }
}

/// Labels maximal 8-connected components of `mask` (row-major,
/// `rows * cols`), folding elevation extrema from `elev` as each cell
/// joins its component. Iterative fill; a big wall can run to tens of
/// thousands of cells and recursion is not an option.
pub fn label_components(mask: &[bool], cols: usize, rows: usize, elev: &Raster) -> Vec<Component> {
    assert_eq!(mask.len(), cols * rows);
    let mut visited = vec![false; cols * rows];
    let mut components = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut cells = Vec::new();
        let mut min_elev = f64::INFINITY;
        let mut max_elev = f64::NEG_INFINITY;
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(index) = stack.pop() {
            let (col, row) = (index % cols, index / cols);
            cells.push((col, row));
            let z = elev.get(col, row);
            min_elev = min_elev.min(z);
            max_elev = max_elev.max(z);

            for dr in -1_isize..=1 {
                for dc in -1_isize..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    #[allow(clippy::cast_possible_wrap)]
                    let (nc, nr) = (col as isize + dc, row as isize + dr);
                    if nc < 0 || nr < 0 {
                        continue;
                    }
                    #[allow(clippy::cast_sign_loss)]
                    let (nc, nr) = (nc as usize, nr as usize);
                    if nc >= cols || nr >= rows {
                        continue;
                    }
                    let neighbor = nr * cols + nc;
                    if mask[neighbor] && !visited[neighbor] {
                        visited[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }
        }

        components.push(Component {
            cells,
            min_elev,
            max_elev,
        });
    }

    components
}
