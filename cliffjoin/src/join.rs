//! The two-pass join itself.

use geo::geometry::{Coord, Polygon};
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, RTree};

/// Meters per degree of latitude.
const METERS_PER_DEG: f64 = 111_320.0;

/// One aggregated recreation area: a point with route counts.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub n_rock: u64,
    pub n_views: u64,
}

/// One cliff footprint as the join sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CliffShape {
    pub centroid: Coord<f64>,
    pub polygon: Polygon<f64>,
}

/// Distance thresholds, meters. The defaults match the tight 300 m
/// association and 800 m vicinity the pipeline has always used, but
/// both are expected to be tuned from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinParams {
    pub d_assoc: f64,
    pub d_vicinity: f64,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            d_assoc: 300.0,
            d_vicinity: 800.0,
        }
    }
}

/// Join result for one footprint, parallel to the input cliff slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedCliff {
    /// Sums over areas whose nearest footprint this is, within
    /// `d_assoc`.
    pub n_rock: u64,
    pub n_views: u64,
    pub name: String,

    /// Sums over every rock-route area within `d_vicinity`.
    pub vicinity_n_rock: u64,
    pub vicinity_n_views: u64,
    pub vicinity_n_areas: u64,
}

/// Runs both passes. Every cliff gets exactly one output record, in
/// input order, zero-filled when nothing is in reach.
pub fn join(cliffs: &[CliffShape], areas: &[AreaPoint], params: &JoinParams) -> Vec<JoinedCliff> {
    let mut results = vec![JoinedCliff::default(); cliffs.len()];
    if cliffs.is_empty() {
        return results;
    }

    #[allow(clippy::cast_precision_loss)]
    let ref_lat = cliffs.iter().map(|c| c.centroid.y).sum::<f64>() / cliffs.len() as f64;
    let projected: Vec<ProjectedCliff> = cliffs
        .iter()
        .map(|cliff| ProjectedCliff::new(cliff, ref_lat))
        .collect();
    // Candidate searches run on centroids, so the radius must absorb
    // the largest centroid-to-edge extent in the dataset.
    let max_extent = projected
        .iter()
        .map(|c| c.extent)
        .fold(0.0_f64, f64::max);

    let cliff_tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        projected
            .iter()
            .enumerate()
            .map(|(id, c)| GeomWithData::new(c.centroid, id))
            .collect(),
    );

    // Tight pass: nearest footprint per area, areas with no rock
    // routes or no footprint in reach dropped.
    let assoc_radius = params.d_assoc + max_extent;
    let matches: Vec<(usize, usize)> = areas
        .par_iter()
        .enumerate()
        .filter(|(_, area)| area.n_rock > 0)
        .filter_map(|(area_id, area)| {
            let point = project(
                Coord {
                    x: area.longitude,
                    y: area.latitude,
                },
                ref_lat,
            );
            let mut best: Option<(f64, usize)> = None;
            for candidate in cliff_tree.locate_within_distance(point, assoc_radius * assoc_radius)
            {
                let cliff_id = candidate.data;
                let dist = projected[cliff_id].distance_m(point);
                if dist <= params.d_assoc {
                    let better = match best {
                        None => true,
                        // Deterministic tie-break on the lower id.
                        Some((best_dist, best_id)) => {
                            dist < best_dist || (dist == best_dist && cliff_id < best_id)
                        }
                    };
                    if better {
                        best = Some((dist, cliff_id));
                    }
                }
            }
            best.map(|(_, cliff_id)| (cliff_id, area_id))
        })
        .collect();

    let mut names: Vec<Vec<&str>> = vec![Vec::new(); cliffs.len()];
    for &(cliff_id, area_id) in &matches {
        let area = &areas[area_id];
        results[cliff_id].n_rock += area.n_rock;
        results[cliff_id].n_views += area.n_views;
        names[cliff_id].push(&area.name);
    }
    for (result, names) in results.iter_mut().zip(names) {
        result.name = names.join(" - ");
    }

    // Vicinity pass, independent of the association above: all areas
    // in reach of each cliff, counted with no dedup against the tight
    // pass. The rock-route filter applies here too; boulder-only
    // areas are invisible to both passes.
    let area_tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        areas
            .iter()
            .enumerate()
            .filter(|(_, area)| area.n_rock > 0)
            .map(|(id, area)| {
                GeomWithData::new(
                    project(
                        Coord {
                            x: area.longitude,
                            y: area.latitude,
                        },
                        ref_lat,
                    ),
                    id,
                )
            })
            .collect(),
    );

    let vicinity: Vec<(u64, u64, u64)> = projected
        .par_iter()
        .map(|cliff| {
            let radius = params.d_vicinity + cliff.extent;
            let (mut n_rock, mut n_views, mut n_areas) = (0, 0, 0);
            for candidate in area_tree.locate_within_distance(cliff.centroid, radius * radius) {
                let area = &areas[candidate.data];
                let dist = cliff.distance_m(*candidate.geom());
                if dist <= params.d_vicinity {
                    n_rock += area.n_rock;
                    n_views += area.n_views;
                    n_areas += 1;
                }
            }
            (n_rock, n_views, n_areas)
        })
        .collect();

    for (result, (n_rock, n_views, n_areas)) in results.iter_mut().zip(vicinity) {
        result.vicinity_n_rock = n_rock;
        result.vicinity_n_views = n_views;
        result.vicinity_n_areas = n_areas;
    }

    results
}

/// A cliff pre-projected into local equirectangular meters.
struct ProjectedCliff {
    centroid: [f64; 2],
    /// Exterior ring vertices, meters.
    ring: Vec<[f64; 2]>,
    /// Largest centroid-to-vertex distance, meters.
    extent: f64,
}

impl ProjectedCliff {
    fn new(cliff: &CliffShape, ref_lat: f64) -> Self {
        let centroid = project(cliff.centroid, ref_lat);
        let ring: Vec<[f64; 2]> = cliff
            .polygon
            .exterior()
            .coords()
            .map(|&c| project(c, ref_lat))
            .collect();
        let extent = ring
            .iter()
            .map(|v| dist2(centroid, *v).sqrt())
            .fold(0.0_f64, f64::max);
        Self {
            centroid,
            ring,
            extent,
        }
    }

    /// Distance in meters from an area point to this cliff's
    /// footprint: zero inside the polygon, else distance to the
    /// nearest exterior edge.
    fn distance_m(&self, point_m: [f64; 2]) -> f64 {
        if self.ring.len() < 2 {
            return dist2(point_m, self.centroid).sqrt();
        }
        if point_in_ring(point_m, &self.ring) {
            return 0.0;
        }
        self.ring
            .windows(2)
            .map(|seg| seg_dist2(point_m, seg[0], seg[1]))
            .fold(f64::INFINITY, f64::min)
            .sqrt()
    }
}

fn project(coord: Coord<f64>, ref_lat: f64) -> [f64; 2] {
    [
        coord.x * METERS_PER_DEG * ref_lat.to_radians().cos(),
        coord.y * METERS_PER_DEG,
    ]
}

fn dist2(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (a[0] - b[0], a[1] - b[1]);
    dx * dx + dy * dy
}

/// Squared distance from `p` to segment `ab`.
fn seg_dist2(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let len2 = dist2(a, b);
    if len2 == 0.0 {
        return dist2(p, a);
    }
    let t = ((p[0] - a[0]) * (b[0] - a[0]) + (p[1] - a[1]) * (b[1] - a[1])) / len2;
    let t = t.clamp(0.0, 1.0);
    let nearest = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
    dist2(p, nearest)
}

/// Even-odd containment test against a closed ring.
fn point_in_ring(p: [f64; 2], ring: &[[f64; 2]]) -> bool {
    let mut inside = false;
    for seg in ring.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = a[0] + (p[1] - a[1]) / (b[1] - a[1]) * (b[0] - a[0]);
            if p[0] < x {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{join, AreaPoint, CliffShape, JoinParams, METERS_PER_DEG};
    use geo::{polygon, Coord};

    /// A small square footprint centered on (lat, lon), `half_m`
    /// meters from center to each edge.
    fn square(lat: f64, lon: f64, half_m: f64) -> CliffShape {
        let dlat = half_m / METERS_PER_DEG;
        let dlon = half_m / (METERS_PER_DEG * lat.to_radians().cos());
        CliffShape {
            centroid: Coord { x: lon, y: lat },
            polygon: polygon![
                (x: lon - dlon, y: lat - dlat),
                (x: lon + dlon, y: lat - dlat),
                (x: lon + dlon, y: lat + dlat),
                (x: lon - dlon, y: lat + dlat),
                (x: lon - dlon, y: lat - dlat),
            ],
        }
    }

    fn area(lat: f64, lon: f64, name: &str, n_rock: u64, n_views: u64) -> AreaPoint {
        AreaPoint {
            latitude: lat,
            longitude: lon,
            name: name.to_owned(),
            n_rock,
            n_views,
        }
    }

    /// Offsets a latitude by a distance in meters.
    fn north_m(lat: f64, meters: f64) -> f64 {
        lat + meters / METERS_PER_DEG
    }

    #[test]
    fn test_near_and_far_footprints() {
        // One area; a footprint 250 m north of it and another 1000 m
        // north. With a 300 m association and 1500 m vicinity, only
        // the near footprint is associated but both see the area in
        // their vicinity.
        let lat = 37.0;
        let area_lat = lat;
        let cliffs = vec![
            square(north_m(area_lat, 250.0 + 10.0), -119.0, 10.0),
            square(north_m(area_lat, 1000.0 + 10.0), -119.0, 10.0),
        ];
        let areas = vec![area(area_lat, -119.0, "Crag", 12, 340)];
        let params = JoinParams {
            d_assoc: 300.0,
            d_vicinity: 1500.0,
        };
        let joined = join(&cliffs, &areas, &params);
        assert_eq!(joined.len(), 2);

        assert_eq!(joined[0].n_rock, 12);
        assert_eq!(joined[0].n_views, 340);
        assert_eq!(joined[0].name, "Crag");

        assert_eq!(joined[1].n_rock, 0);
        assert_eq!(joined[1].n_views, 0);
        assert_eq!(joined[1].name, "");

        for result in &joined {
            assert_eq!(result.vicinity_n_rock, 12);
            assert_eq!(result.vicinity_n_views, 340);
            assert_eq!(result.vicinity_n_areas, 1);
        }
    }

    #[test]
    fn test_every_cliff_gets_a_record() {
        let cliffs = vec![square(37.0, -119.0, 20.0), square(45.0, -110.0, 20.0)];
        let joined = join(&cliffs, &[], &JoinParams::default());
        assert_eq!(joined.len(), 2);
        for result in joined {
            assert_eq!(result.n_rock, 0);
            assert_eq!(result.vicinity_n_areas, 0);
            assert_eq!(result.name, "");
        }
    }

    #[test]
    fn test_rockless_areas_invisible_to_both_passes() {
        // A boulder-only area sitting right on the footprint
        // contributes to neither the association nor the vicinity
        // sums.
        let cliffs = vec![square(37.0, -119.0, 20.0)];
        let areas = vec![area(37.0, -119.0, "Boulders Only", 0, 99)];
        let joined = join(&cliffs, &areas, &JoinParams::default());
        assert_eq!(joined[0].n_rock, 0);
        assert_eq!(joined[0].n_views, 0);
        assert_eq!(joined[0].name, "");
        assert_eq!(joined[0].vicinity_n_views, 0);
        assert_eq!(joined[0].vicinity_n_areas, 0);
    }

    #[test]
    fn test_vicinity_sums_only_rock_areas() {
        let cliffs = vec![square(37.0, -119.0, 20.0)];
        let areas = vec![
            area(north_m(37.0, 100.0), -119.0, "Crag", 4, 40),
            area(north_m(37.0, -100.0), -119.0, "Boulders", 0, 70),
        ];
        let joined = join(&cliffs, &areas, &JoinParams::default());
        assert_eq!(joined[0].vicinity_n_rock, 4);
        assert_eq!(joined[0].vicinity_n_views, 40);
        assert_eq!(joined[0].vicinity_n_areas, 1);
    }

    #[test]
    fn test_area_inside_footprint_is_distance_zero() {
        // An area well past the centroid-only radius from the
        // centroid would be missed without the extent padding; sitting
        // inside the polygon it must still match at distance zero.
        let cliffs = vec![square(37.0, -119.0, 400.0)];
        let west_lon = -119.0 - 350.0 / (METERS_PER_DEG * 37.0_f64.to_radians().cos());
        let areas = vec![area(37.0, west_lon, "Inside", 3, 30)];
        let params = JoinParams {
            d_assoc: 100.0,
            d_vicinity: 100.0,
        };
        let joined = join(&cliffs, &areas, &params);
        assert_eq!(joined[0].n_rock, 3);
        assert_eq!(joined[0].vicinity_n_areas, 1);
    }

    #[test]
    fn test_area_attributed_to_single_nearest_cliff() {
        let cliffs = vec![
            square(north_m(37.0, 120.0), -119.0, 10.0),
            square(north_m(37.0, -60.0), -119.0, 10.0),
        ];
        let areas = vec![area(37.0, -119.0, "Between", 5, 50)];
        let joined = join(&cliffs, &areas, &JoinParams::default());
        // Only the closer (southern) footprint claims it.
        assert_eq!(joined[0].n_rock, 0);
        assert_eq!(joined[1].n_rock, 5);
        assert_eq!(joined[1].name, "Between");
    }

    #[test]
    fn test_names_concatenated() {
        let cliffs = vec![square(37.0, -119.0, 20.0)];
        let areas = vec![
            area(north_m(37.0, 60.0), -119.0, "Upper Wall", 2, 20),
            area(north_m(37.0, -60.0), -119.0, "Lower Wall", 4, 40),
        ];
        let joined = join(&cliffs, &areas, &JoinParams::default());
        assert_eq!(joined[0].n_rock, 6);
        assert_eq!(joined[0].n_views, 60);
        assert_eq!(joined[0].name, "Upper Wall - Lower Wall");
    }

    #[test]
    fn test_vicinity_is_superset_of_association() {
        // d_vicinity >= d_assoc, so for a single cliff the vicinity
        // sums always dominate the associated sums.
        let cliffs = vec![square(37.0, -119.0, 20.0)];
        let areas = vec![
            area(north_m(37.0, 100.0), -119.0, "Near", 3, 30),
            area(north_m(37.0, 600.0), -119.0, "Far", 7, 70),
        ];
        let joined = join(&cliffs, &areas, &JoinParams::default());
        assert_eq!(joined[0].n_rock, 3);
        assert_eq!(joined[0].vicinity_n_rock, 10);
        assert_eq!(joined[0].vicinity_n_views, 100);
        assert_eq!(joined[0].vicinity_n_areas, 2);
        assert!(joined[0].vicinity_n_rock >= joined[0].n_rock);
    }

    #[test]
    fn test_deterministic_output() {
        let cliffs = vec![
            square(37.0, -119.0, 20.0),
            square(37.01, -119.0, 20.0),
            square(37.02, -119.01, 20.0),
        ];
        let areas = vec![
            area(37.001, -119.0, "A", 1, 10),
            area(37.011, -119.0, "B", 2, 20),
            area(37.019, -119.01, "C", 3, 30),
        ];
        let params = JoinParams::default();
        let first = join(&cliffs, &areas, &params);
        let second = join(&cliffs, &areas, &params);
        assert_eq!(first, second);
    }
}
