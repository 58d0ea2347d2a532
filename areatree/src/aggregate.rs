//! The per-coordinate fold over the validated tree.

use crate::{CoordKey, Node};
use serde::Serialize;
use std::collections::HashMap;

/// Accumulated counts for one coordinate key.
///
/// `name` is fixed by the topmost node that established the key;
/// descendants inheriting the key never overwrite it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaCounts {
    pub name: String,
    pub n_boulder: u64,
    pub n_winter: u64,
    pub n_rock: u64,
    pub n_views: u64,
}

impl AreaCounts {
    /// Buckets a route into exactly one of the three counters.
    ///
    /// Boulders win outright; otherwise any winter discipline (mixed,
    /// ice, snow) makes it a winter route; everything else (tr, trad,
    /// sport, alpine, or unrecognized) counts as rock.
    fn count_types(&mut self, types: &[String]) {
        let has = |t: &str| types.iter().any(|ty| ty == t);
        if has("boulder") {
            self.n_boulder += 1;
        } else if has("mixed") || has("ice") || has("snow") {
            self.n_winter += 1;
        } else {
            self.n_rock += 1;
        }
    }
}

/// Walks the tree depth-first and returns one record per distinct
/// coordinate key. A pure fold: same tree in, same map out.
///
/// Nodes visited before any ancestor establishes a coordinate
/// contribute nothing; the loader's synthetic root always carries one,
/// so in practice that only drops malformed subtrees.
pub fn aggregate(root: &Node) -> HashMap<CoordKey, AreaCounts> {
    let mut counts = HashMap::new();
    dfs(root, None, &mut counts);
    counts
}

fn dfs(node: &Node, key: Option<CoordKey>, counts: &mut HashMap<CoordKey, AreaCounts>) {
    // The node's own coordinate, when present, rekeys its whole
    // subtree; otherwise the parent's key is inherited.
    let key = match node {
        Node::Area {
            coord: Some(own), ..
        } => Some(*own),
        _ => key,
    };

    if let Some(key) = key {
        let entry = counts.entry(key).or_insert_with(|| AreaCounts {
            name: node.name().to_owned(),
            ..AreaCounts::default()
        });
        match node {
            Node::Area { views, .. } => entry.n_views += views,
            Node::Route { views, types, .. } => {
                entry.n_views += views;
                entry.count_types(types);
            }
        }
    }

    if let Node::Area { children, .. } = node {
        for child in children {
            dfs(child, key, counts);
        }
    }
}

/// One CSV row of the aggregated table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AreaRow {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub n_boulder: u64,
    pub n_winter: u64,
    pub n_rock: u64,
    pub n_views: u64,
}

/// Flattens the count map into rows, dropping coordinates with no
/// routes at all (administrative nodes with views but nothing to
/// climb). Rows are sorted by coordinate for deterministic output.
pub fn rows(counts: &HashMap<CoordKey, AreaCounts>) -> Vec<AreaRow> {
    let mut rows: Vec<AreaRow> = counts
        .iter()
        .filter(|(_, c)| c.n_boulder + c.n_winter + c.n_rock > 0)
        .map(|(key, c)| AreaRow {
            latitude: key.lat,
            longitude: key.lon,
            name: c.name.clone(),
            n_boulder: c.n_boulder,
            n_winter: c.n_winter,
            n_rock: c.n_rock,
            n_views: c.n_views,
        })
        .collect();
    rows.sort_by(|a, b| {
        (a.latitude, a.longitude)
            .partial_cmp(&(b.latitude, b.longitude))
            .expect("scraped coordinates are never NaN")
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::{aggregate, rows, AreaCounts};
    use crate::{CoordKey, Node};

    fn route(name: &str, types: &[&str], views: u64) -> Node {
        Node::Route {
            name: name.to_owned(),
            views,
            types: types.iter().map(|&t| t.to_owned()).collect(),
        }
    }

    fn area(name: &str, coord: Option<(f64, f64)>, children: Vec<Node>) -> Node {
        Node::Area {
            name: name.to_owned(),
            coord: coord.map(|(lat, lon)| CoordKey { lat, lon }),
            views: 0,
            children,
        }
    }

    /// The worked scenario: a keyless root over one sub-area with a
    /// trad route and a boulder problem.
    fn sample_tree() -> Node {
        area(
            "All",
            None,
            vec![area(
                "X",
                Some((10.0, 20.0)),
                vec![route("r1", &["trad"], 50), route("r2", &["boulder"], 10)],
            )],
        )
    }

    #[test]
    fn test_sample_tree_counts() {
        let counts = aggregate(&sample_tree());
        assert_eq!(counts.len(), 1);
        let record = &counts[&CoordKey { lat: 10.0, lon: 20.0 }];
        assert_eq!(record.n_rock, 1);
        assert_eq!(record.n_boulder, 1);
        assert_eq!(record.n_winter, 0);
        assert_eq!(record.n_views, 60);
        assert_eq!(record.name, "X");
    }

    #[test]
    fn test_views_above_first_key_are_dropped() {
        let tree = Node::Area {
            name: "root".to_owned(),
            coord: None,
            views: 100,
            children: vec![area(
                "keyed",
                Some((10.0, 20.0)),
                vec![route("r", &["trad"], 5)],
            )],
        };
        let counts = aggregate(&tree);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&CoordKey { lat: 10.0, lon: 20.0 }].n_views, 5);
    }

    #[test]
    fn test_child_key_overrides_parent() {
        let tree = area(
            "root",
            Some((40.0, -100.0)),
            vec![
                area(
                    "own-coord",
                    Some((37.0, -119.0)),
                    vec![route("r", &["sport"], 5)],
                ),
                area("inherits", None, vec![route("s", &["ice"], 7)]),
            ],
        );
        let counts = aggregate(&tree);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&CoordKey { lat: 37.0, lon: -119.0 }].n_rock, 1);
        let root_record = &counts[&CoordKey { lat: 40.0, lon: -100.0 }];
        assert_eq!(root_record.n_winter, 1);
        assert_eq!(root_record.n_views, 7);
        assert_eq!(root_record.name, "root");
    }

    #[test]
    fn test_type_buckets_are_exclusive() {
        // A route tagged both boulder and ice counts once, as boulder.
        let tree = area(
            "a",
            Some((1.0, 2.0)),
            vec![route("odd", &["boulder", "ice"], 0)],
        );
        let counts = aggregate(&tree);
        let record = &counts[&CoordKey { lat: 1.0, lon: 2.0 }];
        assert_eq!(
            (record.n_boulder, record.n_winter, record.n_rock),
            (1, 0, 0)
        );
    }

    #[test]
    fn test_unrecognized_type_counts_as_rock() {
        let tree = area("a", Some((1.0, 2.0)), vec![route("r", &["aid"], 0)]);
        let counts = aggregate(&tree);
        assert_eq!(counts[&CoordKey { lat: 1.0, lon: 2.0 }].n_rock, 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let tree = sample_tree();
        let first = aggregate(&tree);
        let second = aggregate(&tree);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_drop_routeless_records() {
        let tree = area(
            "root",
            Some((40.0, -100.0)),
            vec![area("viewed-but-empty", Some((41.0, -101.0)), vec![])],
        );
        let mut counts = aggregate(&tree);
        // Give the root some routes so exactly one row survives.
        counts
            .get_mut(&CoordKey { lat: 40.0, lon: -100.0 })
            .unwrap()
            .n_rock = 2;
        let rows = rows(&counts);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "root");
    }

    #[test]
    fn test_rows_sorted_by_coordinate() {
        let mut counts = std::collections::HashMap::new();
        for (lat, lon) in [(39.0, -105.0), (37.0, -119.0), (37.0, -120.0)] {
            counts.insert(
                CoordKey { lat, lon },
                AreaCounts {
                    name: String::new(),
                    n_rock: 1,
                    ..AreaCounts::default()
                },
            );
        }
        let rows = rows(&counts);
        assert_eq!(rows[0].longitude, -120.0);
        assert_eq!(rows[2].latitude, 39.0);
    }
}
