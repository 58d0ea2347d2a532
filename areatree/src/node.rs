//! Scraped tree deserialization and validation.

use crate::TreeError;
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};

/// A node exactly as the scraper wrote it: loosely typed, every field
/// optional except the name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub name: String,

    pub lat: Option<f64>,
    pub long: Option<f64>,

    /// Redundant higher-precision "lat,long" string. Must agree with
    /// `lat`/`long` within tolerance when both are present.
    pub gps2: Option<String>,

    #[serde(default, rename = "totalViews")]
    pub total_views: u64,

    #[serde(default)]
    pub url: String,

    pub types: Option<Vec<String>>,

    pub children: Option<Vec<RawNode>>,
}

/// A validated tree node. Siblings are homogeneous in the source
/// data, so a node is an area exactly when the scraper gave it a
/// children list (possibly empty).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Area {
        name: String,
        coord: Option<CoordKey>,
        views: u64,
        children: Vec<Node>,
    },
    Route {
        name: String,
        views: u64,
        types: Vec<String>,
    },
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Area { name, .. } | Node::Route { name, .. } => name,
        }
    }
}

/// A geographic coordinate usable as a hash key.
///
/// Coordinates are compared bit-for-bit: two nodes share a key only
/// when the scraper copied the exact same pair down the tree, which
/// is precisely the inheritance this key exists to capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordKey {
    pub lat: f64,
    pub lon: f64,
}

impl Eq for CoordKey {}

impl std::hash::Hash for CoordKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

/// Loads and validates a scraped tree.
///
/// The file holds a JSON array of top-level areas; it is wrapped in a
/// synthetic root at the geographic center of the US, matching the
/// shape of every other node.
pub fn load(path: &Path, gps_tolerance: f64) -> Result<Node, TreeError> {
    let file = BufReader::new(File::open(path)?);
    let top_level: Vec<RawNode> = serde_json::from_reader(file)?;
    let root = RawNode {
        name: "All".to_owned(),
        lat: Some(39.0),
        long: Some(-98.0),
        gps2: Some("39.0,-98.0".to_owned()),
        total_views: 0,
        url: "https://mountainproject.com".to_owned(),
        types: None,
        children: Some(top_level),
    };
    convert(root, gps_tolerance)
}

/// Converts a raw node (and its subtree) into the tagged form,
/// validating coordinates along the way.
pub fn convert(raw: RawNode, gps_tolerance: f64) -> Result<Node, TreeError> {
    let RawNode {
        name,
        lat,
        long,
        gps2,
        total_views,
        url,
        types,
        children,
    } = raw;
    let name = clean_name(&name);

    match children {
        Some(children) => {
            let coord = validate_coord(lat, long, gps2.as_deref(), &url, gps_tolerance)?;
            let children = children
                .into_iter()
                .map(|child| convert(child, gps_tolerance))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Area {
                name,
                coord,
                views: total_views,
                children,
            })
        }
        None => Ok(Node::Route {
            name,
            views: total_views,
            types: types.unwrap_or_default(),
        }),
    }
}

/// Resolves a node's coordinate, preferring the high-precision gps
/// pair and insisting it agrees with the coarse pair.
fn validate_coord(
    lat: Option<f64>,
    long: Option<f64>,
    gps2: Option<&str>,
    url: &str,
    tolerance: f64,
) -> Result<Option<CoordKey>, TreeError> {
    let (Some(lat), Some(lon)) = (lat, long) else {
        return Ok(None);
    };
    let Some(gps2) = gps2 else {
        return Ok(Some(CoordKey { lat, lon }));
    };

    let mk_err = || TreeError::BadGps {
        pair: gps2.to_owned(),
        url: url.to_owned(),
    };
    let (gps_lat, gps_lon) = gps2.split_once(',').ok_or_else(mk_err)?;
    let gps_lat: f64 = gps_lat.trim().parse().map_err(|_| mk_err())?;
    let gps_lon: f64 = gps_lon.trim().parse().map_err(|_| mk_err())?;

    if (lat - gps_lat).abs() > tolerance || (lon - gps_lon).abs() > tolerance {
        return Err(TreeError::CoordMismatch {
            lat,
            lon,
            gps_lat,
            gps_lon,
            url: url.to_owned(),
        });
    }
    Ok(Some(CoordKey {
        lat: gps_lat,
        lon: gps_lon,
    }))
}

/// First line of the scraped name, trimmed.
fn clean_name(name: &str) -> String {
    name.lines().next().unwrap_or("").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{clean_name, convert, CoordKey, Node, RawNode};
    use crate::TreeError;

    fn raw(name: &str) -> RawNode {
        RawNode {
            name: name.to_owned(),
            lat: None,
            long: None,
            gps2: None,
            total_views: 0,
            url: format!("https://example.com/{name}"),
            types: None,
            children: None,
        }
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  El Capitan \n  extra scraped junk"), "El Capitan");
        assert_eq!(clean_name("Plain"), "Plain");
    }

    #[test]
    fn test_area_vs_route() {
        let route = convert(raw("route"), 1e-3).unwrap();
        assert!(matches!(route, Node::Route { .. }));

        let mut area = raw("area");
        area.children = Some(vec![]);
        let area = convert(area, 1e-3).unwrap();
        assert!(matches!(area, Node::Area { .. }));
    }

    #[test]
    fn test_gps_pair_wins() {
        let mut node = raw("area");
        node.lat = Some(37.73);
        node.long = Some(-119.63);
        node.gps2 = Some("37.7299,-119.6301".to_owned());
        node.children = Some(vec![]);
        let Node::Area { coord, .. } = convert(node, 1e-3).unwrap() else {
            panic!("expected area");
        };
        assert_eq!(
            coord,
            Some(CoordKey {
                lat: 37.7299,
                lon: -119.6301
            })
        );
    }

    #[test]
    fn test_coord_mismatch_is_fatal() {
        let mut node = raw("area");
        node.lat = Some(37.73);
        node.long = Some(-119.63);
        node.gps2 = Some("38.9,-119.63".to_owned());
        node.children = Some(vec![]);
        let err = convert(node, 1e-3).unwrap_err();
        let TreeError::CoordMismatch { url, .. } = err else {
            panic!("expected coordinate mismatch, got {err}");
        };
        assert!(url.contains("example.com"));
    }

    #[test]
    fn test_bad_gps_string() {
        let mut node = raw("area");
        node.lat = Some(37.73);
        node.long = Some(-119.63);
        node.gps2 = Some("not a pair".to_owned());
        node.children = Some(vec![]);
        assert!(matches!(
            convert(node, 1e-3),
            Err(TreeError::BadGps { .. })
        ));
    }
}
