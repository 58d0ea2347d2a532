//! Region boundary loading.

use crate::ScanError;
use geo::GeometryCollection;
use geojson::{quick_collection, GeoJson};
use std::{fs::File, path::Path};

/// Loads a boundary geometry (country or state outline) from a
/// GeoJSON file. Grid tiles disjoint from the boundary are dropped
/// before any elevation work happens.
pub fn open(path: &Path) -> Result<GeometryCollection, ScanError> {
    let file = File::open(path)?;
    let json = GeoJson::from_reader(file)?;
    let collection: GeometryCollection<f64> = quick_collection(&json)?;
    Ok(collection)
}
