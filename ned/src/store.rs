//! On-demand elevation tile cache.

use crate::{NedError, Tile, C};
use dashmap::DashMap;
use geo::geometry::Coord;
use log::debug;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Clone)]
pub struct TileStore {
    /// Directory containing `.hgt` tile files.
    tile_dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    tile_mode: TileMode,

    /// Tiles which have been loaded on demand, keyed by integer
    /// southwest corner.
    tiles: DashMap<Coord<i16>, Arc<Tile>>,
}

impl TileStore {
    /// Opens a store over `tile_dir`.
    ///
    /// Fails early if the directory contains no `.hgt` files at all, a
    /// near-certain sign of a misconfigured path.
    pub fn open(tile_dir: PathBuf, tile_mode: TileMode) -> Result<Self, NedError> {
        let mut has_height_files = false;
        for entry in std::fs::read_dir(&tile_dir)? {
            let path = entry?.path();
            if Some("hgt") == path.extension().and_then(std::ffi::OsStr::to_str) {
                has_height_files = true;
                break;
            }
        }

        if has_height_files {
            Ok(Self {
                tile_dir,
                tile_mode,
                tiles: DashMap::new(),
            })
        } else {
            Err(NedError::NoTiles(tile_dir))
        }
    }

    /// Returns the tile containing `coord`.
    ///
    /// The tile is fetched from disk the first time any coordinate
    /// within it is requested. A missing tile file resolves to a
    /// zero-elevation tombstone rather than an error, as scans
    /// routinely wander over ocean or unscanned degree cells.
    pub fn get(&self, coord: Coord<C>) -> Result<Arc<Tile>, NedError> {
        let sw_corner = sw_corner(coord);
        self.tiles
            .entry(sw_corner)
            .or_try_insert_with(|| match self.load_tile(sw_corner) {
                Ok(tile) => Ok(Arc::new(tile)),
                Err(NedError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    debug!("tombstoning missing tile for {sw_corner:?}");
                    Ok(Arc::new(Tile::tombstone(sw_corner)))
                }
                Err(e) => Err(e),
            })
            .map(|r| r.clone())
    }

    /// Elevation at `coord`, in meters. Coordinates outside any loaded
    /// tile's extent read as 0.
    pub fn elevation(&self, coord: Coord<C>) -> Result<f64, NedError> {
        let tile = self.get(coord)?;
        Ok(f64::from(tile.get(coord).unwrap_or(0)))
    }
}

/// Private API.
impl TileStore {
    fn load_tile(&self, sw_corner: Coord<i16>) -> Result<Tile, NedError> {
        let tile_path = {
            let file_name = file_name(sw_corner);
            let mut tile_path: PathBuf = [&self.tile_dir, Path::new(&file_name)].iter().collect();
            if !tile_path.exists() {
                let file_name = file_name.to_lowercase();
                tile_path = [&self.tile_dir, Path::new(&file_name)].iter().collect();
            }
            tile_path
        };
        debug!("loading {tile_path:?}");
        match self.tile_mode {
            TileMode::InMem => Tile::load(tile_path),
            TileMode::MemMap => Tile::memmap(tile_path),
        }
    }
}

/// How to hold tile contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse tile and load into memory.
    InMem,

    /// Memory map file contents.
    MemMap,
}

/// Returns the integer southwest corner of the degree cell containing
/// `coord`.
fn sw_corner(Coord { x, y }: Coord<C>) -> Coord<i16> {
    #[allow(clippy::cast_possible_truncation)]
    Coord {
        x: (x.floor() as i16),
        y: (y.floor() as i16),
    }
}

/// Returns the expected file name for a tile's southwest corner.
fn file_name(Coord { x, y }: Coord<i16>) -> String {
    let (n_s, lat) = if y.is_negative() {
        ('S', y.abs())
    } else {
        ('N', y)
    };
    let (e_w, lon) = if x.is_negative() {
        ('W', x.abs())
    } else {
        ('E', x)
    };
    format!("{n_s}{lat:02}{e_w}{lon:03}.hgt")
}

#[cfg(test)]
mod tests {
    use super::{file_name, sw_corner, Coord};

    #[test]
    fn test_file_name_quadrants() {
        let name = file_name(sw_corner(Coord {
            y: 37.7,
            x: -119.6,
        }));
        assert_eq!(name, "N37W120.hgt");

        let name = file_name(sw_corner(Coord {
            y: 0.0 + f64::EPSILON,
            x: 0.0 + f64::EPSILON,
        }));
        assert_eq!(name, "N00E000.hgt");

        let name = file_name(sw_corner(Coord {
            y: 0.0 - f64::EPSILON,
            x: 0.0 - f64::EPSILON,
        }));
        assert_eq!(name, "S01W001.hgt");
    }
}
