//! Gridded elevation (`.hgt`) tiles and dense raster windows.
//!
//! A [`Tile`] is a single 1°×1° grid of big-endian `i16` samples named
//! in the `N44W072.hgt` style, where the file name gives the southwest
//! corner and the file length implies the grid dimension. A
//! [`TileStore`] caches tiles on demand from a directory, substituting
//! zero-elevation tombstones for missing files so scans over mixed
//! land/ocean regions never fail on coverage gaps. A [`Raster`] is a
//! dense window sampled through a store over an arbitrary bounding box,
//! which is the form the cliff scanner consumes.

mod error;
mod raster;
mod store;

pub use crate::{
    error::NedError,
    raster::Raster,
    store::{TileMode, TileStore},
};
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, mem::size_of, path::Path};

/// Base floating point type used for all coordinates.
pub type C = f64;

const ARCSEC_PER_DEG: C = 3600.0;

/// One 1°×1° elevation grid.
pub struct Tile {
    /// Center of the southwest-most sample.
    sw_center: Coord<C>,

    /// Arcseconds per sample.
    resolution: u8,

    /// Samples per side; tiles are always square.
    dim: usize,

    /// Elevation samples, row-major from the northwest corner.
    samples: SampleStore,
}

enum SampleStore {
    /// Stands in for a tile file that does not exist. All lookups
    /// return 0.
    Tombstone,
    InMem(Box<[i16]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get(&self, index: usize) -> i16 {
        match self {
            Self::Tombstone => 0,
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<i16>();
                let end = start + size_of::<i16>();
                let bytes = &mut &raw.as_ref()[start..end];
                bytes.read_i16::<BE>().unwrap()
            }
        }
    }
}

impl Tile {
    /// Returns a Tile read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NedError> {
        let (resolution, dim) = extract_dim(&path)?;
        let sw_center = sw_center(&path)?;
        let mut file = BufReader::new(File::open(path)?);
        let samples = {
            let mut samples = Vec::with_capacity(dim * dim);
            for _ in 0..(dim * dim) {
                samples.push(file.read_i16::<BE>()?);
            }
            SampleStore::InMem(samples.into_boxed_slice())
        };
        Ok(Self {
            sw_center,
            resolution,
            dim,
            samples,
        })
    }

    /// Returns a Tile backed by the memory-mapped file at `path`.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, NedError> {
        let (resolution, dim) = extract_dim(&path)?;
        let sw_center = sw_center(&path)?;
        let samples = {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap(mmap)
        };
        Ok(Self {
            sw_center,
            resolution,
            dim,
            samples,
        })
    }

    /// Returns an all-zero stand-in tile for `sw_corner`.
    pub fn tombstone(sw_corner: Coord<i16>) -> Self {
        Self {
            sw_center: Coord {
                x: C::from(sw_corner.x),
                y: C::from(sw_corner.y),
            },
            resolution: 1,
            dim: 3601,
            samples: SampleStore::Tombstone,
        }
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.dim * self.dim
    }

    /// Returns this tile's resolution in arcseconds per sample.
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// Returns the sample at the given geo coordinates, or `None` if
    /// `coord` falls outside the tile.
    pub fn get(&self, coord: Coord<C>) -> Option<i16> {
        let (col, row) = self.coord_to_xy(coord);
        #[allow(clippy::cast_possible_wrap)]
        if 0 <= col && col < self.dim as isize && 0 <= row && row < self.dim as isize {
            #[allow(clippy::cast_sign_loss)]
            Some(self.get_xy((col as usize, row as usize)))
        } else {
            None
        }
    }
}

/// Private API.
impl Tile {
    fn get_xy(&self, (x, y): (usize, usize)) -> i16 {
        // Row 0 of the file is the northernmost row; y counts up from
        // the southwest corner.
        let index = self.dim * (self.dim - y - 1) + x;
        self.samples.get(index)
    }

    fn coord_to_xy(&self, coord: Coord<C>) -> (isize, isize) {
        let samples_per_deg = ARCSEC_PER_DEG / C::from(self.resolution);
        // Samples are georeferenced by their centers, so nudge by half
        // a cell before truncating.
        let half_cell = 1.0 / (samples_per_deg * 2.0);
        #[allow(clippy::cast_possible_truncation)]
        let x = ((coord.x - self.sw_center.x + half_cell) * samples_per_deg) as isize;
        #[allow(clippy::cast_possible_truncation)]
        let y = ((coord.y - self.sw_center.y + half_cell) * samples_per_deg) as isize;
        (x, y)
    }
}

fn extract_dim<P: AsRef<Path>>(path: P) -> Result<(u8, usize), NedError> {
    const LEN_1_ARCSEC: u64 = 3601 * 3601 * size_of::<i16>() as u64;
    const LEN_3_ARCSEC: u64 = 1201 * 1201 * size_of::<i16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        LEN_1_ARCSEC => Ok((1, 3601)),
        LEN_3_ARCSEC => Ok((3, 1201)),
        invalid_len => Err(NedError::TileLen(invalid_len, path.as_ref().to_owned())),
    }
}

fn sw_center<P: AsRef<Path>>(path: P) -> Result<Coord<C>, NedError> {
    let Coord { x, y } = parse_sw_corner(path)?;
    Ok(Coord {
        x: C::from(x),
        y: C::from(y),
    })
}

/// Parses the integer southwest corner out of a `N44W072.hgt` style
/// file name.
pub(crate) fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, NedError> {
    let mk_err = || NedError::TileName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" => 1,
        "S" => -1,
        _ => return Err(mk_err()),
    };
    let lon_sign = match &name[3..4] {
        "E" => 1,
        "W" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}

#[cfg(test)]
mod tests {
    use super::{parse_sw_corner, Coord, Tile};

    #[test]
    fn test_parse_sw_corner() {
        let corner = parse_sw_corner("N44W072.hgt").unwrap();
        assert_eq!(corner, Coord { x: -72, y: 44 });
        let corner = parse_sw_corner("S33E151.hgt").unwrap();
        assert_eq!(corner, Coord { x: 151, y: -33 });
    }

    #[test]
    fn test_parse_bad_name() {
        assert!(parse_sw_corner("Q44W072.hgt").is_err());
        assert!(parse_sw_corner("N44W72.hgt").is_err());
        assert!(parse_sw_corner("elevation.hgt").is_err());
    }

    #[test]
    fn test_tombstone_lookup() {
        let tile = Tile::tombstone(Coord { x: -120, y: 37 });
        assert_eq!(tile.get(Coord { x: -119.5, y: 37.5 }), Some(0));
        // A smidge outside in every direction returns None.
        assert_eq!(tile.get(Coord { x: -120.1, y: 37.5 }), None);
        assert_eq!(tile.get(Coord { x: -118.9, y: 37.5 }), None);
        assert_eq!(tile.get(Coord { x: -119.5, y: 36.9 }), None);
        assert_eq!(tile.get(Coord { x: -119.5, y: 38.1 }), None);
    }
}
