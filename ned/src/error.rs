use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NedError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tile name {0}")]
    TileName(PathBuf),

    #[error("invalid tile file len {0} for {1}")]
    TileLen(u64, PathBuf),

    #[error("no height files in {0}")]
    NoTiles(PathBuf),
}
