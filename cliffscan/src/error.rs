use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Ned(#[from] ned::NedError),

    #[error("{0}")]
    Geojson(#[from] geojson::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a polygon geometry")]
    NotAPolygon,
}
