use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// The coarse lat/long pair and the high-precision gps pair
    /// disagree. This is a data-integrity fault in the scrape itself
    /// and is not recoverable here; the offending node's URL is the
    /// place to start.
    #[error("inconsistent coordinates ({lat}, {lon}) vs ({gps_lat}, {gps_lon}) at {url}")]
    CoordMismatch {
        lat: f64,
        lon: f64,
        gps_lat: f64,
        gps_lon: f64,
        url: String,
    },

    #[error("unparseable gps pair {pair:?} at {url}")]
    BadGps { pair: String, url: String },
}
