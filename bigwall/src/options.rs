use clap::{Args, Parser};
use std::path::PathBuf;

/// Find big walls: scan elevation data for cliff footprints and
/// cross-reference them with scraped climbing-area data.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Scan elevation tiles for tall, steep cliff footprints.
    Footprints(Footprints),

    /// Aggregate a scraped climbing-area tree into per-coordinate
    /// route counts.
    Areas(Areas),

    /// Append lithology, population, and road-proximity columns to a
    /// footprint table.
    Data(Data),

    /// Associate aggregated climbing areas with cliff footprints.
    Join(Join),
}

#[derive(Debug, Clone, Args)]
pub struct Footprints {
    /// Directory of .hgt elevation tiles.
    #[arg(short, long)]
    pub dem_dir: PathBuf,

    /// Search-boundary GeoJSON; grid tiles not intersecting it are
    /// skipped.
    #[arg(short, long)]
    pub boundary: Option<PathBuf>,

    /// Directory exported assets are written into.
    #[arg(short, long)]
    pub asset_dir: PathBuf,

    /// Exported asset name.
    #[arg(short, long, default_value = "footprints.csv")]
    pub name: String,

    /// Slope threshold in degrees; steeper cells count as cliff.
    #[arg(long, default_value_t = 70.0)]
    pub steep_threshold: f64,

    /// Regions must rise strictly more than this many meters.
    #[arg(long, default_value_t = 50.0)]
    pub height_threshold: f64,

    /// Elevation sampling density, cells per degree.
    #[arg(long, default_value_t = 3600)]
    pub samples_per_degree: u32,

    /// Douglas-Peucker tolerance for footprint rings, degrees.
    #[arg(long, default_value_t = 5e-4)]
    pub simplify_epsilon: f64,

    /// Dilation radius applied before vectorizing, in cells.
    #[arg(long, default_value_t = 1)]
    pub buffer_cells: usize,

    /// Footprint centroids are rounded to this many degrees.
    #[arg(long, default_value_t = 1e-2)]
    pub centroid_round: f64,

    /// Western edge of the scan grid, degrees longitude.
    #[arg(long, default_value_t = -125.0)]
    pub xmin: f64,

    /// Eastern edge of the scan grid.
    #[arg(long, default_value_t = -102.0)]
    pub xmax: f64,

    /// Southern edge of the scan grid, degrees latitude.
    #[arg(long, default_value_t = 31.0)]
    pub ymin: f64,

    /// Northern edge of the scan grid.
    #[arg(long, default_value_t = 49.0)]
    pub ymax: f64,

    /// Grid tile size, degrees.
    #[arg(long, default_value_t = 0.25)]
    pub step: f64,

    /// Parse elevation tiles into memory instead of memory-mapping
    /// them.
    #[arg(long)]
    pub in_mem: bool,
}

#[derive(Debug, Clone, Args)]
pub struct Areas {
    /// Scraped area-tree JSON file.
    pub input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Maximum allowed disagreement, in degrees, between a node's
    /// coarse coordinate and its high-precision gps pair.
    #[arg(long, default_value_t = 1e-3)]
    pub gps_tolerance: f64,
}

#[derive(Debug, Clone, Args)]
pub struct Data {
    /// Footprint CSV produced by the footprints subcommand.
    pub footprints: PathBuf,

    /// Directory exported assets are written into.
    #[arg(short, long)]
    pub asset_dir: PathBuf,

    /// Exported asset name.
    #[arg(short, long, default_value = "cliff_data.csv")]
    pub name: String,

    /// Road network GeoJSON.
    #[arg(long)]
    pub roads: Option<PathBuf>,

    /// Directory of lithology class tiles (.hgt layout, class codes
    /// as sample values).
    #[arg(long)]
    pub lithology_dir: Option<PathBuf>,

    /// Directory of population tiles (.hgt layout, people per cell).
    #[arg(long)]
    pub population_dir: Option<PathBuf>,

    /// Lithology sampling density, cells per degree.
    #[arg(long, default_value_t = 1200)]
    pub lithology_samples_per_degree: u32,

    /// Population sampling density, cells per degree.
    #[arg(long, default_value_t = 120)]
    pub population_samples_per_degree: u32,
}

#[derive(Debug, Clone, Args)]
pub struct Join {
    /// Footprint CSV, plain or enriched.
    pub footprints: PathBuf,

    /// Aggregated area CSV from the areas subcommand.
    #[arg(long)]
    pub areas: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Association distance: an area attributes its routes to its
    /// nearest footprint within this many meters.
    #[arg(long, default_value_t = 300.0)]
    pub d_assoc: f64,

    /// Vicinity distance: every area within this many meters of a
    /// footprint contributes to its vicinity sums.
    #[arg(long, default_value_t = 800.0)]
    pub d_vicinity: f64,
}
