mod areas;
mod data;
mod export;
mod footprints;
mod join;
mod options;
mod progress;

use anyhow::Result;
use clap::Parser;
use options::Cli;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Footprints(footprints) => footprints.run(),
        Cli::Areas(areas) => areas.run(),
        Cli::Data(data) => data.run(),
        Cli::Join(join) => join.run(),
    }
}
