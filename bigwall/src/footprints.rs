use crate::{
    export::{wait_all, AssetDir, ExportJob, ExportSink},
    options::Footprints,
    progress,
};
use anyhow::Result;
use cliffscan::{open_boundary, scan_tile, Footprint, GridBounds, ScanParams};
use indicatif::{MultiProgress, ProgressDrawTarget};
use log::info;
use ned::{TileMode, TileStore};
use rayon::prelude::*;

impl Footprints {
    pub fn run(&self) -> Result<()> {
        let boundary = self.boundary.as_deref().map(open_boundary).transpose()?;
        let bounds = GridBounds {
            xmin: self.xmin,
            xmax: self.xmax,
            ymin: self.ymin,
            ymax: self.ymax,
            dx: self.step,
            dy: self.step,
        };
        let grid = bounds.build_grid(boundary.as_ref());
        info!("scanning {} grid tiles", grid.len());

        let tile_mode = if self.in_mem {
            TileMode::InMem
        } else {
            TileMode::MemMap
        };
        let store = TileStore::open(self.dem_dir.clone(), tile_mode)?;
        let params = ScanParams {
            steep_threshold: self.steep_threshold,
            height_threshold: self.height_threshold,
            buffer_cells: self.buffer_cells,
            simplify_epsilon: self.simplify_epsilon,
            centroid_round: self.centroid_round,
            samples_per_degree: self.samples_per_degree,
        };

        let progress_group = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(4));
        let pb = progress_group.add(progress::bar("Scan".to_owned(), grid.len() as u64));
        let per_tile: Vec<Vec<Footprint>> = grid
            .par_iter()
            .map(|rect| {
                let footprints = scan_tile(&store, rect, &params);
                pb.inc(1);
                footprints
            })
            .collect::<Result<_, _>>()?;
        pb.finish();

        let footprints: Vec<Footprint> = per_tile.into_iter().flatten().collect();
        info!("found {} footprints", footprints.len());

        let mut payload = Vec::new();
        {
            let mut wtr = csv::Writer::from_writer(&mut payload);
            for footprint in &footprints {
                wtr.serialize(footprint)?;
            }
            wtr.flush()?;
        }

        let sink = AssetDir::new(self.asset_dir.clone());
        let handle = sink.submit(ExportJob {
            name: self.name.clone(),
            payload,
        });
        wait_all(&sink, &[handle])
    }
}
