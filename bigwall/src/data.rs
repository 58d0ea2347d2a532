use crate::{
    export::{wait_all, AssetDir, ExportJob, ExportSink},
    options::Data,
    progress,
};
use anyhow::{anyhow, Result};
use cliffscan::{
    class_histogram, lithology_fractions, population_within, Footprint, LithologyFractions,
    RoadIndex, METERS_PER_DEG,
};
use geo::{
    geometry::{Coord, Rect},
    BoundingRect,
};
use log::info;
use ned::{Raster, TileMode, TileStore};
use rayon::prelude::*;
use serde::Serialize;

const POPULATION_RADII_KM: [f64; 3] = [30.0, 60.0, 100.0];
const ROAD_DISTANCES_M: [f64; 4] = [500.0, 1000.0, 1500.0, 2000.0];

/// A footprint row with every enrichment column appended.
///
/// Column order matters downstream, so the footprint's own columns
/// are repeated here rather than flattened from the source struct.
#[derive(Debug, Clone, Serialize)]
struct EnrichedRow {
    height: f64,
    pixel_count: u64,
    latitude: f64,
    longitude: f64,
    elevation: f64,
    slope_p10: f64,
    slope_p20: f64,
    slope_p30: f64,
    slope_p40: f64,
    slope_p50: f64,
    slope_p60: f64,
    slope_p70: f64,
    slope_p80: f64,
    slope_p90: f64,
    #[serde(rename = ".geo")]
    geo: String,

    geology_carbonate: f64,
    geology_non_carbonate: f64,
    geology_silicic_residual: f64,
    geology_colluvial_sediment: f64,
    geology_glacial_till_coarse: f64,
    geology_alluvium: f64,

    population_within_30km: f64,
    population_within_60km: f64,
    population_within_100km: f64,

    road_within_500m: bool,
    road_within_1000m: bool,
    road_within_1500m: bool,
    road_within_2000m: bool,
}

impl Data {
    pub fn run(&self) -> Result<()> {
        let mut rdr = csv::Reader::from_path(&self.footprints)?;
        let footprints: Vec<Footprint> = rdr.deserialize().collect::<Result<_, _>>()?;
        info!("enriching {} footprints", footprints.len());

        let roads = self.roads.as_deref().map(RoadIndex::open).transpose()?;
        let lithology = self
            .lithology_dir
            .clone()
            .map(|dir| TileStore::open(dir, TileMode::MemMap))
            .transpose()?;
        let population = self
            .population_dir
            .clone()
            .map(|dir| TileStore::open(dir, TileMode::MemMap))
            .transpose()?;

        let pb = progress::bar("Enrich".to_owned(), footprints.len() as u64);
        let rows: Vec<EnrichedRow> = footprints
            .par_iter()
            .map(|footprint| {
                let row =
                    self.enrich(footprint, roads.as_ref(), lithology.as_ref(), population.as_ref());
                pb.inc(1);
                row
            })
            .collect::<Result<_, _>>()?;
        pb.finish();

        let mut payload = Vec::new();
        {
            let mut wtr = csv::Writer::from_writer(&mut payload);
            for row in &rows {
                wtr.serialize(row)?;
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

    fn enrich(
        &self,
        footprint: &Footprint,
        roads: Option<&RoadIndex>,
        lithology: Option<&TileStore>,
        population: Option<&TileStore>,
    ) -> Result<EnrichedRow> {
        let center = Coord {
            x: footprint.longitude,
            y: footprint.latitude,
        };

        let geology = match lithology {
            Some(store) => {
                let polygon = footprint.polygon()?;
                let rect = polygon
                    .bounding_rect()
                    .ok_or_else(|| anyhow!("footprint polygon has no extent"))?;
                let raster = Raster::window(store, &rect, self.lithology_samples_per_degree)?;
                lithology_fractions(&class_histogram(&raster, &polygon))
            }
            None => LithologyFractions::default(),
        };

        let [population_within_30km, population_within_60km, population_within_100km] =
            match population {
                Some(store) => {
                    // One window at the largest radius serves all
                    // three sums.
                    let max_km = POPULATION_RADII_KM[POPULATION_RADII_KM.len() - 1];
                    let dlat = max_km * 1000.0 / METERS_PER_DEG;
                    let dlon = dlat / footprint.latitude.to_radians().cos();
                    let rect = Rect::new(
                        Coord {
                            x: center.x - dlon,
                            y: center.y - dlat,
                        },
                        Coord {
                            x: center.x + dlon,
                            y: center.y + dlat,
                        },
                    );
                    let raster = Raster::window(store, &rect, self.population_samples_per_degree)?;
                    POPULATION_RADII_KM.map(|km| population_within(&raster, center, km))
                }
                None => [0.0; 3],
            };

        let [road_within_500m, road_within_1000m, road_within_1500m, road_within_2000m] =
            ROAD_DISTANCES_M.map(|dist| roads.is_some_and(|index| index.within(center, dist)));

        Ok(EnrichedRow {
            height: footprint.height,
            pixel_count: footprint.pixel_count,
            latitude: footprint.latitude,
            longitude: footprint.longitude,
            elevation: footprint.elevation,
            slope_p10: footprint.slope_p10,
            slope_p20: footprint.slope_p20,
            slope_p30: footprint.slope_p30,
            slope_p40: footprint.slope_p40,
            slope_p50: footprint.slope_p50,
            slope_p60: footprint.slope_p60,
            slope_p70: footprint.slope_p70,
            slope_p80: footprint.slope_p80,
            slope_p90: footprint.slope_p90,
            geo: footprint.geo.clone(),
            geology_carbonate: geology.geology_carbonate,
            geology_non_carbonate: geology.geology_non_carbonate,
            geology_silicic_residual: geology.geology_silicic_residual,
            geology_colluvial_sediment: geology.geology_colluvial_sediment,
            geology_glacial_till_coarse: geology.geology_glacial_till_coarse,
            geology_alluvium: geology.geology_alluvium,
            population_within_30km,
            population_within_60km,
            population_within_100km,
            road_within_500m,
            road_within_1000m,
            road_within_1500m,
            road_within_2000m,
        })
    }
}
