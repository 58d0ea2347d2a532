use crate::options::Join;
use anyhow::Result;
use cliffjoin::{AreaPoint, CliffShape, JoinParams};
use cliffscan::Footprint;
use geo::geometry::Coord;
use log::info;
use serde::Deserialize;

/// The columns of the aggregated area table this stage consumes.
/// Discipline counts other than rock pass through the areas CSV but
/// play no part in the join.
#[derive(Debug, Deserialize)]
struct AreaRecord {
    latitude: f64,
    longitude: f64,
    name: String,
    n_rock: u64,
    n_views: u64,
}

impl Join {
    pub fn run(&self) -> Result<()> {
        // The footprint table is carried through column-for-column,
        // so rows are kept raw alongside their decoded geometry.
        let mut rdr = csv::Reader::from_path(&self.footprints)?;
        let headers = rdr.headers()?.clone();
        let mut records = Vec::new();
        let mut cliffs = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let footprint: Footprint = record.deserialize(Some(&headers))?;
            cliffs.push(CliffShape {
                centroid: Coord {
                    x: footprint.longitude,
                    y: footprint.latitude,
                },
                polygon: footprint.polygon()?,
            });
            records.push(record);
        }

        let mut areas_rdr = csv::Reader::from_path(&self.areas)?;
        let areas: Vec<AreaPoint> = areas_rdr
            .deserialize()
            .map(|record| {
                record.map(|area: AreaRecord| AreaPoint {
                    latitude: area.latitude,
                    longitude: area.longitude,
                    name: area.name,
                    n_rock: area.n_rock,
                    n_views: area.n_views,
                })
            })
            .collect::<Result<_, _>>()?;
        let params = JoinParams {
            d_assoc: self.d_assoc,
            d_vicinity: self.d_vicinity,
        };

        // Working-set clip: the scraped tree spans the whole country
        // while the footprints cover one study region. The padding is
        // generous enough that no area in reach of any footprint is
        // dropped.
        let pad = 2.0 * params.d_assoc.max(params.d_vicinity) / cliffscan::METERS_PER_DEG;
        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for cliff in &cliffs {
            for coord in cliff.polygon.exterior().coords() {
                xmin = xmin.min(coord.x);
                xmax = xmax.max(coord.x);
                ymin = ymin.min(coord.y);
                ymax = ymax.max(coord.y);
            }
        }
        let total_areas = areas.len();
        let areas: Vec<AreaPoint> = areas
            .into_iter()
            .filter(|area| {
                area.longitude >= xmin - pad
                    && area.longitude <= xmax + pad
                    && area.latitude >= ymin - pad
                    && area.latitude <= ymax + pad
            })
            .collect();
        info!(
            "joining {} footprints with {} of {} areas",
            cliffs.len(),
            areas.len(),
            total_areas
        );
        let joined = cliffjoin::join(&cliffs, &areas, &params);

        let mut wtr = csv::Writer::from_path(&self.out)?;
        let out_headers: Vec<&str> = headers
            .iter()
            .chain([
                "name",
                "n_rock",
                "n_views",
                "vicinity_n_rock",
                "vicinity_n_views",
                "vicinity_n_areas",
            ])
            .collect();
        wtr.write_record(&out_headers)?;
        for (record, result) in records.iter().zip(&joined) {
            let mut fields: Vec<String> = record.iter().map(str::to_owned).collect();
            fields.push(result.name.clone());
            fields.push(result.n_rock.to_string());
            fields.push(result.n_views.to_string());
            fields.push(result.vicinity_n_rock.to_string());
            fields.push(result.vicinity_n_views.to_string());
            fields.push(result.vicinity_n_areas.to_string());
            wtr.write_record(&fields)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
