use crate::options::Areas;
use anyhow::Result;
use log::info;

impl Areas {
    pub fn run(&self) -> Result<()> {
        let tree = areatree::load(&self.input, self.gps_tolerance)?;
        let counts = areatree::aggregate(&tree);
        let rows = areatree::rows(&counts);
        info!(
            "aggregated {} coordinate keys, {} with routes",
            counts.len(),
            rows.len()
        );

        let mut wtr = csv::Writer::from_path(&self.out)?;
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
