use serde::Serialize;
use std::path::Path;
use vicsek_common::{Error, Result};

use crate::simulation::VicsekSimulation;

#[derive(Debug, Serialize)]
struct FinalPositionRecord {
    index: usize,
    x: f64,
    y: f64,
    heading: f64,
}

/// Writes `index,x,y,heading` for every particle of the current state.
pub fn save_final_positions<P: AsRef<Path>>(path: P, sim: &VicsekSimulation) -> Result<()> {
    let csv_err = |e: csv::Error| Error::Serialization(e.to_string());
    let mut writer = csv::Writer::from_path(path.as_ref()).map_err(csv_err)?;
    let headings = sim.state().headings();
    for (index, ((x, y), &heading)) in sim.get_results().into_iter().zip(headings).enumerate() {
        writer
            .serialize(FinalPositionRecord { index, x, y, heading })
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vicsek_common::SimulationConfig;

    #[test]
    fn csv_has_header_and_one_row_per_particle() {
        let sim = VicsekSimulation::from_state(
            SimulationConfig::default(),
            &[1.5, 2.25],
            &[3.0, 4.75],
            &[0.5, -0.25],
            1,
        )
        .unwrap();
        let path = std::env::temp_dir().join(format!("vicsek_final_{}.csv", std::process::id()));
        save_final_positions(&path, &sim).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["index,x,y,heading", "0,1.5,3.0,0.5", "1,2.25,4.75,-0.25"]);
    }
}
