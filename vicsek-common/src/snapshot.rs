use serde::{Serialize, Deserialize};
use crate::config::SnapshotFormat;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// The flock after a given number of completed steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Completed steps when this snapshot was taken (0 for the initial state).
    pub step: u32,
    pub particle_count: u32,
    /// Polar order `|sum(cos θ, sin θ)| / N`: 1 when every heading agrees, near 0 when disordered.
    pub order_parameter: f64,
    /// Mean neighbor-set size (self included) seen during the step that produced this state.
    /// Zero for the initial state.
    pub mean_neighbor_count: f64,
    /// `(x, y)` of every particle, in particle-index order.
    pub positions: Vec<(f64, f64)>,
    /// Per-particle headings, present only when `output.save_headings_in_snapshot` is set.
    pub headings: Option<Vec<f64>>,
}

/// Writes all snapshots to `path` in the given format.
pub fn write_snapshots<P: AsRef<Path>>(path: P, format: SnapshotFormat, snapshots: &[Snapshot]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .map_err(|e| Error::Serialization(e.to_string()))?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .map_err(|e| Error::Serialization(e.to_string()))?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshots)
            .map_err(|e| Error::Serialization(e.to_string()))?,
    }
    writer.flush()?;
    Ok(())
}

/// Reads a snapshot file, choosing the codec from its extension.
pub fn read_snapshots<P: AsRef<Path>>(path: P) -> Result<Vec<Snapshot>> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path).ok_or_else(|| {
        Error::InvalidConfig(format!("cannot infer snapshot format from '{}'", path.display()))
    })?;
    let reader = BufReader::new(File::open(path)?);
    let snapshots = match format {
        SnapshotFormat::Json => serde_json::from_reader(reader)
            .map_err(|e| Error::Serialization(e.to_string()))?,
        SnapshotFormat::Bincode => bincode::deserialize_from(reader)
            .map_err(|e| Error::Serialization(e.to_string()))?,
        SnapshotFormat::MessagePack => rmp_serde::from_read(reader)
            .map_err(|e| Error::Serialization(e.to_string()))?,
    };
    Ok(snapshots)
}
