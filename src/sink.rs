use vicsek_common::{Result, Snapshot};

/// Receives the flock after every completed step, in step order.
///
/// Sinks get read-only snapshots; the simulation keeps ownership of its state.
pub trait FrameSink {
    fn accept(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Called once after the last step.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every `interval`-th frame plus the final one in memory.
#[derive(Debug)]
pub struct SnapshotRecorder {
    interval: u32,
    total_steps: u32,
    snapshots: Vec<Snapshot>,
}

impl SnapshotRecorder {
    /// `interval` of 0 is treated as 1.
    pub fn new(interval: u32, total_steps: u32) -> Self {
        Self {
            interval: interval.max(1),
            total_steps,
            snapshots: Vec::new(),
        }
    }

    pub fn should_record(&self, step: u32) -> bool {
        step % self.interval == 0 || step == self.total_steps
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

impl FrameSink for SnapshotRecorder {
    fn accept(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.should_record(snapshot.step) {
            self.snapshots.push(snapshot.clone());
        }
        Ok(())
    }
}

impl FrameSink for Vec<Snapshot> {
    fn accept(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(step: u32) -> Snapshot {
        Snapshot {
            step,
            particle_count: 1,
            order_parameter: 1.0,
            mean_neighbor_count: 1.0,
            positions: vec![(0.0, 0.0)],
            headings: None,
        }
    }

    #[test]
    fn records_interval_and_final_step() {
        let mut recorder = SnapshotRecorder::new(3, 10);
        for step in 0..=10 {
            recorder.accept(&frame(step)).unwrap();
        }
        let steps: Vec<u32> = recorder.snapshots().iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![0, 3, 6, 9, 10]);
    }

    #[test]
    fn zero_interval_records_everything() {
        let mut recorder = SnapshotRecorder::new(0, 4);
        for step in 1..=4 {
            recorder.accept(&frame(step)).unwrap();
        }
        assert_eq!(recorder.into_snapshots().len(), 4);
    }
}
