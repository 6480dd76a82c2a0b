use vicsek_common::{Error, Result, SimParams};

/// Holds the flock state vectors.
///
/// A step reads only the `_in` buffers (the frozen state of the previous step)
/// and writes only the `_out` buffers, then swaps them. No particle ever sees a
/// partially updated step.
#[derive(Debug)] // Not Clone: the simulation exclusively owns its state
pub struct ParticleState {
    num_particles: usize,

    // --- Ping-Pong Buffers for Synchronous Update ---
    // Current state (step input)
    pub positions_x_in: Vec<f64>,
    pub positions_y_in: Vec<f64>,
    pub headings_in: Vec<f64>,

    // Next state (step output)
    pub positions_x_out: Vec<f64>,
    pub positions_y_out: Vec<f64>,
    pub headings_out: Vec<f64>,
}

impl ParticleState {
    /// Creates a state from per-particle positions and headings.
    ///
    /// The three slices must have the same non-zero length and every position
    /// must lie inside the domain described by `params`.
    pub fn new(xs: &[f64], ys: &[f64], headings: &[f64], params: &SimParams) -> Result<Self> {
        let n = xs.len();
        if n == 0 {
            return Err(Error::InvalidConfig("a flock needs at least one particle".into()));
        }
        if ys.len() != n || headings.len() != n {
            return Err(Error::InvalidConfig(format!(
                "state length mismatch: {} x, {} y, {} headings",
                n,
                ys.len(),
                headings.len()
            )));
        }
        let outside = xs
            .iter()
            .zip(ys)
            .position(|(&x, &y)| !(0.0..params.world_width).contains(&x) || !(0.0..params.world_height).contains(&y));
        if let Some(idx) = outside {
            return Err(Error::InvalidConfig(format!(
                "particle {} at ({}, {}) lies outside the {}x{} domain",
                idx, xs[idx], ys[idx], params.world_width, params.world_height
            )));
        }
        if let Some(idx) = headings.iter().position(|h| !h.is_finite()) {
            return Err(Error::InvalidConfig(format!("particle {} has a non-finite heading", idx)));
        }

        Ok(Self {
            num_particles: n,
            positions_x_in: xs.to_vec(),
            positions_y_in: ys.to_vec(),
            headings_in: headings.to_vec(),
            positions_x_out: vec![0.0; n],
            positions_y_out: vec![0.0; n],
            headings_out: vec![0.0; n],
        })
    }

    pub fn len(&self) -> usize {
        self.num_particles
    }

    pub fn is_empty(&self) -> bool {
        self.num_particles == 0
    }

    /// Verifies that every buffer still holds exactly one entry per particle.
    pub fn check_invariants(&self) -> Result<()> {
        let n = self.num_particles;
        let lengths = [
            self.positions_x_in.len(),
            self.positions_y_in.len(),
            self.headings_in.len(),
            self.positions_x_out.len(),
            self.positions_y_out.len(),
            self.headings_out.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(Error::InvalidState(format!(
                "buffer lengths {:?} do not match particle count {}",
                lengths, n
            )));
        }
        Ok(())
    }

    /// Swaps the input and output buffers: the freshly written state becomes current.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.positions_x_in, &mut self.positions_x_out);
        std::mem::swap(&mut self.positions_y_in, &mut self.positions_y_out);
        std::mem::swap(&mut self.headings_in, &mut self.headings_out);
    }

    /// Current `(x, y)` of every particle.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.positions_x_in
            .iter()
            .zip(&self.positions_y_in)
            .map(|(&x, &y)| (x, y))
            .collect()
    }

    /// Current headings.
    pub fn headings(&self) -> &[f64] {
        &self.headings_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vicsek_common::SimulationConfig;

    fn params() -> SimParams {
        SimulationConfig::default().get_sim_params()
    }

    #[test]
    fn swap_publishes_the_output_buffers() {
        let mut state = ParticleState::new(&[1.0, 2.0], &[3.0, 4.0], &[0.1, 0.2], &params()).unwrap();
        state.positions_x_out.copy_from_slice(&[5.0, 6.0]);
        state.positions_y_out.copy_from_slice(&[7.0, 8.0]);
        state.headings_out.copy_from_slice(&[0.3, 0.4]);
        state.swap_buffers();
        assert_eq!(state.positions(), vec![(5.0, 7.0), (6.0, 8.0)]);
        assert_eq!(state.headings(), &[0.3, 0.4]);
        assert_eq!(state.len(), 2);
        state.check_invariants().unwrap();
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = ParticleState::new(&[1.0, 2.0], &[3.0], &[0.0, 0.0], &params()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_positions_outside_the_domain() {
        // Default domain is 20 x 20; the upper edge itself is excluded.
        assert!(ParticleState::new(&[20.0], &[1.0], &[0.0], &params()).is_err());
        assert!(ParticleState::new(&[1.0], &[-0.5], &[0.0], &params()).is_err());
        assert!(ParticleState::new(&[], &[], &[], &params()).is_err());
    }

    #[test]
    fn detects_corrupted_buffers() {
        let mut state = ParticleState::new(&[1.0], &[1.0], &[0.0], &params()).unwrap();
        state.headings_out.push(0.0);
        assert!(matches!(state.check_invariants(), Err(Error::InvalidState(_))));
    }
}
