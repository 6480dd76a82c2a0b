//! Neighbor queries: which particles lie within the interaction radius.
//!
//! Distances are flat Euclidean distances between current positions; the
//! toroidal wrap applies to motion only. A particle is always its own neighbor.

use vicsek_common::{NeighborSearch, Result, SimParams, Vec2};

use crate::grid::SpatialGrid;
use crate::state::ParticleState;

/// `true` when the squared flat distance between the two points is strictly below `radius_sq`.
#[inline(always)]
pub fn within_radius(x1: f64, y1: f64, x2: f64, y2: f64, radius_sq: f64) -> bool {
    Vec2::new(x1, y1).distance_squared(Vec2::new(x2, y2)) < radius_sq
}

/// Pairwise scan. Pushes neighbor indices into `out` in ascending order.
pub fn exhaustive_neighbors(
    particle_idx: usize,
    positions_x: &[f64],
    positions_y: &[f64],
    radius_sq: f64,
    out: &mut Vec<usize>,
) {
    let x = positions_x[particle_idx];
    let y = positions_y[particle_idx];
    out.extend(
        positions_x
            .iter()
            .zip(positions_y)
            .enumerate()
            .filter(|&(_, (ox, oy))| within_radius(x, y, *ox, *oy, radius_sq))
            .map(|(j, _)| j),
    );
}

/// Indices of every particle within `radius` of particle `particle_idx` in the
/// current state, itself included, in ascending order.
pub fn neighbors(state: &ParticleState, particle_idx: usize, radius: f64) -> Vec<usize> {
    let mut out = Vec::new();
    exhaustive_neighbors(
        particle_idx,
        &state.positions_x_in,
        &state.positions_y_in,
        radius * radius,
        &mut out,
    );
    out
}

/// The neighbor search strategy used by a running simulation.
///
/// Both variants yield the same index set, delivered in ascending order so that
/// the heading sum is accumulated identically.
#[derive(Debug)]
pub enum NeighborQuery {
    Exhaustive,
    Grid(SpatialGrid),
}

impl NeighborQuery {
    pub fn new(strategy: NeighborSearch, params: &SimParams) -> Self {
        match strategy {
            NeighborSearch::Exhaustive => NeighborQuery::Exhaustive,
            NeighborSearch::Grid => NeighborQuery::Grid(SpatialGrid::new(params)),
        }
    }

    /// Indexes the frozen state ahead of a step's queries.
    pub fn prepare(&mut self, state: &ParticleState, params: &SimParams) -> Result<()> {
        match self {
            NeighborQuery::Exhaustive => Ok(()),
            NeighborQuery::Grid(grid) => grid.rebuild(&state.positions_x_in, &state.positions_y_in, params),
        }
    }

    /// Replaces the contents of `out` with the neighbors of `particle_idx`, sorted ascending.
    pub fn collect(
        &self,
        particle_idx: usize,
        positions_x: &[f64],
        positions_y: &[f64],
        params: &SimParams,
        out: &mut Vec<usize>,
    ) {
        out.clear();
        match self {
            NeighborQuery::Exhaustive => {
                exhaustive_neighbors(particle_idx, positions_x, positions_y, params.radius_sq, out)
            }
            NeighborQuery::Grid(grid) => {
                grid.for_each_neighbor(particle_idx, positions_x, positions_y, params.radius_sq, params, |j| {
                    out.push(j)
                });
                out.sort_unstable();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use vicsek_common::SimulationConfig;

    fn scattered_state(n: usize, seed: u64) -> (ParticleState, SimParams) {
        let mut config = SimulationConfig::default();
        config.flock.num_particles = n as u32;
        config.flock.interaction_radius = 3.0;
        let params = config.get_sim_params();
        let mut rng = StdRng::seed_from_u64(seed);
        let xs: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..params.world_width)).collect();
        let ys: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..params.world_height)).collect();
        let headings = vec![0.0; n];
        (ParticleState::new(&xs, &ys, &headings, &params).unwrap(), params)
    }

    #[test]
    fn every_particle_is_its_own_neighbor() {
        let (state, _) = scattered_state(50, 1);
        for i in 0..state.len() {
            assert!(neighbors(&state, i, 0.001).contains(&i));
        }
    }

    #[test]
    fn neighborhood_is_symmetric() {
        let (state, params) = scattered_state(80, 2);
        for i in 0..state.len() {
            for j in neighbors(&state, i, params.radius) {
                assert!(neighbors(&state, j, params.radius).contains(&i), "{} sees {} but not back", i, j);
            }
        }
    }

    #[test]
    fn radius_is_exclusive() {
        let mut config = SimulationConfig::default();
        config.flock.num_particles = 2;
        let params = config.get_sim_params();
        let state = ParticleState::new(&[1.0, 4.0], &[1.0, 5.0], &[0.0, 0.0], &params).unwrap();
        // The two particles are exactly 5 apart.
        assert_eq!(neighbors(&state, 0, 5.0), vec![0]);
        assert_eq!(neighbors(&state, 0, 5.0001), vec![0, 1]);
    }

    #[test]
    fn grid_matches_exhaustive_scan() {
        let (state, params) = scattered_state(400, 3);
        let mut grid = NeighborQuery::new(NeighborSearch::Grid, &params);
        grid.prepare(&state, &params).unwrap();
        let exhaustive = NeighborQuery::new(NeighborSearch::Exhaustive, &params);

        let (mut a, mut b) = (Vec::new(), Vec::new());
        for i in 0..state.len() {
            grid.collect(i, &state.positions_x_in, &state.positions_y_in, &params, &mut a);
            exhaustive.collect(i, &state.positions_x_in, &state.positions_y_in, &params, &mut b);
            assert_eq!(a, b, "neighbor sets differ for particle {}", i);
        }
    }
}
