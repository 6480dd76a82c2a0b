use rayon::prelude::*;
use vicsek_common::{Error, Result, SimParams};

use crate::neighbors::within_radius;

/// Grid coordinates of the cell containing `(x, y)`, clamped to the grid.
#[inline(always)]
pub fn get_grid_cell_coords(x: f64, y: f64, params: &SimParams) -> (u32, u32) {
    let grid_x = (x * params.inv_grid_cell_size).floor().max(0.0) as u32;
    let grid_y = (y * params.inv_grid_cell_size).floor().max(0.0) as u32;
    (grid_x.min(params.grid_dim_x - 1), grid_y.min(params.grid_dim_y - 1))
}

// Calculates the 1D grid cell index for a given position
#[inline(always)]
pub fn get_grid_cell_idx(x: f64, y: f64, params: &SimParams) -> u32 {
    let (grid_x, grid_y) = get_grid_cell_coords(x, y, params);
    grid_y * params.grid_dim_x + grid_x
}

/// Uniform bucket grid over the domain, rebuilt from the frozen state each step.
///
/// Cells are at least one interaction radius wide, so every neighbor of a
/// particle lies in the 3x3 block of cells around it. Distances stay flat
/// (no wraparound), matching the exhaustive scan.
#[derive(Debug)]
pub struct SpatialGrid {
    // Grid cell index for each particle
    particle_grid_indices: Vec<u32>,
    // Number of particles in each grid cell
    cell_counts: Vec<u32>,
    // Start index in cell_particle_indices for each grid cell (prefix sum)
    cell_starts: Vec<u32>,
    // Particle indices bucketed by cell, ascending within each cell
    cell_particle_indices: Vec<u32>,
    // Scratch write cursors for the scatter pass
    write_offsets: Vec<u32>,
}

impl SpatialGrid {
    pub fn new(params: &SimParams) -> Self {
        let num_grid_cells = params.num_grid_cells as usize;
        let n = params.num_particles as usize;
        Self {
            particle_grid_indices: vec![0; n],
            cell_counts: vec![0; num_grid_cells],
            cell_starts: vec![0; num_grid_cells],
            cell_particle_indices: vec![0; n],
            write_offsets: vec![0; num_grid_cells],
        }
    }

    /// Buckets every particle by cell (counting sort).
    pub fn rebuild(&mut self, positions_x: &[f64], positions_y: &[f64], params: &SimParams) -> Result<()> {
        let num_particles = positions_x.len();
        let num_grid_cells = params.num_grid_cells as usize;
        if positions_y.len() != num_particles {
            return Err(Error::InvalidState("position buffer length mismatch in grid rebuild".into()));
        }
        if self.cell_counts.len() != num_grid_cells {
            return Err(Error::InvalidState(format!(
                "grid sized for {} cells, parameters describe {}",
                self.cell_counts.len(),
                num_grid_cells
            )));
        }
        self.particle_grid_indices.resize(num_particles, 0);
        self.cell_particle_indices.resize(num_particles, 0);

        // Phase 1: Assign grid indices to each particle (Parallel).
        self.particle_grid_indices
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, grid_idx_out)| {
                *grid_idx_out = get_grid_cell_idx(positions_x[idx], positions_y[idx], params);
            });

        // Phase 2: Count particles in each grid cell (Serial).
        self.cell_counts.iter_mut().for_each(|c| *c = 0);
        for &grid_idx in &self.particle_grid_indices {
            self.cell_counts[grid_idx as usize] += 1;
        }

        // Phase 3: Prefix sum for cell start indices.
        let mut total_sum = 0;
        for (start, &count) in self.cell_starts.iter_mut().zip(&self.cell_counts) {
            *start = total_sum;
            total_sum += count;
        }
        if total_sum as usize != num_particles {
            return Err(Error::InvalidState(format!(
                "grid prefix sum {} does not match particle count {}",
                total_sum, num_particles
            )));
        }

        // Phase 4: Scatter in particle-index order so each cell's slice stays ascending.
        self.write_offsets.copy_from_slice(&self.cell_starts);
        for (particle_idx, &grid_idx) in self.particle_grid_indices.iter().enumerate() {
            let cursor = &mut self.write_offsets[grid_idx as usize];
            self.cell_particle_indices[*cursor as usize] = particle_idx as u32;
            *cursor += 1;
        }

        log::trace!(
            "Grid rebuilt: {} particles in {}x{} cells of size {:.3}",
            num_particles,
            params.grid_dim_x,
            params.grid_dim_y,
            params.grid_cell_size
        );
        Ok(())
    }

    /// Calls `f` for every particle (including `particle_idx` itself) whose flat
    /// squared distance to `particle_idx` is below `max_dist_sq`.
    ///
    /// Visit order follows the cells, not particle indices.
    pub fn for_each_neighbor<F>(
        &self,
        particle_idx: usize,
        positions_x: &[f64],
        positions_y: &[f64],
        max_dist_sq: f64,
        params: &SimParams,
        mut f: F,
    ) where
        F: FnMut(usize),
    {
        let x = positions_x[particle_idx];
        let y = positions_y[particle_idx];
        let (center_x, center_y) = get_grid_cell_coords(x, y, params);

        let x_range = center_x.saturating_sub(1)..=(center_x + 1).min(params.grid_dim_x - 1);
        for grid_y in center_y.saturating_sub(1)..=(center_y + 1).min(params.grid_dim_y - 1) {
            for grid_x in x_range.clone() {
                let grid_idx = (grid_y * params.grid_dim_x + grid_x) as usize;
                let start = self.cell_starts[grid_idx] as usize;
                let end = start + self.cell_counts[grid_idx] as usize;

                for &neighbor_idx in &self.cell_particle_indices[start..end] {
                    let neighbor_idx = neighbor_idx as usize;
                    if within_radius(x, y, positions_x[neighbor_idx], positions_y[neighbor_idx], max_dist_sq) {
                        f(neighbor_idx);
                    }
                }
            }
        }
    }

    /// Number of particles bucketed into each cell after the last rebuild.
    #[cfg(test)]
    pub(crate) fn cell_counts(&self) -> &[u32] {
        &self.cell_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vicsek_common::SimulationConfig;

    fn params(n: u32, width: f64, height: f64, radius: f64) -> SimParams {
        let mut config = SimulationConfig::default();
        config.flock.num_particles = n;
        config.universe.width = width;
        config.universe.height = height;
        config.flock.interaction_radius = radius;
        config.get_sim_params()
    }

    #[test]
    fn cell_index_is_row_major_and_clamped() {
        let p = params(1, 20.0, 20.0, 5.0);
        assert_eq!(get_grid_cell_idx(0.0, 0.0, &p), 0);
        assert_eq!(get_grid_cell_idx(6.0, 0.0, &p), 1);
        assert_eq!(get_grid_cell_idx(0.0, 6.0, &p), 4);
        assert_eq!(get_grid_cell_idx(19.999, 19.999, &p), 15);
        assert_eq!(get_grid_cell_idx(25.0, 25.0, &p), 15);
    }

    #[test]
    fn rebuild_counts_every_particle_once() {
        let p = params(4, 20.0, 20.0, 5.0);
        let xs = [1.0, 2.0, 11.0, 19.0];
        let ys = [1.0, 1.5, 11.0, 19.0];
        let mut grid = SpatialGrid::new(&p);
        grid.rebuild(&xs, &ys, &p).unwrap();
        assert_eq!(grid.cell_counts().iter().sum::<u32>(), 4);
        assert_eq!(grid.cell_counts()[0], 2);
        assert_eq!(grid.cell_counts()[10], 1);
        assert_eq!(grid.cell_counts()[15], 1);
    }

    #[test]
    fn neighbors_across_cell_borders_are_found() {
        let p = params(3, 20.0, 20.0, 5.0);
        // Particles 0 and 1 straddle the x = 5 border; particle 2 is far away.
        let xs = [4.9, 5.1, 18.0];
        let ys = [2.0, 2.0, 18.0];
        let mut grid = SpatialGrid::new(&p);
        grid.rebuild(&xs, &ys, &p).unwrap();

        let mut found = Vec::new();
        grid.for_each_neighbor(0, &xs, &ys, p.radius_sq, &p, |j| found.push(j));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);

        found.clear();
        grid.for_each_neighbor(2, &xs, &ys, p.radius_sq, &p, |j| found.push(j));
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn distance_is_flat_not_periodic() {
        let p = params(2, 20.0, 20.0, 5.0);
        // 0.6 apart through the boundary, 19.4 apart in the flat metric.
        let xs = [0.3, 19.7];
        let ys = [10.0, 10.0];
        let mut grid = SpatialGrid::new(&p);
        grid.rebuild(&xs, &ys, &p).unwrap();
        let mut found = Vec::new();
        grid.for_each_neighbor(0, &xs, &ys, p.radius_sq, &p, |j| found.push(j));
        assert_eq!(found, vec![0]);
    }
}
