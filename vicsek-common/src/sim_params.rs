use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // World & Grid
    pub world_width: f64,
    pub world_height: f64,
    pub grid_cell_size: f64,
    pub inv_grid_cell_size: f64,
    pub grid_dim_x: u32,
    pub grid_dim_y: u32,
    pub num_grid_cells: u32,

    // Flock
    pub num_particles: u32,
    pub speed: f64, // Distance travelled per step
    pub radius: f64, // Interaction radius
    pub radius_sq: f64,
    pub eta: f64, // Noise half-width (radians)
}
