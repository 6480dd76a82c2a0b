use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::sim_params::SimParams;
use std::path::Path;

/// Upper bound on the number of spatial grid cells. Above this the cell size
/// is enlarged (never shrunk below the interaction radius).
const MAX_GRID_CELLS: f64 = 1_048_576.0;
const GRID_CELL_SLACK: f64 = 1e-9;

// Domain extents. Positions live in [0, width) x [0, height).
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct UniverseConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        UniverseConfig { width: 20.0, height: 20.0 }
    }
}

// Flock parameters: particle count, speed, interaction radius and noise half-width.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct FlockConfig {
    pub num_particles: u32,
    pub speed: f64,
    pub interaction_radius: f64,
    /// Half-width of the uniform heading perturbation, in radians.
    pub noise_eta: f64,
}

impl Default for FlockConfig {
    fn default() -> Self {
        FlockConfig {
            num_particles: 100,
            speed: 0.4,
            interaction_radius: 5.0,
            noise_eta: std::f64::consts::FRAC_PI_3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TimingConfig {
    pub total_steps: u32,
    /// Keep every n-th step in the recorded snapshot set (the last step is always kept).
    pub record_interval_steps: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { total_steps: 500, record_interval_steps: 1 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct InitialConditions {
    /// Seed for placement and noise. A random seed is drawn (and logged) when absent.
    pub seed: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NeighborSearch {
    /// Pairwise scan over every particle.
    Exhaustive,
    /// Uniform spatial grid with cells no smaller than the interaction radius.
    #[default]
    Grid,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ExecutionConfig {
    pub neighbor_search: NeighborSearch,
    /// Update particles concurrently with per-particle random streams.
    /// The serial mode consumes one shared stream in particle-index order.
    pub parallel: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    #[default]
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }

    /// Picks the codec matching a file extension, as written by [`SnapshotFormat::extension`].
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(SnapshotFormat::Json),
            "bin" => Some(SnapshotFormat::Bincode),
            "msgpack" => Some(SnapshotFormat::MessagePack),
            _ => None,
        }
    }
}

impl std::str::FromStr for SnapshotFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "bincode" | "bin" => Ok(SnapshotFormat::Bincode),
            "messagepack" | "msgpack" => Ok(SnapshotFormat::MessagePack),
            other => Err(Error::InvalidConfig(format!("unknown snapshot format '{}'", other))),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_snapshots: bool,
    pub format: SnapshotFormat,
    /// Emit the initial state as frame 0 before the first step.
    pub record_initial_state: bool,
    pub save_headings_in_snapshot: bool,
    pub save_final_positions: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "vicsek".to_string(),
            save_snapshots: true,
            format: SnapshotFormat::Bincode,
            record_initial_state: true,
            save_headings_in_snapshot: false,
            save_final_positions: true,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub universe: UniverseConfig,
    pub flock: FlockConfig,
    pub timing: TimingConfig,
    pub initial_conditions: InitialConditions,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads and validates the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let config_str = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml_str(&config_str)?;
        log::debug!("Loaded configuration from {}", path_ref.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text. Missing sections take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every run parameter. Fails with `InvalidConfig` on the first violation.
    pub fn validate(&self) -> Result<()> {
        let flock = &self.flock;
        let universe = &self.universe;

        if flock.num_particles == 0 {
            return Err(Error::InvalidConfig("num_particles must be greater than 0".into()));
        }
        require_positive("interaction_radius", flock.interaction_radius)?;
        require_positive("universe.width", universe.width)?;
        require_positive("universe.height", universe.height)?;
        require_non_negative("speed", flock.speed)?;
        require_non_negative("noise_eta", flock.noise_eta)?;
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let world_width = self.universe.width;
        let world_height = self.universe.height;
        let radius = self.flock.interaction_radius;

        // Cells must be wider than one radius so that a 3x3 block covers every neighbor,
        // with a little slack against rounding in the cell lookup.
        let min_cell_for_budget = (world_width * world_height / MAX_GRID_CELLS).sqrt();
        let mut grid_cell_size = radius.max(min_cell_for_budget) * (1.0 + GRID_CELL_SLACK);
        let (mut dim_x, mut dim_y) = grid_dims(world_width, world_height, grid_cell_size);
        // Elongated domains can still exceed the budget along one axis.
        while dim_x * dim_y > MAX_GRID_CELLS {
            let excess = dim_x * dim_y / MAX_GRID_CELLS;
            let longest = dim_x.max(dim_y);
            let growth = if dim_x.min(dim_y) <= 1.0 { excess } else { excess.sqrt() };
            let growth = growth.max(longest / (longest - 1.0));
            grid_cell_size *= growth * (1.0 + GRID_CELL_SLACK);
            (dim_x, dim_y) = grid_dims(world_width, world_height, grid_cell_size);
        }
        let inv_grid_cell_size = 1.0 / grid_cell_size;
        let grid_dim_x = dim_x as u32;
        let grid_dim_y = dim_y as u32;

        SimParams {
            world_width,
            world_height,
            grid_cell_size,
            inv_grid_cell_size,
            grid_dim_x,
            grid_dim_y,
            num_grid_cells: grid_dim_x * grid_dim_y,
            num_particles: self.flock.num_particles,
            speed: self.flock.speed,
            radius,
            radius_sq: radius * radius,
            eta: self.flock.noise_eta,
        }
    }
}

/// Cells along each axis for the given cell size, at least one per axis.
fn grid_dims(width: f64, height: f64, cell_size: f64) -> (f64, f64) {
    ((width / cell_size).ceil().max(1.0), (height / cell_size).ceil().max(1.0))
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidConfig(format!("{} must be positive and finite, got {}", name, value)));
    }
    Ok(())
}

fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidConfig(format!("{} must be non-negative and finite, got {}", name, value)));
    }
    Ok(())
}
