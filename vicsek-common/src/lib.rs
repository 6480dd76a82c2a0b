pub mod config;
pub mod error;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    ExecutionConfig, FlockConfig, InitialConditions, NeighborSearch, OutputConfig, SimulationConfig,
    SnapshotFormat, TimingConfig, UniverseConfig,
};
pub use error::{Error, Result};
pub use sim_params::SimParams;
pub use snapshot::{read_snapshots, write_snapshots, Snapshot};
pub use vecmath::{angle_to_vec, wrap_coordinate, Vec2};
