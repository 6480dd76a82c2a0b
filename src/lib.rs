//! Vicsek flocking engine: synchronous self-propelled particle simulation on a torus.

pub mod grid;
pub mod heading;
pub mod integrator;
pub mod neighbors;
pub mod output;
pub mod simulation;
pub mod sink;
pub mod state;

pub use neighbors::{neighbors, NeighborQuery};
pub use simulation::{order_parameter, run, Steps, VicsekSimulation};
pub use sink::{FrameSink, SnapshotRecorder};
pub use state::ParticleState;
pub use vicsek_common::{Error, Result, SimulationConfig, Snapshot};
