pub mod config;
pub mod error;
pub mod graph;
pub mod params;
pub mod rng;
pub mod stress;
pub mod trial;

// Core types
pub type F = f64;
pub type NodeId = usize;

pub use config::SimConfig;
pub use error::{CascadeError, ConfigurationError, InvalidGraphError, SimulationError};
pub use graph::{Edge, Graph};
pub use params::{assign, Bounds, Params};
pub use rng::{unit_seed, TrialRng};
pub use stress::{EffectiveParams, StressLevel, StressScenario};
pub use trial::{simulate_trial, CascadeOutcome, CombineRule};
