//! Physarum transport-network simulation engine.
//!
//! Agents sense a diffusing, evaporating pheromone field, steer toward higher
//! concentration and deposit as they move. UI layers drive the engine through
//! [`PhysarumSimulation`] directly or through [`SharedSimulation`] from
//! multiple threads.

pub mod agent;
pub mod control;
pub mod cpu_state;
pub mod field;
pub mod grid;
pub mod simulation;
pub mod steering;

pub use agent::Agent;
pub use control::{SharedSimulation, Ticker};
pub use field::{FieldData, PheromoneField};
pub use simulation::{EngineStatus, PhysarumSimulation};
pub use steering::{SensorReading, SteerDirection, SteeringPolicy};

pub use physarum_common as common;
