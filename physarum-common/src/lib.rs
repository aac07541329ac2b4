pub mod config;
pub mod settings;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{EngineConfig, FieldConfig, SteeringConfig, TimingConfig, InitialConditions, OutputConfig};
pub use settings::{AgentSettings, PheromoneSettings, SimulationSettings, SettingsError, ImportReport, RejectedField, ui_ranges};
pub use sim_params::SimParams;
pub use snapshot::{AgentPosition, Snapshot};
pub use vecmath::{Vec2, heading_to_vec, normalize_heading, wrap_coordinate, clamp};
