use serde::{Serialize, Deserialize};

/// Position and heading of one agent, as handed to rendering consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    pub x: f32,
    pub y: f32,
    /// Degrees in [0, 360).
    pub heading: f32,
}

/// A snapshot of the simulation state and metrics at a specific step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed steps when the snapshot was taken.
    pub step: u64,
    pub agent_count: u32,
    pub total_pheromone: f64,
    pub max_pheromone: f32,
    /// Fraction of cells holding any pheromone at all.
    pub occupied_fraction: f32,
    pub field_width: usize,
    pub field_height: usize,
    /// Row-major field values, only when `save_field_in_snapshot` is set.
    /// Absent payloads stay explicit so positional formats (bincode) can read them back.
    pub field: Option<Vec<f32>>,
    pub positions: Option<Vec<AgentPosition>>,
}
