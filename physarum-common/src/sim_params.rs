use serde::{Deserialize, Serialize};

pub const DEFAULT_FIELD_WIDTH: usize = 800;
pub const DEFAULT_FIELD_HEIGHT: usize = 600;
/// Distance ahead of an agent at which the three probes sit, in field cells.
pub const DEFAULT_PROBE_DISTANCE: f32 = 9.0;
/// Half-width of the random turn taken when the field gives no signal, in degrees.
pub const DEFAULT_EXPLORATION_ANGLE_DEG: f32 = 15.0;
pub const DEFAULT_SEED: u64 = 42;

/// Construction parameters fixed for the lifetime of a simulation instance.
/// Unlike `SimulationSettings`, none of these can change while running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Field
    pub field_width: usize,
    pub field_height: usize,
    pub pheromone_ceiling: Option<f32>,

    // Steering
    pub probe_distance: f32,
    pub exploration_angle: f32, // degrees

    // Seed for placement and per-agent exploration streams
    pub seed: u64,
}

impl SimParams {
    /// Default steering geometry and seed for a `width` x `height` field.
    pub fn for_field(width: usize, height: usize) -> Self {
        SimParams {
            field_width: width,
            field_height: height,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            field_width: DEFAULT_FIELD_WIDTH,
            field_height: DEFAULT_FIELD_HEIGHT,
            pheromone_ceiling: None,
            probe_distance: DEFAULT_PROBE_DISTANCE,
            exploration_angle: DEFAULT_EXPLORATION_ANGLE_DEG,
            seed: DEFAULT_SEED,
        }
    }
}
