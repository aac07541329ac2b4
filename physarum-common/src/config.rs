use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::settings::SimulationSettings;
use crate::sim_params::{SimParams, DEFAULT_EXPLORATION_ANGLE_DEG, DEFAULT_PROBE_DISTANCE};
use std::path::Path;

// Pheromone field geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FieldConfig {
    pub width: usize,
    pub height: usize,
    /// Cap applied to a cell on deposit. Unbounded when absent.
    #[serde(default)]
    pub pheromone_ceiling: Option<f32>,
}

// Probe geometry for the sensing/steering rule
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SteeringConfig {
    #[serde(default = "default_probe_distance")]
    pub probe_distance: f32,
    #[serde(default = "default_exploration_angle_deg")]
    pub exploration_angle_deg: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        SteeringConfig {
            probe_distance: DEFAULT_PROBE_DISTANCE,
            exploration_angle_deg: DEFAULT_EXPLORATION_ANGLE_DEG,
        }
    }
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    pub record_interval_steps: u64,
    /// Pace steps at `tick_interval_ms` instead of running flat out.
    #[serde(default)]
    pub realtime: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub seed: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_snapshots: bool,
    pub save_positions: bool,
    #[serde(default)]
    pub save_field_in_snapshot: bool,
    #[serde(default)]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

/// Run configuration for the headless driver, loaded from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    pub field: FieldConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    pub timing: TimingConfig,
    pub initial_conditions: InitialConditions,
    pub output: OutputConfig,
    /// Starting settings; the panel defaults when the table is missing.
    #[serde(default)]
    pub settings: SimulationSettings,
}

impl EngineConfig {
    /// Loads the run configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(config_str)?;

        if config.field.width == 0 || config.field.height == 0 {
            anyhow::bail!("field width and height must be greater than 0.");
        }
        if let Some(ceiling) = config.field.pheromone_ceiling {
            if !(ceiling.is_finite() && ceiling > 0.0) {
                anyhow::bail!("pheromone_ceiling must be a positive finite number.");
            }
        }
        if !(config.steering.probe_distance.is_finite() && config.steering.probe_distance >= 0.0) {
            anyhow::bail!("probe_distance must be a non-negative finite number.");
        }
        if !(config.steering.exploration_angle_deg.is_finite()
            && (0.0..=180.0).contains(&config.steering.exploration_angle_deg))
        {
            anyhow::bail!("exploration_angle_deg must lie in [0, 180].");
        }
        config.settings.validate()?;

        Ok(config)
    }

    /// Converts the configuration into the engine's construction parameters.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            field_width: self.field.width,
            field_height: self.field.height,
            probe_distance: self.steering.probe_distance,
            exploration_angle: self.steering.exploration_angle_deg,
            pheromone_ceiling: self.field.pheromone_ceiling,
            seed: self.initial_conditions.seed,
        }
    }
}

fn default_probe_distance() -> f32 {
    DEFAULT_PROBE_DISTANCE
}

fn default_exploration_angle_deg() -> f32 {
    DEFAULT_EXPLORATION_ANGLE_DEG
}

fn default_tick_interval_ms() -> u64 {
    16 // ~60 Hz
}
