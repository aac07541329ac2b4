use crate::agent::Agent;
use crate::cpu_state::CpuState;
use crate::field::{FieldData, PheromoneField};
use crate::steering::SteeringPolicy;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use physarum_common::{normalize_heading, wrap_coordinate, AgentPosition, SimParams, SimulationSettings, Snapshot};
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::mpsc::{self, Receiver, Sender};

/// Engine state pushed to subscribers and returned by [`PhysarumSimulation::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub settings: SimulationSettings,
    pub running: bool,
    /// Number of completed steps.
    pub step: u64,
    pub agent_count: usize,
}

/// Manages the agent population and pheromone field of one Physarum run.
pub struct PhysarumSimulation {
    /// Current settings, already sanitized.
    settings: SimulationSettings,
    /// Construction parameters, fixed for the lifetime of the instance.
    params: SimParams,
    field: PheromoneField,
    /// The agent population stored in CPU memory.
    state: CpuState,
    policy: SteeringPolicy,
    /// Engine RNG for placement; per-step exploration uses derived streams.
    rng: StdRng,
    /// Informational only; `step` does not consult it.
    running: bool,
    /// The number of completed steps.
    current_time_step: u64,
    observers: Vec<Sender<EngineStatus>>,
    /// Stores collected snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

impl PhysarumSimulation {
    /// Creates a simulation on a `width` x `height` field with default steering geometry and seed.
    pub fn new(settings: SimulationSettings, width: usize, height: usize) -> Result<Self> {
        Self::with_params(settings, SimParams::for_field(width, height))
    }

    /// Creates a simulation, seeding `settings.agent.count` agents uniformly over the field.
    pub fn with_params(settings: SimulationSettings, params: SimParams) -> Result<Self> {
        let mut sim = Self::empty(settings, params)?;
        let (width, height) = sim.field_extent();
        sim.state = CpuState::seeded(
            sim.settings.agent.count as usize,
            width,
            height,
            &sim.settings.agent,
            &mut sim.rng,
        );
        info!(
            "Simulation initialized: {}x{} field, {} agents, seed {}.",
            sim.params.field_width,
            sim.params.field_height,
            sim.state.len(),
            sim.params.seed
        );
        Ok(sim)
    }

    /// Creates a simulation with a hand-placed population. The agent count in
    /// `settings` is replaced by `agents.len()` and every agent takes the
    /// behaviour parameters from `settings`.
    pub fn with_agents(settings: SimulationSettings, params: SimParams, agents: Vec<Agent>) -> Result<Self> {
        let mut settings = settings;
        settings.agent.count = u32::try_from(agents.len())
            .with_context(|| format!("Population of {} agents exceeds the supported count.", agents.len()))?;
        let mut sim = Self::empty(settings, params)?;
        let (width, height) = sim.field_extent();
        let agents = agents
            .into_iter()
            .map(|mut agent| {
                agent.apply_settings(&sim.settings.agent);
                agent.x = wrap_coordinate(agent.x, width);
                agent.y = wrap_coordinate(agent.y, height);
                agent.heading = normalize_heading(agent.heading);
                agent
            })
            .collect();
        sim.state = CpuState::from_agents(agents);
        Ok(sim)
    }

    fn empty(settings: SimulationSettings, params: SimParams) -> Result<Self> {
        if params.field_width == 0 || params.field_height == 0 {
            anyhow::bail!(
                "Pheromone field dimensions must be non-zero, got {}x{}.",
                params.field_width,
                params.field_height
            );
        }
        let settings = sanitize(settings);

        let field = PheromoneField::new(
            params.field_width,
            params.field_height,
            settings.pheromone.diffusion_rate,
            settings.pheromone.evaporation_rate,
        )
        .with_ceiling(params.pheromone_ceiling);

        Ok(Self {
            settings,
            policy: SteeringPolicy::from_params(&params),
            rng: StdRng::seed_from_u64(params.seed),
            params,
            field,
            state: CpuState::from_agents(Vec::new()),
            running: false,
            current_time_step: 0,
            observers: Vec::new(),
            recorded_snapshots: Vec::new(),
        })
    }

    fn field_extent(&self) -> (f32, f32) {
        (self.field.width() as f32, self.field.height() as f32)
    }

    pub fn start(&mut self) {
        if !self.running {
            info!("Simulation started at step {}.", self.current_time_step);
        }
        self.running = true;
        self.notify();
    }

    pub fn stop(&mut self) {
        if self.running {
            info!("Simulation stopped at step {}.", self.current_time_step);
        }
        self.running = false;
        self.notify();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the simulation by one discrete step.
    ///
    /// 1. Every agent senses the field as it stood after the previous step,
    ///    steers and moves (parallel, read-only on the field).
    /// 2. Deposits are applied serially in agent-index order.
    /// 3. The field is diffused and evaporated once.
    ///
    /// Exploration randomness comes from a stream derived from
    /// `(seed, step, agent index)`, so the outcome does not depend on thread
    /// count or scheduling. Deposits into a shared cell are summed in agent-index order.
    pub fn step(&mut self) {
        if self.state.is_empty() {
            // Nothing moves or deposits; the field still decays.
            self.field.diffuse_and_evaporate();
            self.current_time_step += 1;
            trace!("Step {} completed (no agents).", self.current_time_step);
            return;
        }

        let (width, height) = self.field_extent();
        let influence = self.settings.pheromone.influence;
        let seed = self.params.seed;
        let time_step = self.current_time_step;
        let field = &self.field;
        let policy = &self.policy;
        let state = &mut self.state;

        // --- 1. Sense, steer and move (Parallel) ---
        state
            .agents_out
            .par_iter_mut()
            .zip(state.agents_in.par_iter())
            .enumerate()
            .for_each(|(idx, (agent_out, agent))| {
                let mut rng = StdRng::seed_from_u64(agent_stream_seed(seed, time_step, idx));
                let mut next = *agent;
                next.heading = agent.sense_and_steer(field, policy, influence, &mut rng);
                next.move_forward(width, height);
                *agent_out = next;
            });

        // --- Swap Buffers: Output becomes Input for next step ---
        state.swap_buffers();

        // --- 2. Deposit (Serial) ---
        for agent in &self.state.agents_in {
            let (x, y) = agent.deposit_cell();
            self.field.deposit(x, y, agent.pheromone_amount);
        }

        // --- 3. Diffuse and evaporate (Parallel over rows) ---
        self.field.diffuse_and_evaporate();

        self.current_time_step += 1;
        trace!("Step {} completed ({} agents).", self.current_time_step, self.state.len());
    }

    /// Replaces the settings.
    ///
    /// A changed agent count discards the whole population and reseeds it as at
    /// construction; otherwise agents keep position and heading and only their
    /// behaviour copies change. Field rates apply from the next step.
    pub fn update_settings(&mut self, new_settings: SimulationSettings) {
        let new_settings = sanitize(new_settings);
        let old_count = self.settings.agent.count;
        self.settings = new_settings;

        if new_settings.agent.count != old_count {
            info!(
                "Agent count changed from {} to {}; reseeding population.",
                old_count, new_settings.agent.count
            );
            let (width, height) = self.field_extent();
            self.state = CpuState::seeded(
                new_settings.agent.count as usize,
                width,
                height,
                &new_settings.agent,
                &mut self.rng,
            );
        } else {
            self.state.apply_settings(&new_settings.agent);
        }

        self.field.set_diffusion_rate(new_settings.pheromone.diffusion_rate);
        self.field.set_evaporation_rate(new_settings.pheromone.evaporation_rate);
        debug!("Settings updated: {:?}", new_settings);
        self.notify();
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn current_step(&self) -> u64 {
        self.current_time_step
    }

    pub fn agent_count(&self) -> usize {
        self.state.len()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.state.agents_in
    }

    pub fn field(&self) -> &PheromoneField {
        &self.field
    }

    /// Owned copy of the pheromone grid for rendering.
    pub fn pheromone_field_data(&self) -> FieldData {
        self.field.data()
    }

    /// Positions and headings of all agents.
    pub fn agent_positions(&self) -> Vec<AgentPosition> {
        self.state.agents_in.iter().map(Agent::position).collect()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            settings: self.settings,
            running: self.running,
            step: self.current_time_step,
            agent_count: self.state.len(),
        }
    }

    /// Registers a status subscriber. The receiver gets the current status at
    /// once, then a new one on every start, stop and settings update.
    pub fn subscribe(&mut self) -> Receiver<EngineStatus> {
        let (tx, rx) = mpsc::channel();
        // A fresh receiver cannot be disconnected yet.
        let _ = tx.send(self.status());
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let status = self.status();
        let before = self.observers.len();
        self.observers.retain(|tx| tx.send(status.clone()).is_ok());
        if self.observers.len() != before {
            debug!("Dropped {} disconnected status subscribers.", before - self.observers.len());
        }
    }

    /// Builds a snapshot of the current state.
    pub fn snapshot(&self, include_field: bool, include_positions: bool) -> Snapshot {
        let data = self.field.data();
        let occupied = data.values.iter().filter(|&&v| v > 0.0).count();
        let occupied_fraction = if data.values.is_empty() {
            0.0
        } else {
            occupied as f32 / data.values.len() as f32
        };

        Snapshot {
            step: self.current_time_step,
            agent_count: self.state.len() as u32,
            total_pheromone: data.total(),
            max_pheromone: data.max(),
            occupied_fraction,
            field_width: data.width,
            field_height: data.height,
            positions: include_positions.then(|| self.agent_positions()),
            field: include_field.then_some(data.values),
        }
    }

    /// Stores a snapshot of the current state for later export.
    pub fn record_snapshot(&mut self, include_field: bool, include_positions: bool) {
        let snapshot = self.snapshot(include_field, include_positions);
        debug!(
            "Snapshot at step {}: total pheromone {:.3}, max {:.3}, occupied {:.1}%",
            snapshot.step,
            snapshot.total_pheromone,
            snapshot.max_pheromone,
            snapshot.occupied_fraction * 100.0
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Provides access to the recorded snapshots.
    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

fn sanitize(settings: SimulationSettings) -> SimulationSettings {
    let clean = settings.sanitized();
    if clean != settings {
        warn!("Settings out of range were clamped: {:?} -> {:?}", settings, clean);
    }
    clean
}

/// Seed for one agent's exploration stream in one step.
#[inline(always)]
fn agent_stream_seed(seed: u64, time_step: u64, agent_idx: usize) -> u64 {
    seed ^ time_step.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (agent_idx as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}
