use crate::agent::Agent;
use physarum_common::AgentSettings;
use rand::Rng;

/// Holds the agent population on the CPU.
#[derive(Debug)]
pub struct CpuState {
    // --- Ping-Pong Buffers for Parallel Update ---
    // Agents as of the last completed step (current step's input)
    pub agents_in: Vec<Agent>,
    // Current step's output; only its length matters between steps
    pub agents_out: Vec<Agent>,
}

impl CpuState {
    /// Seeds `count` agents uniformly over the field.
    pub fn seeded<R: Rng>(
        count: usize,
        width: f32,
        height: f32,
        settings: &AgentSettings,
        rng: &mut R,
    ) -> Self {
        let agents_in: Vec<Agent> = (0..count)
            .map(|_| Agent::random(rng, width, height, settings))
            .collect();
        let agents_out = agents_in.clone();
        Self { agents_in, agents_out }
    }

    /// Wraps an explicit population, e.g. hand-placed agents in tests or a UI.
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let agents_out = agents.clone();
        Self { agents_in: agents, agents_out }
    }

    pub fn len(&self) -> usize {
        self.agents_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents_in.is_empty()
    }

    /// Swaps the input and output buffers.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.agents_in, &mut self.agents_out);
    }

    /// Updates behaviour copies on every agent in place, keeping positions and headings.
    pub fn apply_settings(&mut self, settings: &AgentSettings) {
        for agent in self.agents_in.iter_mut() {
            agent.apply_settings(settings);
        }
    }
}
