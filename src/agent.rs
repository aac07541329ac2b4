use crate::field::PheromoneField;
use crate::steering::{SensorReading, SteeringPolicy};
use physarum_common::{heading_to_vec, normalize_heading, wrap_coordinate, AgentPosition, AgentSettings, Vec2};
use rand::Rng;

/// A single Physarum agent.
///
/// The behaviour fields are per-agent copies of the global agent settings and
/// are refreshed on every settings update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub x: f32,
    pub y: f32,
    /// Degrees in [0, 360).
    pub heading: f32,
    pub speed: f32,
    pub view_angle: f32,
    pub pheromone_amount: f32,
}

impl Agent {
    pub fn from_settings(x: f32, y: f32, heading: f32, settings: &AgentSettings) -> Self {
        Self {
            x,
            y,
            heading: normalize_heading(heading),
            speed: settings.speed,
            view_angle: settings.view_angle,
            pheromone_amount: settings.pheromone_amount,
        }
    }

    /// Uniform position in `[0, width) x [0, height)` and uniform heading in `[0, 360)`.
    pub fn random<R: Rng>(rng: &mut R, width: f32, height: f32, settings: &AgentSettings) -> Self {
        let x = wrap_coordinate(rng.random_range(0.0..width), width);
        let y = wrap_coordinate(rng.random_range(0.0..height), height);
        let heading = rng.random_range(0.0..360.0);
        Self::from_settings(x, y, heading, settings)
    }

    /// Refreshes the behaviour copies, keeping position and heading.
    pub fn apply_settings(&mut self, settings: &AgentSettings) {
        self.speed = settings.speed;
        self.view_angle = settings.view_angle;
        self.pheromone_amount = settings.pheromone_amount;
    }

    fn probe(&self, field: &PheromoneField, angle_offset: f32, distance: f32) -> f32 {
        let offset = heading_to_vec(self.heading + angle_offset) * distance;
        let at = Vec2::new(self.x, self.y) + offset;
        field.sample(at.x, at.y)
    }

    /// Samples the field at `probe_distance` ahead, ahead-left and ahead-right.
    pub fn sense(&self, field: &PheromoneField, probe_distance: f32) -> SensorReading {
        SensorReading {
            left: self.probe(field, -self.view_angle, probe_distance),
            ahead: self.probe(field, 0.0, probe_distance),
            right: self.probe(field, self.view_angle, probe_distance),
        }
    }

    /// Heading this agent would take next given the current field.
    pub fn sense_and_steer<R: Rng>(
        &self,
        field: &PheromoneField,
        policy: &SteeringPolicy,
        influence: f32,
        rng: &mut R,
    ) -> f32 {
        let reading = self.sense(field, policy.probe_distance);
        policy.choose_heading(reading, self.heading, self.view_angle, influence, rng)
    }

    /// Advances by `speed` along `heading`, wrapping onto the torus.
    pub fn move_forward(&mut self, width: f32, height: f32) {
        let step = heading_to_vec(self.heading) * self.speed;
        self.x = wrap_coordinate(self.x + step.x, width);
        self.y = wrap_coordinate(self.y + step.y, height);
    }

    /// Cell that receives this agent's deposit.
    pub fn deposit_cell(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }

    pub fn position(&self) -> AgentPosition {
        AgentPosition { x: self.x, y: self.y, heading: self.heading }
    }
}
