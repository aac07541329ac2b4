use physarum_common::sim_params::{DEFAULT_EXPLORATION_ANGLE_DEG, DEFAULT_PROBE_DISTANCE};
use physarum_common::{clamp, normalize_heading, SimParams};
use rand::Rng;

/// Field concentrations seen by an agent's three probes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub left: f32,
    pub ahead: f32,
    pub right: f32,
}

/// Which probe the steering rule settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerDirection {
    Ahead,
    Left,
    Right,
}

impl SensorReading {
    /// Strongest probe. Ties prefer ahead, then left, then right.
    pub fn strongest(&self) -> SteerDirection {
        if self.ahead >= self.left && self.ahead >= self.right {
            SteerDirection::Ahead
        } else if self.left >= self.right {
            SteerDirection::Left
        } else {
            SteerDirection::Right
        }
    }

    /// True when the probes carry no gradient at all.
    pub fn is_uniform(&self) -> bool {
        self.left == self.ahead && self.ahead == self.right
    }
}

/// Decision rule turning a [`SensorReading`] into a new heading.
///
/// Headings are in degrees, measured from +x toward +y; "left" probes at
/// `heading - view_angle`, "right" at `heading + view_angle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringPolicy {
    /// How far ahead of the agent the probes sit, in field cells.
    pub probe_distance: f32,
    /// Half-width of the uniform random turn used when the field is uninformative, in degrees.
    pub exploration_angle: f32,
}

impl SteeringPolicy {
    /// Non-finite values fall back to the defaults; the exploration angle is
    /// clamped to [0, 180] degrees.
    pub fn from_params(params: &SimParams) -> Self {
        let probe_distance = if params.probe_distance.is_finite() {
            params.probe_distance.max(0.0)
        } else {
            DEFAULT_PROBE_DISTANCE
        };
        let exploration_angle = if params.exploration_angle.is_finite() {
            clamp(params.exploration_angle, 0.0, 180.0)
        } else {
            DEFAULT_EXPLORATION_ANGLE_DEG
        };
        Self { probe_distance, exploration_angle }
    }

    /// Picks the next heading.
    ///
    /// With no usable signal (zero influence or three equal samples) the agent
    /// takes a bounded random exploration turn. Otherwise it turns toward the
    /// strongest probe by `view_angle * min(1, influence * (best - ahead))`,
    /// so a weak gradient gives a partial turn and a strong one a full turn.
    pub fn choose_heading<R: Rng>(
        &self,
        reading: SensorReading,
        heading: f32,
        view_angle: f32,
        influence: f32,
        rng: &mut R,
    ) -> f32 {
        if influence.is_nan() || influence <= 0.0 || reading.is_uniform() {
            return normalize_heading(heading + self.exploration_turn(rng));
        }

        let turn = match reading.strongest() {
            SteerDirection::Ahead => 0.0,
            SteerDirection::Left => -view_angle * turn_fraction(reading.left, reading.ahead, influence),
            SteerDirection::Right => view_angle * turn_fraction(reading.right, reading.ahead, influence),
        };
        normalize_heading(heading + turn)
    }

    fn exploration_turn<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.exploration_angle > 0.0 {
            rng.random_range(-self.exploration_angle..=self.exploration_angle)
        } else {
            0.0
        }
    }
}

impl Default for SteeringPolicy {
    fn default() -> Self {
        Self::from_params(&SimParams::default())
    }
}

#[inline]
fn turn_fraction(best: f32, ahead: f32, influence: f32) -> f32 {
    clamp(influence * (best - ahead), 0.0, 1.0)
}
