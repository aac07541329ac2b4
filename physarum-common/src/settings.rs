use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_AGENT_SPEED: f32 = 2.0;
pub const DEFAULT_VIEW_ANGLE: f32 = 45.0;
pub const DEFAULT_AGENT_COUNT: u32 = 1000;
pub const DEFAULT_PHEROMONE_AMOUNT: f32 = 5.0;
pub const DEFAULT_DIFFUSION_RATE: f32 = 0.1;
pub const DEFAULT_EVAPORATION_RATE: f32 = 0.05;
pub const DEFAULT_INFLUENCE: f32 = 1.0;

/// Slider bounds shown by the settings panel. Advisory only: the engine
/// accepts anything that passes [`SimulationSettings::validate`].
pub mod ui_ranges {
    pub const SPEED: (f32, f32) = (0.0, 10.0);
    pub const VIEW_ANGLE: (f32, f32) = (0.0, 180.0);
    pub const COUNT: (u32, u32) = (100, 10_000);
    pub const PHEROMONE_AMOUNT: (f32, f32) = (0.0, 20.0);
    pub const DIFFUSION_RATE: (f32, f32) = (0.0, 1.0);
    pub const EVAPORATION_RATE: (f32, f32) = (0.0, 1.0);
    pub const INFLUENCE: (f32, f32) = (0.0, 5.0);
}

#[derive(Debug, Error)]
pub enum SettingsError {
    /// The text is not a JSON object at all. Callers keep their prior settings.
    #[error("failed to parse settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Per-agent behaviour parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentSettings {
    /// Distance moved per step, in field cells.
    pub speed: f32,
    /// Angular offset of the side probes, in degrees.
    pub view_angle: f32,
    /// Population size.
    pub count: u32,
    /// Pheromone deposited per agent per step.
    pub pheromone_amount: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_AGENT_SPEED,
            view_angle: DEFAULT_VIEW_ANGLE,
            count: DEFAULT_AGENT_COUNT,
            pheromone_amount: DEFAULT_PHEROMONE_AMOUNT,
        }
    }
}

/// Field-wide pheromone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PheromoneSettings {
    /// Fraction of a cell spread to its four neighbours per step.
    pub diffusion_rate: f32,
    /// Fraction of a cell removed per step.
    pub evaporation_rate: f32,
    /// Weight applied to the sensed concentration difference when steering.
    pub influence: f32,
}

impl Default for PheromoneSettings {
    fn default() -> Self {
        Self {
            diffusion_rate: DEFAULT_DIFFUSION_RATE,
            evaporation_rate: DEFAULT_EVAPORATION_RATE,
            influence: DEFAULT_INFLUENCE,
        }
    }
}

/// The full settings value exchanged with the UI. Replaced wholesale on change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub agent: AgentSettings,
    pub pheromone: PheromoneSettings,
}

/// A field that was present in imported text but could not be used.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedField {
    pub field: &'static str,
    pub reason: String,
}

/// Outcome of [`SimulationSettings::import_lenient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub settings: SimulationSettings,
    /// Fields that kept their prior value because the imported one was unusable.
    pub rejected: Vec<RejectedField>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Reads one numeric field from `section`. Missing keys yield `None` silently;
    /// present but unusable values are recorded and also yield `None`.
    fn take<T>(
        &mut self,
        section: Option<&Map<String, Value>>,
        key: &str,
        field: &'static str,
        check: fn(f64) -> Result<T, String>,
    ) -> Option<T> {
        let value = section?.get(key)?;
        let parsed = match value.as_f64() {
            Some(number) => check(number),
            None => Err(format!("expected a number, got {}", value)),
        };
        match parsed {
            Ok(v) => Some(v),
            Err(reason) => {
                log::warn!("Rejected imported setting `{}`: {}", field, reason);
                self.rejected.push(RejectedField { field, reason });
                None
            }
        }
    }

    fn section<'a>(
        &mut self,
        root: &'a Map<String, Value>,
        key: &'static str,
    ) -> Option<&'a Map<String, Value>> {
        match root.get(key) {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                self.rejected.push(RejectedField {
                    field: key,
                    reason: format!("expected an object, got {}", other),
                });
                None
            }
        }
    }
}

fn check_speed(v: f64) -> Result<f32, String> {
    if v.is_finite() && v > 0.0 {
        Ok(v as f32)
    } else {
        Err(format!("must be a finite number > 0, got {}", v))
    }
}

fn check_view_angle(v: f64) -> Result<f32, String> {
    if (0.0..=180.0).contains(&v) {
        Ok(v as f32)
    } else {
        Err(format!("must lie in [0, 180] degrees, got {}", v))
    }
}

fn check_count(v: f64) -> Result<u32, String> {
    if v.is_finite() && v.fract() == 0.0 && v > 0.0 && v <= u32::MAX as f64 {
        Ok(v as u32)
    } else {
        Err(format!("must be a positive integer, got {}", v))
    }
}

fn check_non_negative(v: f64) -> Result<f32, String> {
    if v.is_finite() && v >= 0.0 {
        Ok(v as f32)
    } else {
        Err(format!("must be a finite number >= 0, got {}", v))
    }
}

fn check_unit(v: f64) -> Result<f32, String> {
    if (0.0..=1.0).contains(&v) {
        Ok(v as f32)
    } else {
        Err(format!("must lie in [0, 1], got {}", v))
    }
}

fn invalid(field: &'static str, reason: String) -> SettingsError {
    SettingsError::InvalidField { field, reason }
}

impl SimulationSettings {
    /// Pretty-printed JSON in the shape the settings panel exports.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)
    }

    /// Strict parse: wrong types fail the whole document, missing keys take
    /// defaults and unknown keys are ignored. Ranges are not checked here.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Field-by-field import over `prior`. Text that is not a JSON object is a
    /// [`SettingsError::Parse`]; any individual field that is missing keeps its
    /// prior value, and one that is mistyped or out of range keeps its prior
    /// value and is listed in [`ImportReport::rejected`].
    pub fn import_lenient(text: &str, prior: &SimulationSettings) -> Result<ImportReport, SettingsError> {
        let root: Map<String, Value> = serde_json::from_str(text)?;
        let mut report = ImportReport { settings: *prior, rejected: Vec::new() };

        let agent = report.section(&root, "agent");
        if let Some(v) = report.take(agent, "speed", "agent.speed", check_speed) {
            report.settings.agent.speed = v;
        }
        if let Some(v) = report.take(agent, "viewAngle", "agent.viewAngle", check_view_angle) {
            report.settings.agent.view_angle = v;
        }
        if let Some(v) = report.take(agent, "count", "agent.count", check_count) {
            report.settings.agent.count = v;
        }
        if let Some(v) = report.take(agent, "pheromoneAmount", "agent.pheromoneAmount", check_non_negative) {
            report.settings.agent.pheromone_amount = v;
        }

        let pheromone = report.section(&root, "pheromone");
        if let Some(v) = report.take(pheromone, "diffusionRate", "pheromone.diffusionRate", check_unit) {
            report.settings.pheromone.diffusion_rate = v;
        }
        if let Some(v) = report.take(pheromone, "evaporationRate", "pheromone.evaporationRate", check_unit) {
            report.settings.pheromone.evaporation_rate = v;
        }
        if let Some(v) = report.take(pheromone, "influence", "pheromone.influence", check_non_negative) {
            report.settings.pheromone.influence = v;
        }

        Ok(report)
    }

    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_speed(self.agent.speed as f64).map_err(|r| invalid("agent.speed", r))?;
        check_view_angle(self.agent.view_angle as f64).map_err(|r| invalid("agent.viewAngle", r))?;
        check_count(self.agent.count as f64).map_err(|r| invalid("agent.count", r))?;
        check_non_negative(self.agent.pheromone_amount as f64)
            .map_err(|r| invalid("agent.pheromoneAmount", r))?;
        check_unit(self.pheromone.diffusion_rate as f64)
            .map_err(|r| invalid("pheromone.diffusionRate", r))?;
        check_unit(self.pheromone.evaporation_rate as f64)
            .map_err(|r| invalid("pheromone.evaporationRate", r))?;
        check_non_negative(self.pheromone.influence as f64)
            .map_err(|r| invalid("pheromone.influence", r))?;
        Ok(())
    }

    /// Clamps every field into a range the engine can run with. A count of
    /// zero is kept and means an empty population.
    pub fn sanitized(&self) -> Self {
        fn non_negative(v: f32, fallback: f32) -> f32 {
            if v.is_finite() { v.max(0.0) } else { fallback }
        }
        fn bounded(v: f32, min: f32, max: f32, fallback: f32) -> f32 {
            if v.is_nan() { fallback } else { v.clamp(min, max) }
        }

        Self {
            agent: AgentSettings {
                speed: non_negative(self.agent.speed, DEFAULT_AGENT_SPEED),
                view_angle: bounded(self.agent.view_angle, 0.0, 180.0, DEFAULT_VIEW_ANGLE),
                count: self.agent.count,
                pheromone_amount: non_negative(self.agent.pheromone_amount, DEFAULT_PHEROMONE_AMOUNT),
            },
            pheromone: PheromoneSettings {
                diffusion_rate: bounded(self.pheromone.diffusion_rate, 0.0, 1.0, DEFAULT_DIFFUSION_RATE),
                evaporation_rate: bounded(self.pheromone.evaporation_rate, 0.0, 1.0, DEFAULT_EVAPORATION_RATE),
                influence: non_negative(self.pheromone.influence, DEFAULT_INFLUENCE),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_match_panel_defaults() {
        let s = SimulationSettings::default();
        assert_eq!(s.agent.speed, 2.0);
        assert_eq!(s.agent.view_angle, 45.0);
        assert_eq!(s.agent.count, 1000);
        assert_eq!(s.agent.pheromone_amount, 5.0);
        assert_eq!(s.pheromone.diffusion_rate, 0.1);
        assert_eq!(s.pheromone.evaporation_rate, 0.05);
        assert_eq!(s.pheromone.influence, 1.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn defaults_sit_inside_panel_ranges() {
        fn within(v: f32, (lo, hi): (f32, f32)) -> bool {
            (lo..=hi).contains(&v)
        }
        let s = SimulationSettings::default();
        assert!(within(s.agent.speed, ui_ranges::SPEED));
        assert!(within(s.agent.view_angle, ui_ranges::VIEW_ANGLE));
        assert!((ui_ranges::COUNT.0..=ui_ranges::COUNT.1).contains(&s.agent.count));
        assert!(within(s.agent.pheromone_amount, ui_ranges::PHEROMONE_AMOUNT));
        assert!(within(s.pheromone.diffusion_rate, ui_ranges::DIFFUSION_RATE));
        assert!(within(s.pheromone.evaporation_rate, ui_ranges::EVAPORATION_RATE));
        assert!(within(s.pheromone.influence, ui_ranges::INFLUENCE));
        // Every panel value except the speed floor also passes validation.
        let top = SimulationSettings {
            agent: AgentSettings {
                speed: ui_ranges::SPEED.1,
                view_angle: ui_ranges::VIEW_ANGLE.1,
                count: ui_ranges::COUNT.1,
                pheromone_amount: ui_ranges::PHEROMONE_AMOUNT.1,
            },
            pheromone: PheromoneSettings {
                diffusion_rate: ui_ranges::DIFFUSION_RATE.1,
                evaporation_rate: ui_ranges::EVAPORATION_RATE.1,
                influence: ui_ranges::INFLUENCE.1,
            },
        };
        assert!(top.validate().is_ok());
    }

    #[test]
    fn exported_json_uses_camel_case_sections() {
        let json = SimulationSettings::default().to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        for key in ["speed", "viewAngle", "count", "pheromoneAmount"] {
            assert!(value["agent"].get(key).is_some(), "missing agent.{}", key);
        }
        for key in ["diffusionRate", "evaporationRate", "influence"] {
            assert!(value["pheromone"].get(key).is_some(), "missing pheromone.{}", key);
        }
    }

    #[test]
    fn missing_keys_fall_back_and_unknown_keys_are_ignored() {
        let text = r#"{ "agent": { "speed": 3.5, "colour": "red" }, "extra": true }"#;
        let s = SimulationSettings::from_json(text).unwrap();
        assert_eq!(s.agent.speed, 3.5);
        assert_eq!(s.agent.count, DEFAULT_AGENT_COUNT);
        assert_eq!(s.pheromone, PheromoneSettings::default());
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let prior = SimulationSettings::default();
        assert!(matches!(
            SimulationSettings::import_lenient("{ not json", &prior),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            SimulationSettings::import_lenient("[1, 2]", &prior),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(SimulationSettings::from_json("nope"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn lenient_import_keeps_prior_values_for_bad_fields() {
        let mut prior = SimulationSettings::default();
        prior.agent.speed = 7.0;
        prior.pheromone.influence = 2.5;
        let text = r#"{
            "agent": { "speed": "fast", "count": 250, "viewAngle": 400 },
            "pheromone": { "diffusionRate": 0.3, "influence": -1 }
        }"#;

        let report = SimulationSettings::import_lenient(text, &prior).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.settings.agent.speed, 7.0);
        assert_eq!(report.settings.agent.count, 250);
        assert_eq!(report.settings.agent.view_angle, prior.agent.view_angle);
        assert_eq!(report.settings.pheromone.diffusion_rate, 0.3);
        assert_eq!(report.settings.pheromone.influence, 2.5);

        let rejected: Vec<_> = report.rejected.iter().map(|r| r.field).collect();
        assert_eq!(rejected, vec!["agent.speed", "agent.viewAngle", "pheromone.influence"]);
    }

    #[test]
    fn lenient_import_accepts_integral_float_counts_only() {
        let prior = SimulationSettings::default();
        let ok = SimulationSettings::import_lenient(r#"{"agent":{"count":500.0}}"#, &prior).unwrap();
        assert_eq!(ok.settings.agent.count, 500);
        assert!(ok.is_complete());

        let bad = SimulationSettings::import_lenient(r#"{"agent":{"count":12.5}}"#, &prior).unwrap();
        assert_eq!(bad.settings.agent.count, prior.agent.count);
        assert_eq!(bad.rejected[0].field, "agent.count");
    }

    #[test]
    fn non_object_section_is_rejected_as_a_whole() {
        let prior = SimulationSettings::default();
        let report = SimulationSettings::import_lenient(r#"{"agent": 3}"#, &prior).unwrap();
        assert_eq!(report.settings, prior);
        assert_eq!(report.rejected[0].field, "agent");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut s = SimulationSettings::default();
        s.agent.count = 0;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::InvalidField { field: "agent.count", .. })
        ));

        let mut s = SimulationSettings::default();
        s.agent.speed = -1.0;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::InvalidField { field: "agent.speed", .. })
        ));

        let mut s = SimulationSettings::default();
        s.pheromone.evaporation_rate = 1.5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn sanitized_clamps_rates_and_negatives() {
        let mut s = SimulationSettings::default();
        s.agent.speed = -3.0;
        s.agent.view_angle = 270.0;
        s.agent.pheromone_amount = f32::NAN;
        s.pheromone.diffusion_rate = 2.0;
        s.pheromone.evaporation_rate = -0.5;
        s.pheromone.influence = f32::INFINITY;

        let clean = s.sanitized();
        assert_eq!(clean.agent.speed, 0.0);
        assert_eq!(clean.agent.view_angle, 180.0);
        assert_eq!(clean.agent.pheromone_amount, DEFAULT_PHEROMONE_AMOUNT);
        assert_eq!(clean.pheromone.diffusion_rate, 1.0);
        assert_eq!(clean.pheromone.evaporation_rate, 0.0);
        assert_eq!(clean.pheromone.influence, DEFAULT_INFLUENCE);
    }

    prop_compose! {
        fn arb_settings()(
            speed in 0.01f32..10.0,
            view_angle in 0.0f32..=180.0,
            count in 1u32..20_000,
            pheromone_amount in 0.0f32..20.0,
            diffusion_rate in 0.0f32..=1.0,
            evaporation_rate in 0.0f32..=1.0,
            influence in 0.0f32..5.0,
        ) -> SimulationSettings {
            SimulationSettings {
                agent: AgentSettings { speed, view_angle, count, pheromone_amount },
                pheromone: PheromoneSettings { diffusion_rate, evaporation_rate, influence },
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn json_round_trip_is_exact(s in arb_settings()) {
            let json = s.to_json().unwrap();
            let back = SimulationSettings::from_json(&json).unwrap();
            prop_assert_eq!(back, s);
        }

        #[test]
        fn lenient_import_of_export_is_complete(s in arb_settings()) {
            let json = s.to_json().unwrap();
            let report = SimulationSettings::import_lenient(&json, &SimulationSettings::default()).unwrap();
            prop_assert!(report.is_complete());
            prop_assert_eq!(report.settings, s);
        }

        #[test]
        fn sanitized_is_idempotent_on_valid_settings(s in arb_settings()) {
            prop_assert_eq!(s.sanitized(), s);
        }
    }
}
