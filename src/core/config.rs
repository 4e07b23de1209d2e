//! World configuration.
//!
//! Every tunable constant of the engine lives here with its default. The
//! values are heuristics; they are validated only against the structural
//! requirements the tick loop relies on (decay factors in (0,1), a stable
//! diffusion stencil, non-empty ranges).

use super::error::{WorldError, WorldResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid dimensions and field evolution constants
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Hard ceiling for every non-negative field
    pub field_max: f32,
    /// Largest `dt` a single evolve step will integrate
    pub max_dt: f32,

    pub diffusion: f32,
    /// How strongly local value_mass*will slows the paired diffusion
    pub coupling: f32,
    pub value_mass_decay: f32,
    pub will_decay: f32,
    pub coherence_scale: f32,

    pub resource_decay: f32,
    pub resource_regen: f32,
    pub resource_initial: f32,

    pub event_decay: f32,
    pub event_injections: usize,
    pub event_amplitude: f32,

    /// Spirit / body / soul decay factors
    pub soul_decay: [f32; 3],
    pub soul_nudge: f32,

    pub wave_diffusion: f32,
    pub wave_decay: f32,
    pub wave_perturbation: f32,
    pub wave_frequency: f32,

    pub danger_amplitude: f32,
    pub calm_bias: f32,

    pub imprint_gain: f32,
    pub imprint_samples_per_turn: usize,
    /// Upper bound on spiral samples per imprint
    pub imprint_max_samples: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: 64,
            height: 64,
            field_max: 10.0,
            max_dt: 1.0,
            diffusion: 0.2,
            coupling: 0.5,
            value_mass_decay: 0.98,
            will_decay: 0.97,
            coherence_scale: 4.0,
            resource_decay: 0.995,
            resource_regen: 0.01,
            resource_initial: 1.0,
            event_decay: 0.85,
            event_injections: 2,
            event_amplitude: 1.0,
            soul_decay: [0.97, 0.98, 0.99],
            soul_nudge: 0.02,
            wave_diffusion: 0.15,
            wave_decay: 0.96,
            wave_perturbation: 0.05,
            wave_frequency: 0.05,
            danger_amplitude: 0.05,
            calm_bias: 0.2,
            imprint_gain: 0.05,
            imprint_samples_per_turn: 64,
            imprint_max_samples: 4096,
        }
    }
}

/// Agent table capacity, bounds and metabolism
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub capacity: usize,
    pub max_speed: f32,
    pub max_energy: f32,
    pub max_hp: f32,
    pub default_hp: f32,
    /// Agents live in z ∈ [-depth, depth]
    pub depth: f32,
    pub memory_len: usize,

    pub base_metabolism: f32,
    pub move_cost: f32,
    pub consume_rate: f32,
    /// Energy gained per unit of resource consumed
    pub resource_energy: f32,
    pub danger_damage: f32,
    pub heal_rate: f32,

    pub deposit_value_mass: f32,
    pub deposit_will: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            capacity: 256,
            max_speed: 2.0,
            max_energy: 1000.0,
            max_hp: 1000.0,
            default_hp: 100.0,
            depth: 8.0,
            memory_len: 8,
            base_metabolism: 0.5,
            move_cost: 0.1,
            consume_rate: 0.5,
            resource_energy: 4.0,
            danger_damage: 5.0,
            heal_rate: 0.1,
            deposit_value_mass: 0.05,
            deposit_will: 0.02,
        }
    }
}

/// Force composition coefficients
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub field_pull: f32,
    /// Weight of `will` in the pulled potential `value_mass + w * will`
    pub will_weight: f32,
    pub social: f32,
    pub gravity: f32,
    pub celestial: f32,
    pub celestial_masses: [f32; 2],
    /// Orbit radii as fractions of the smaller grid dimension
    pub celestial_radii: [f32; 2],
    /// Radians per tick
    pub celestial_speeds: [f32; 2],
    /// Smoothing term added to every distance denominator
    pub epsilon: f32,
    pub noise: f32,
    pub force_to_accel: f32,
    pub velocity_retention: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        ForceConfig {
            field_pull: 0.5,
            will_weight: 0.6,
            social: 0.05,
            gravity: 0.02,
            celestial: 0.005,
            celestial_masses: [1.0, 0.6],
            celestial_radii: [0.3, 0.45],
            celestial_speeds: [0.01, 0.004],
            epsilon: 0.25,
            noise: 0.1,
            force_to_accel: 1.0,
            velocity_retention: 0.9,
        }
    }
}

/// Reproduction, death and group detection thresholds
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub reproduction_threshold: f32,
    /// Fraction of energy the parent keeps on reproduction
    pub reproduction_keep: f32,
    pub min_survival_energy: f32,
    pub max_age: u32,
    pub birth_jitter: f32,
    pub birth_bond: f32,
    pub awakening_threshold: f32,
    /// Ticks between connected-component passes (0 disables)
    pub group_interval: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            reproduction_threshold: 600.0,
            reproduction_keep: 0.5,
            min_survival_energy: 1.0,
            max_age: 5000,
            birth_jitter: 1.0,
            birth_bond: 1.0,
            awakening_threshold: 5.0,
            group_interval: 25,
        }
    }
}

/// Adaptive gain controller and intervention schedule
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub agent_rate: f32,
    pub global_rate: f32,
    pub gain_min: f32,
    pub gain_max: f32,
    pub emotion_rate: f32,
    pub replay_capacity: usize,
    pub intervention_period: u64,
    pub calm_offset: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            agent_rate: 0.1,
            global_rate: 0.5,
            gain_min: 0.1,
            gain_max: 3.0,
            emotion_rate: 0.1,
            replay_capacity: 256,
            intervention_period: 50,
            calm_offset: 25,
        }
    }
}

/// Top-level configuration for a [`crate::World`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub grid: GridConfig,
    pub agents: AgentConfig,
    pub forces: ForceConfig,
    pub lifecycle: LifecycleConfig,
    pub policy: PolicyConfig,
    /// Fixed RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Ticks between logged summaries (0 disables)
    pub report_interval: u64,
}

impl WorldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> WorldResult<Self> {
        let cfg: WorldConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| WorldError::io(path, e))?;
        Self::from_json_str(&raw)
    }

    /// Reject settings that would break the tick loop's structural guarantees.
    pub fn validate(&self) -> WorldResult<()> {
        let g = &self.grid;
        if g.width < 2 || g.height < 2 {
            return invalid(format!("grid must be at least 2x2, got {}x{}", g.width, g.height));
        }
        if !(g.field_max > 0.0) {
            return invalid("field_max must be positive");
        }
        if !(g.max_dt > 0.0) {
            return invalid("max_dt must be positive");
        }
        if g.diffusion < 0.0 || 4.0 * g.diffusion * g.max_dt > 1.0 {
            return invalid("diffusion * max_dt must lie in [0, 0.25]");
        }
        if g.wave_diffusion < 0.0 || 4.0 * g.wave_diffusion * g.max_dt > 1.0 {
            return invalid("wave_diffusion * max_dt must lie in [0, 0.25]");
        }
        if g.imprint_max_samples == 0 {
            return invalid("imprint_max_samples must be non-zero");
        }
        if g.coupling < 0.0 || g.coherence_scale <= 0.0 {
            return invalid("coupling must be non-negative and coherence_scale positive");
        }
        let decays = [
            ("value_mass_decay", g.value_mass_decay),
            ("will_decay", g.will_decay),
            ("resource_decay", g.resource_decay),
            ("event_decay", g.event_decay),
            ("soul_decay[0]", g.soul_decay[0]),
            ("soul_decay[1]", g.soul_decay[1]),
            ("soul_decay[2]", g.soul_decay[2]),
            ("wave_decay", g.wave_decay),
        ];
        for (name, rate) in decays {
            if !(rate > 0.0 && rate < 1.0) {
                return invalid(format!("{} must lie in (0, 1), got {}", name, rate));
            }
        }

        let a = &self.agents;
        if a.capacity == 0 {
            return invalid("agent capacity must be non-zero");
        }
        if !(a.max_speed > 0.0 && a.max_energy > 0.0 && a.max_hp > 0.0) {
            return invalid("max_speed, max_energy and max_hp must be positive");
        }
        if a.memory_len == 0 {
            return invalid("memory_len must be non-zero");
        }

        let f = &self.forces;
        if !(f.epsilon > 0.0) {
            return invalid("force epsilon must be positive");
        }
        if !(0.0..=1.0).contains(&f.velocity_retention) {
            return invalid("velocity_retention must lie in [0, 1]");
        }

        let l = &self.lifecycle;
        if !(l.reproduction_keep > 0.0 && l.reproduction_keep < 1.0) {
            return invalid("reproduction_keep must lie in (0, 1)");
        }
        if l.reproduction_threshold > a.max_energy {
            return invalid("reproduction_threshold exceeds max_energy");
        }

        let p = &self.policy;
        if !(p.gain_min > 0.0 && p.gain_min < p.gain_max) {
            return invalid("gain range must satisfy 0 < gain_min < gain_max");
        }
        if !(0.0..=1.0).contains(&p.emotion_rate) {
            return invalid("emotion_rate must lie in [0, 1]");
        }
        if p.replay_capacity == 0 {
            return invalid("replay_capacity must be non-zero");
        }
        if p.calm_offset == 0 || p.calm_offset >= p.intervention_period {
            return invalid("calm_offset must satisfy 0 < calm_offset < intervention_period");
        }
        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> WorldResult<T> {
    Err(WorldError::InvalidConfig(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = WorldConfig::from_json_str(
            r#"{ "grid": { "width": 32, "height": 16 }, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(cfg.grid.width, 32);
        assert_eq!(cfg.grid.height, 16);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.agents.capacity, AgentConfig::default().capacity);
    }

    #[test]
    fn rejects_unstable_diffusion() {
        let mut cfg = WorldConfig::default();
        cfg.grid.diffusion = 0.3;
        assert!(matches!(cfg.validate(), Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_decay_outside_unit_interval() {
        let mut cfg = WorldConfig::default();
        cfg.grid.will_decay = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_calm_offset_outside_period() {
        let mut cfg = WorldConfig::default();
        cfg.policy.calm_offset = cfg.policy.intervention_period;
        assert!(cfg.validate().is_err());
        cfg.policy.calm_offset = 0;
        assert!(cfg.validate().is_err());
        cfg.policy.intervention_period = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_imprint_sample_cap() {
        let mut cfg = WorldConfig::default();
        cfg.grid.imprint_max_samples = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = WorldConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, WorldError::Io { .. }));
    }
}
