//! Fixed-period scripted interventions on the wave field.

use crate::core::config::PolicyConfig;
use crate::field::FieldGrid;
use serde::{Deserialize, Serialize};
use std::fmt;

const BOOST_SCALE: f32 = 1.2;
const BOOST_ADD: f32 = 0.1;
const BOOST_SHIFT: f32 = 0.3;
const CALM_DAMP: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    #[default]
    None,
    PhaseBoost,
    CalmAlign,
}

impl Intervention {
    /// What the schedule prescribes for `tick`.
    pub fn scheduled(tick: u64, cfg: &PolicyConfig) -> Self {
        if cfg.intervention_period == 0 {
            return Intervention::None;
        }
        match tick % cfg.intervention_period {
            0 => Intervention::PhaseBoost,
            t if t == cfg.calm_offset => Intervention::CalmAlign,
            _ => Intervention::None,
        }
    }

    pub fn apply(self, fields: &mut FieldGrid) {
        match self {
            Intervention::None => {}
            Intervention::PhaseBoost => fields.boost_wave(BOOST_SCALE, BOOST_ADD, BOOST_SHIFT),
            Intervention::CalmAlign => fields.damp_wave(CALM_DAMP),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intervention::None => "none",
            Intervention::PhaseBoost => "phase_boost",
            Intervention::CalmAlign => "calm_align",
        }
    }
}

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GridConfig;
    use crate::field::WAVE_AMPLITUDE;

    #[test]
    fn schedule_follows_period_and_offset() {
        let cfg = PolicyConfig {
            intervention_period: 10,
            calm_offset: 4,
            ..PolicyConfig::default()
        };
        assert_eq!(Intervention::scheduled(10, &cfg), Intervention::PhaseBoost);
        assert_eq!(Intervention::scheduled(14, &cfg), Intervention::CalmAlign);
        assert_eq!(Intervention::scheduled(15, &cfg), Intervention::None);
        assert_eq!(Intervention::scheduled(20, &cfg), Intervention::PhaseBoost);
    }

    #[test]
    fn zero_period_disables_schedule() {
        let cfg = PolicyConfig {
            intervention_period: 0,
            ..PolicyConfig::default()
        };
        assert_eq!(Intervention::scheduled(0, &cfg), Intervention::None);
    }

    #[test]
    fn boost_then_calm_changes_amplitude() {
        let mut fields = FieldGrid::new(&GridConfig {
            width: 4,
            height: 4,
            ..GridConfig::default()
        });
        Intervention::PhaseBoost.apply(&mut fields);
        let boosted = fields.wave_phase.max_value(WAVE_AMPLITUDE);
        assert!((boosted - BOOST_ADD).abs() < 1e-6);
        Intervention::CalmAlign.apply(&mut fields);
        assert!(fields.wave_phase.max_value(WAVE_AMPLITUDE) < boosted);
        assert_eq!(Intervention::CalmAlign.to_string(), "calm_align");
    }
}
