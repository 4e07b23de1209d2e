//! Adaptive Policy
//!
//! Reward-driven gain control. Each agent appraises its cell (pleasantness
//! vs intensity), shifts its emotion toward that appraisal, and nudges its
//! policy gain by the resulting reward. A global gain tracks the change in
//! mean reward tick over tick. Both are plain bounded integrators.

pub mod intervention;
pub mod replay;

pub use intervention::Intervention;
pub use replay::{ReplayLog, ReplayRecord};

use crate::core::config::PolicyConfig;
use crate::field::derived::{SENSE_CALM, SENSE_DANGER, SENSE_DENSITY, SENSE_GRAD_VALUE_MASS, SENSE_GRAD_WILL};
use crate::field::FieldGrid;
use crate::swarm::AgentStore;
use serde::{Deserialize, Serialize};

/// Local appraisal of one cell, both in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Appraisal {
    pub pleasantness: f32,
    pub intensity: f32,
}

/// Pleasantness and intensity at `cell`.
pub fn appraise(fields: &FieldGrid, cell: usize) -> Appraisal {
    let s = fields.senses_at(cell);
    let inv_max = 1.0 / fields.field_max();
    let reward = fields.event_reward.at(0, cell) * inv_max;
    let danger = fields.event_danger.at(0, cell) * inv_max;
    let coherence = fields.coherence.at(0, cell) * inv_max;

    let pleasantness = 0.5 * s[SENSE_CALM] + reward + 0.25 * coherence;
    let intensity =
        0.25 * (s[SENSE_GRAD_VALUE_MASS] + s[SENSE_GRAD_WILL]) + 0.25 * s[SENSE_DENSITY] + s[SENSE_DANGER] + danger;
    Appraisal {
        pleasantness: pleasantness.clamp(0.0, 1.0),
        intensity: intensity.clamp(0.0, 1.0),
    }
}

/// Aggregates of one policy update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolicyTick {
    pub mean_reward: f32,
    pub mean_valence: f32,
    pub mean_arousal: f32,
    pub intervention: Intervention,
}

pub struct AdaptivePolicy {
    cfg: PolicyConfig,
    global_gain: f32,
    previous_mean_reward: f32,
    current: Intervention,
    replay: ReplayLog,
}

impl AdaptivePolicy {
    pub fn new(cfg: &PolicyConfig) -> Self {
        AdaptivePolicy {
            cfg: cfg.clone(),
            global_gain: 1.0_f32.clamp(cfg.gain_min, cfg.gain_max),
            previous_mean_reward: 0.0,
            current: Intervention::None,
            replay: ReplayLog::new(cfg.replay_capacity),
        }
    }

    pub fn global_gain(&self) -> f32 {
        self.global_gain
    }

    pub fn previous_mean_reward(&self) -> f32 {
        self.previous_mean_reward
    }

    pub fn current_intervention(&self) -> Intervention {
        self.current
    }

    pub fn replay(&self) -> &ReplayLog {
        &self.replay
    }

    /// Appraise, move emotions, compute rewards and update both gains.
    ///
    /// `energy_delta[i]` is the metabolic energy change of slot `i` this tick
    /// (zero for newborns). Returns the mean reward, or `None` when no agent
    /// is alive, in which case the global gain is left alone.
    pub fn learn(&mut self, store: &mut AgentStore, fields: &FieldGrid, energy_delta: &[f32]) -> Option<f32> {
        let alive = store.alive_indices();
        if alive.is_empty() {
            return None;
        }
        let rate = self.cfg.emotion_rate;
        let mut total = 0.0f32;
        for &i in &alive {
            let cell = fields.cell_of(store.x[i], store.y[i]);
            let a = appraise(fields, cell);
            store.valence[i] = (store.valence[i] + rate * (a.pleasantness - store.valence[i])).clamp(0.0, 1.0);
            store.arousal[i] = (store.arousal[i] + rate * (a.intensity - store.arousal[i])).clamp(0.0, 1.0);

            let delta = energy_delta.get(i).copied().unwrap_or(0.0);
            let reward = delta + a.pleasantness - a.intensity;
            store.policy_gain[i] =
                (store.policy_gain[i] + self.cfg.agent_rate * reward).clamp(self.cfg.gain_min, self.cfg.gain_max);
            total += reward;
        }
        let mean = total / alive.len() as f32;
        self.global_gain = (self.global_gain + self.cfg.global_rate * (mean - self.previous_mean_reward))
            .clamp(self.cfg.gain_min, self.cfg.gain_max);
        self.previous_mean_reward = mean;
        Some(mean)
    }

    /// Apply the scheduled intervention for `tick` and remember it as current.
    pub fn intervene(&mut self, tick: u64, fields: &mut FieldGrid) -> Intervention {
        self.current = Intervention::scheduled(tick, &self.cfg);
        self.current.apply(fields);
        self.current
    }

    /// Append this tick's aggregates to the replay log.
    pub fn record(&mut self, tick: u64, mean_reward: Option<f32>, store: &AgentStore) -> PolicyTick {
        let summary = PolicyTick {
            mean_reward: mean_reward.unwrap_or(0.0),
            mean_valence: store.alive_mean(&store.valence),
            mean_arousal: store.alive_mean(&store.arousal),
            intervention: self.current,
        };
        self.replay.push(ReplayRecord {
            tick,
            mean_reward: summary.mean_reward,
            mean_valence: summary.mean_valence,
            mean_arousal: summary.mean_arousal,
            intervention: summary.intervention,
        });
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AgentConfig, GridConfig};
    use crate::swarm::AgentProperties;

    fn setup() -> (AgentStore, FieldGrid, AdaptivePolicy) {
        let agents = AgentConfig {
            capacity: 4,
            ..AgentConfig::default()
        };
        let grid = GridConfig {
            width: 8,
            height: 8,
            danger_amplitude: 0.0,
            ..GridConfig::default()
        };
        (
            AgentStore::new(&agents, 8, 8),
            FieldGrid::new(&grid),
            AdaptivePolicy::new(&PolicyConfig::default()),
        )
    }

    #[test]
    fn appraisal_is_bounded() {
        let (_, mut fields, _) = setup();
        fields.event_reward.data[0] = 10.0;
        fields.event_danger.data[1] = 10.0;
        let good = appraise(&fields, 0);
        let bad = appraise(&fields, 1);
        assert_eq!(good.pleasantness, 1.0);
        assert_eq!(bad.intensity, 1.0);
    }

    #[test]
    fn agent_gain_clamped() {
        let (mut store, fields, mut policy) = setup();
        let i = store.allocate("a", &AgentProperties::at(1.0, 1.0)).unwrap();
        let delta = vec![1000.0; 4];
        policy.learn(&mut store, &fields, &delta);
        assert_eq!(store.policy_gain[i], 3.0);
        let delta = vec![-1000.0; 4];
        policy.learn(&mut store, &fields, &delta);
        assert_eq!(store.policy_gain[i], 0.1);
    }

    #[test]
    fn global_gain_follows_reward_change() {
        let (mut store, fields, mut policy) = setup();
        store.allocate("a", &AgentProperties::at(1.0, 1.0)).unwrap();
        let before = policy.global_gain();
        policy.learn(&mut store, &fields, &[0.8, 0.0, 0.0, 0.0]);
        assert!(policy.global_gain() > before);

        let up = policy.global_gain();
        policy.learn(&mut store, &fields, &[-0.8, 0.0, 0.0, 0.0]);
        assert!(policy.global_gain() < up);
    }

    #[test]
    fn empty_population_keeps_global_gain() {
        let (mut store, fields, mut policy) = setup();
        let before = policy.global_gain();
        assert_eq!(policy.learn(&mut store, &fields, &[]), None);
        assert_eq!(policy.global_gain(), before);
    }

    #[test]
    fn valence_moves_toward_pleasantness() {
        let (mut store, mut fields, mut policy) = setup();
        let i = store
            .allocate("a", &AgentProperties::at(1.0, 1.0).with_emotion(0.0, 0.0))
            .unwrap();
        let cell = fields.cell_of(1.0, 1.0);
        fields.event_reward.data[cell] = 10.0;
        policy.learn(&mut store, &fields, &[0.0; 4]);
        assert!(store.valence[i] > 0.0);
        assert!(store.valence[i] <= 0.1 + 1e-6);
    }

    #[test]
    fn records_land_in_replay() {
        let (mut store, mut fields, mut policy) = setup();
        store.allocate("a", &AgentProperties::at(1.0, 1.0)).unwrap();
        let mean = policy.learn(&mut store, &fields, &[0.0; 4]);
        let iv = policy.intervene(50, &mut fields);
        let tick = policy.record(50, mean, &store);
        assert_eq!(iv, Intervention::PhaseBoost);
        assert_eq!(tick.intervention, Intervention::PhaseBoost);
        assert_eq!(policy.replay().len(), 1);
        assert_eq!(policy.replay().latest().map(|r| r.tick), Some(50));
    }
}
