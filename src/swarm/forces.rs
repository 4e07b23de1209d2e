//! Force Composer
//!
//! Net force per living agent from five sources: the field potential,
//! social cohesion along graph edges, centroid gravity, the two celestial
//! bodies, and gain-scaled Gaussian noise. Evaluation is a pure read over
//! the store, graph and fields and runs in parallel; the noise is drawn up
//! front from the caller's RNG so a seeded world replays exactly.

use super::celestial::CelestialBody;
use super::graph::ConnectionGraph;
use super::store::AgentStore;
use crate::core::config::{ForceConfig, PolicyConfig};
use crate::field::FieldGrid;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

#[inline(always)]
fn norm2(d: [f32; 3]) -> f32 {
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

#[inline(always)]
fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
fn add_scaled(f: &mut [f32; 3], d: [f32; 3], k: f32) {
    f[0] += d[0] * k;
    f[1] += d[1] * k;
    f[2] += d[2] * k;
}

pub struct ForceComposer {
    cfg: ForceConfig,
    gain_min: f32,
    gain_max: f32,
}

impl ForceComposer {
    pub fn new(cfg: &ForceConfig, policy: &PolicyConfig) -> Self {
        ForceComposer {
            cfg: cfg.clone(),
            gain_min: policy.gain_min,
            gain_max: policy.gain_max,
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.cfg
    }

    /// `clamp(agent_gain) * global_gain`
    #[inline]
    pub fn effective_gain(&self, agent_gain: f32, global_gain: f32) -> f32 {
        agent_gain.clamp(self.gain_min, self.gain_max) * global_gain
    }

    /// Zero-mean noise per slot with std `NOISE / effective_gain`; dead
    /// slots get zeros. Drawn in slot order.
    pub fn draw_noise<R: Rng + ?Sized>(&self, store: &AgentStore, global_gain: f32, rng: &mut R) -> Vec<[f32; 3]> {
        let mut out = vec![[0.0f32; 3]; store.capacity()];
        if self.cfg.noise <= 0.0 {
            return out;
        }
        for i in store.alive_indices() {
            let eff = self.effective_gain(store.policy_gain[i], global_gain).max(1e-3);
            let Ok(normal) = Normal::new(0.0f32, self.cfg.noise / eff) else {
                continue;
            };
            out[i] = [normal.sample(rng), normal.sample(rng), normal.sample(rng)];
        }
        out
    }

    /// Net force on every slot (zero for dead slots).
    pub fn compose(
        &self,
        store: &AgentStore,
        graph: &ConnectionGraph,
        fields: &FieldGrid,
        bodies: &[CelestialBody],
        global_gain: f32,
        noise: &[[f32; 3]],
    ) -> Vec<[f32; 3]> {
        let centroid = store.centroid();
        (0..store.capacity())
            .into_par_iter()
            .map(|i| {
                if !store.is_alive(i) {
                    return [0.0; 3];
                }
                let mut f = self.pull_on(i, store, graph, fields, bodies, centroid);
                let eff = self.effective_gain(store.policy_gain[i], global_gain);
                let n = noise.get(i).copied().unwrap_or([0.0; 3]);
                for k in 0..3 {
                    f[k] = f[k] * eff + n[k];
                }
                f
            })
            .collect()
    }

    /// Deterministic part of the force on agent `i`, before gain scaling.
    pub fn pull_on(
        &self,
        i: usize,
        store: &AgentStore,
        graph: &ConnectionGraph,
        fields: &FieldGrid,
        bodies: &[CelestialBody],
        centroid: Option<[f32; 3]>,
    ) -> [f32; 3] {
        let c = &self.cfg;
        let eps = c.epsilon;
        let p = store.position(i);

        // 1. Field pull along the intentional flow
        let cell = fields.cell_of(p[0], p[1]);
        let (fx, fy) = fields.field_flow(cell, c.will_weight);
        let mut f = [c.field_pull * fx, c.field_pull * fy, 0.0];

        // 2. Social cohesion toward living neighbours
        for (j, w) in graph.neighbours(i) {
            if !store.is_alive(j) {
                continue;
            }
            let d = sub(store.position(j), p);
            add_scaled(&mut f, d, c.social * w / (norm2(d) + eps));
        }

        // 3. Centroid gravity
        if let Some(center) = centroid {
            let d = sub(center, p);
            add_scaled(&mut f, d, c.gravity * store.mass[i] / (norm2(d) + eps));
        }

        // 4. Celestial pull, inverse square
        for b in bodies {
            let d = sub([b.position[0], b.position[1], 0.0], p);
            let r2 = norm2(d) + eps;
            add_scaled(&mut f, d, c.celestial * b.mass / (r2 * r2.sqrt()));
        }
        f
    }
}
