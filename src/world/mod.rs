//! World
//!
//! The single owned aggregate: fields, agent table, connection graph, policy
//! state and the seeded RNG. `step` is the only per-tick entry point and runs
//! the phases in a fixed order:
//!
//! 1. fields evolve (diffusion, decay, events, derived refresh)
//! 2. celestial bodies advance
//! 3. forces are composed and integrated
//! 4. metabolism
//! 5. reproduction, then death
//! 6. policy: emotion, reward, gains, intervention, replay
//! 7. agent deposits and derived refresh
//! 8. awakenings, memory, periodic groups and summary

pub mod report;
pub mod shared;

#[cfg(test)]
mod scale_test;

pub use report::{AgentSnapshot, WorldSnapshot};
pub use shared::SharedWorld;

use crate::core::config::WorldConfig;
use crate::core::error::{WorldError, WorldResult};
use crate::field::{FieldGrid, WillOperation};
use crate::policy::AdaptivePolicy;
use crate::swarm::metabolism;
use crate::swarm::{
    AgentProperties, AgentStore, AgentView, AllocError, CelestialSystem, ConnectionGraph, DeathRecord, ForceComposer,
    LifecycleManager, NewbornRecord,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Emitted the first time an agent's local coherence reaches the
/// awakening threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwakeningEvent {
    pub tick: u64,
    pub id: String,
    pub index: usize,
    pub coherence: f32,
    pub valence: f32,
}

pub struct World {
    cfg: WorldConfig,
    pub(crate) fields: FieldGrid,
    pub(crate) store: AgentStore,
    pub(crate) graph: ConnectionGraph,
    forces: ForceComposer,
    celestial: CelestialSystem,
    lifecycle: LifecycleManager,
    policy: AdaptivePolicy,
    rng: StdRng,
    seed: u64,
    tick: u64,
    last_deaths: Vec<DeathRecord>,
}

impl World {
    /// Validate `cfg` and build an empty world. An unset seed is drawn from
    /// the thread RNG and logged so the run can be replayed.
    pub fn new(cfg: WorldConfig) -> WorldResult<Self> {
        cfg.validate()?;
        let seed = cfg.seed.unwrap_or_else(rand::random);
        let (w, h) = (cfg.grid.width, cfg.grid.height);
        let world = World {
            fields: FieldGrid::new(&cfg.grid),
            store: AgentStore::new(&cfg.agents, w, h),
            graph: ConnectionGraph::new(cfg.agents.capacity),
            forces: ForceComposer::new(&cfg.forces, &cfg.policy),
            celestial: CelestialSystem::new(&cfg.forces, w, h),
            lifecycle: LifecycleManager::new(&cfg.lifecycle),
            policy: AdaptivePolicy::new(&cfg.policy),
            rng: StdRng::seed_from_u64(seed),
            seed,
            tick: 0,
            last_deaths: Vec::new(),
            cfg,
        };
        info!(
            "[World] Initialized {}x{} grid, capacity {}, seed {}",
            w, h, world.cfg.agents.capacity, seed
        );
        Ok(world)
    }

    pub fn with_seed(mut cfg: WorldConfig, seed: u64) -> WorldResult<Self> {
        cfg.seed = Some(seed);
        Self::new(cfg)
    }

    // ---------------------------------------------------------------
    // Collaborator operations
    // ---------------------------------------------------------------

    /// Place a new agent. Returns `None` (and warns) when the table is full
    /// or the identifier is already alive.
    pub fn add_agent(&mut self, identifier: &str, properties: AgentProperties) -> Option<usize> {
        match self.store.allocate(identifier, &properties) {
            Ok(index) => {
                debug!("[World] Added agent {} at slot {}", identifier, index);
                Some(index)
            }
            Err(AllocError::Full { capacity }) => {
                warn!("[World] Agent table full ({} slots), dropping {}", capacity, identifier);
                None
            }
            Err(AllocError::Duplicate(id)) => {
                warn!("[World] Agent {} already exists", id);
                None
            }
        }
    }

    /// Symmetric edge between two living agents. Unknown identifiers and
    /// self-connections are a logged no-op.
    pub fn add_connection(&mut self, id_a: &str, id_b: &str, strength: f32) -> bool {
        let (Some(a), Some(b)) = (self.store.index_of(id_a), self.store.index_of(id_b)) else {
            warn!("[World] Cannot connect {} <-> {}: unknown agent", id_a, id_b);
            return false;
        };
        if !self.graph.connect(a, b, strength) {
            warn!("[World] Rejected connection {} <-> {}", id_a, id_b);
            return false;
        }
        true
    }

    pub fn apply_will_operation(&mut self, kind: WillOperation, strength: f32) {
        self.fields.apply_will_operation(kind, strength);
    }

    /// String form of [`World::apply_will_operation`].
    pub fn apply_will_operation_named(&mut self, kind: &str, strength: f32) -> WorldResult<()> {
        let kind: WillOperation = kind.parse()?;
        self.apply_will_operation(kind, strength);
        Ok(())
    }

    /// Returns the number of spiral samples that landed on the grid.
    pub fn imprint_pattern(&mut self, center: (f32, f32), radius: f32, turns: f32, strength: f32) -> usize {
        let landed = self.fields.imprint_pattern(center, radius, turns, strength);
        debug!(
            "[World] Imprint at ({:.1}, {:.1}) r={:.1} turns={:.1}: {} samples",
            center.0, center.1, radius, turns, landed
        );
        landed
    }

    // ---------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------

    /// Advance one tick. Returns the births and awakenings of this tick.
    pub fn step(&mut self, dt: f32) -> (Vec<NewbornRecord>, Vec<AwakeningEvent>) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.cfg.grid.max_dt)
        } else {
            warn!("[World] Non-finite dt {}, stepping with dt=0", dt);
            0.0
        };
        self.tick += 1;
        let tick = self.tick;
        let (w, h) = (self.cfg.grid.width, self.cfg.grid.height);

        // 1. Fields
        let occupancy = self.store.occupancy(w, h);
        self.fields.evolve(dt, &occupancy, &mut self.rng);

        // 2-3. Celestial bodies, forces, integration
        self.celestial.advance(tick);
        let global_gain = self.policy.global_gain();
        let noise = self.forces.draw_noise(&self.store, global_gain, &mut self.rng);
        let forces = self.forces.compose(
            &self.store,
            &self.graph,
            &self.fields,
            &self.celestial.bodies,
            global_gain,
            &noise,
        );
        let retention = self.cfg.forces.velocity_retention;
        let accel = self.cfg.forces.force_to_accel;
        for i in self.store.alive_indices() {
            self.store.integrate(i, forces[i], dt, retention, accel);
        }

        // 4. Metabolism
        let energy_before = self.store.energy.clone();
        metabolism::metabolise(&mut self.store, &mut self.fields, &self.cfg.agents, dt);
        let energy_delta: Vec<f32> = self
            .store
            .energy
            .iter()
            .zip(energy_before.iter())
            .map(|(after, before)| after - before)
            .collect();

        // 5. Lifecycle
        let newborns = self
            .lifecycle
            .reproduce(tick, &mut self.store, &mut self.graph, &mut self.rng);
        self.last_deaths = self.lifecycle.cull(tick, &mut self.store, &mut self.graph);

        // 6. Policy
        let mean_reward = self.policy.learn(&mut self.store, &self.fields, &energy_delta);
        self.policy.intervene(tick, &mut self.fields);
        self.policy.record(tick, mean_reward, &self.store);

        // 7. Deposits
        metabolism::deposit(&self.store, &mut self.fields, &self.cfg.agents);
        self.fields.refresh_derived();
        let occupancy = self.store.occupancy(w, h);
        self.fields.refresh_density(&occupancy);

        // 8. Bookkeeping
        let awakenings = self.detect_awakenings();
        for i in self.store.alive_indices() {
            self.store.remember(i, tick);
        }
        let group_interval = self.cfg.lifecycle.group_interval;
        if group_interval > 0 && tick % group_interval == 0 {
            self.detect_groups();
        }
        if !newborns.is_empty() || !self.last_deaths.is_empty() {
            debug!(
                "[World] tick {}: {} born, {} died, {} alive",
                tick,
                newborns.len(),
                self.last_deaths.len(),
                self.store.alive_count()
            );
        }
        let report_interval = self.cfg.report_interval;
        if report_interval > 0 && tick % report_interval == 0 {
            info!("[World] {}", self.summary());
        }

        debug_assert!(
            self.verify_invariants().is_ok(),
            "invariant broken at tick {}: {:?}",
            tick,
            self.verify_invariants().err()
        );
        (newborns, awakenings)
    }

    fn detect_awakenings(&mut self) -> Vec<AwakeningEvent> {
        let threshold = self.cfg.lifecycle.awakening_threshold;
        let mut events = Vec::new();
        for i in self.store.alive_indices() {
            if self.store.awakened[i] {
                continue;
            }
            let cell = self.fields.cell_of(self.store.x[i], self.store.y[i]);
            let coherence = self.fields.coherence.at(0, cell);
            if coherence < threshold {
                continue;
            }
            self.store.awakened[i] = true;
            let id = self.store.id_of(i).unwrap_or_default().to_string();
            info!("[World] {} awakened (coherence {:.2})", id, coherence);
            events.push(AwakeningEvent {
                tick: self.tick,
                id,
                index: i,
                coherence,
                valence: self.store.valence[i],
            });
        }
        events
    }

    /// Label connected components of the living social graph. Returns the
    /// number of groups with two or more members.
    pub fn detect_groups(&mut self) -> usize {
        let groups = self.graph.components(&self.store.alive);
        let count = groups.iter().flatten().max().map_or(0, |g| *g as usize + 1);
        for (i, g) in groups.into_iter().enumerate() {
            if self.store.alive[i] {
                self.store.group[i] = g;
            }
        }
        count
    }

    /// Full consistency check of fields, agents and graph.
    pub fn verify_invariants(&self) -> WorldResult<()> {
        self.fields.verify_bounds()?;
        let (w, h) = (self.cfg.grid.width as f32, self.cfg.grid.height as f32);
        let speed_limit = self.store.max_speed() * (1.0 + 1e-5);
        for i in 0..self.store.capacity() {
            if !self.store.alive[i] {
                if !self.graph.is_isolated(i) {
                    return Err(self.agent_error(i, "dead slot still has graph edges"));
                }
                continue;
            }
            let (x, y) = (self.store.x[i], self.store.y[i]);
            if !(x >= 0.0 && x < w && y >= 0.0 && y < h) {
                return Err(self.agent_error(i, &format!("position ({}, {}) off grid", x, y)));
            }
            if self.store.speed(i) > speed_limit {
                return Err(self.agent_error(i, &format!("speed {}", self.store.speed(i))));
            }
            let e = self.store.energy[i];
            if !(e >= 0.0 && e <= self.store.max_energy()) {
                return Err(self.agent_error(i, &format!("energy {}", e)));
            }
            let hp = self.store.hp[i];
            if !(hp >= 0.0 && hp <= self.store.max_hp()) {
                return Err(self.agent_error(i, &format!("hp {}", hp)));
            }
            if let Some((j, _)) = self.graph.neighbours(i).find(|(j, _)| !self.store.alive[*j]) {
                return Err(self.agent_error(i, &format!("edge to dead slot {}", j)));
            }
        }
        Ok(())
    }

    fn agent_error(&self, index: usize, detail: &str) -> WorldError {
        WorldError::AgentOutOfBounds {
            id: self.store.id_of(index).unwrap_or("<free>").to_string(),
            index,
            detail: detail.to_string(),
        }
    }

    // ---------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    pub fn alive_count(&self) -> usize {
        self.store.alive_count()
    }

    pub fn agent(&self, identifier: &str) -> Option<AgentView> {
        self.store.index_of(identifier).and_then(|i| self.store.view(i))
    }

    /// Every living agent, in slot order.
    pub fn agents(&self) -> Vec<AgentView> {
        self.store
            .alive_indices()
            .into_iter()
            .filter_map(|i| self.store.view(i))
            .collect()
    }

    pub fn fields(&self) -> &FieldGrid {
        &self.fields
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    pub fn policy(&self) -> &AdaptivePolicy {
        &self.policy
    }

    pub fn celestial(&self) -> &CelestialSystem {
        &self.celestial
    }

    /// Agents removed during the most recent tick.
    pub fn last_deaths(&self) -> &[DeathRecord] {
        &self.last_deaths
    }
}
