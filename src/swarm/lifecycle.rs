//! Lifecycle Manager
//!
//! Reproduction and death, in that order, once per tick. Reproduction
//! splits the parent's energy; death frees the slot and prunes the graph.

use super::graph::ConnectionGraph;
use super::store::{AgentProperties, AgentStore, AllocError};
use crate::core::config::LifecycleConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One successful birth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewbornRecord {
    pub tick: u64,
    pub parent_id: String,
    pub parent_index: usize,
    pub child_id: String,
    pub child_index: usize,
    pub parent_energy_before: f32,
    pub parent_energy_after: f32,
    pub child_energy: f32,
    pub position: [f32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// energy <= 0
    Starved,
    /// hp <= 0
    Wounded,
    /// energy below the survival floor
    Exhausted,
    Aged,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub tick: u64,
    pub id: String,
    pub index: usize,
    pub cause: DeathCause,
}

pub struct LifecycleManager {
    cfg: LifecycleConfig,
    serial: u64,
}

impl LifecycleManager {
    pub fn new(cfg: &LifecycleConfig) -> Self {
        LifecycleManager {
            cfg: cfg.clone(),
            serial: 0,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.cfg
    }

    /// Child serials handed out so far.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Split every agent above the reproduction threshold.
    ///
    /// Candidates are fixed before any birth, so a newborn never reproduces
    /// in its birth tick. With no free slot the parent is left untouched.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        store: &mut AgentStore,
        graph: &mut ConnectionGraph,
        rng: &mut R,
    ) -> Vec<NewbornRecord> {
        let candidates: Vec<usize> = store
            .alive_indices()
            .into_iter()
            .filter(|&i| store.energy[i] > self.cfg.reproduction_threshold)
            .collect();

        let mut born = Vec::new();
        for parent in candidates {
            if store.is_full() {
                break;
            }
            let Some(parent_id) = store.id_of(parent).map(str::to_string) else {
                continue;
            };

            let before = store.energy[parent];
            let after = before * self.cfg.reproduction_keep;
            let child_energy = before - after;

            let jitter = self.cfg.birth_jitter;
            let [px, py, pz] = store.position(parent);
            let (jx, jy) = if jitter > 0.0 {
                (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
            } else {
                (0.0, 0.0)
            };
            let props = AgentProperties {
                position: Some([px + jx, py + jy, pz]),
                mass: Some(store.mass[parent]),
                energy: Some(child_energy),
                hp: Some(child_energy),
                policy_gain: Some(store.policy_gain[parent]),
                group: store.group[parent],
                ..Default::default()
            };

            // Skip serials already taken by a caller-chosen id
            let allocated = loop {
                self.serial += 1;
                let id = format!("{}.{}", parent_id, self.serial);
                match store.allocate(&id, &props) {
                    Ok(child) => break Some((id, child)),
                    Err(AllocError::Duplicate(_)) => continue,
                    Err(AllocError::Full { .. }) => break None,
                }
            };
            let Some((child_id, child)) = allocated else {
                break;
            };
            store.energy[parent] = after;
            graph.connect(parent, child, self.cfg.birth_bond);

            debug!(
                "[Lifecycle] {} -> {} (energy {:.1} -> {:.1} + {:.1})",
                parent_id, child_id, before, after, child_energy
            );
            born.push(NewbornRecord {
                tick,
                parent_id,
                parent_index: parent,
                child_id,
                child_index: child,
                parent_energy_before: before,
                parent_energy_after: after,
                child_energy: store.energy[child],
                position: store.position(child),
            });
        }
        born
    }

    /// Why agent `i` should die this tick, if it should.
    pub fn death_cause(&self, store: &AgentStore, i: usize) -> Option<DeathCause> {
        if store.energy[i] <= 0.0 {
            Some(DeathCause::Starved)
        } else if store.hp[i] <= 0.0 {
            Some(DeathCause::Wounded)
        } else if store.energy[i] < self.cfg.min_survival_energy {
            Some(DeathCause::Exhausted)
        } else if store.age[i] > self.cfg.max_age {
            Some(DeathCause::Aged)
        } else {
            None
        }
    }

    /// Remove every agent meeting a death condition: graph edges first, then
    /// the slot and its identifier.
    pub fn cull(&self, tick: u64, store: &mut AgentStore, graph: &mut ConnectionGraph) -> Vec<DeathRecord> {
        let doomed: Vec<(usize, DeathCause)> = store
            .alive_indices()
            .into_iter()
            .filter_map(|i| self.death_cause(store, i).map(|c| (i, c)))
            .collect();

        let mut dead = Vec::with_capacity(doomed.len());
        for (i, cause) in doomed {
            graph.remove_node(i);
            if let Some(id) = store.free(i) {
                debug!("[Lifecycle] {} died ({:?})", id, cause);
                dead.push(DeathRecord {
                    tick,
                    id,
                    index: i,
                    cause,
                });
            }
        }
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AgentConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(capacity: usize) -> (AgentStore, ConnectionGraph, LifecycleManager) {
        let cfg = AgentConfig {
            capacity,
            ..AgentConfig::default()
        };
        (
            AgentStore::new(&cfg, 16, 16),
            ConnectionGraph::new(capacity),
            LifecycleManager::new(&LifecycleConfig::default()),
        )
    }

    #[test]
    fn split_conserves_energy() {
        let (mut store, mut graph, mut life) = setup(4);
        let p = store.allocate("p", &AgentProperties::at(8.0, 8.0).with_energy(700.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let born = life.reproduce(0, &mut store, &mut graph, &mut rng);

        assert_eq!(born.len(), 1);
        let rec = &born[0];
        assert!((rec.parent_energy_after - 350.0).abs() < 1e-4);
        assert!((rec.child_energy + rec.parent_energy_after - rec.parent_energy_before).abs() < 1e-3);
        assert_eq!(store.energy[p], rec.parent_energy_after);
        assert_eq!(store.hp[rec.child_index], rec.child_energy);
        assert_eq!(graph.weight(p, rec.child_index), Some(1.0));
        assert_eq!(rec.child_id, "p.1");
    }

    #[test]
    fn full_table_skips_reproduction_without_cost() {
        let (mut store, mut graph, mut life) = setup(1);
        let p = store.allocate("p", &AgentProperties::default().with_energy(900.0)).unwrap();
        let born = life.reproduce(0, &mut store, &mut graph, &mut StdRng::seed_from_u64(2));
        assert!(born.is_empty());
        assert_eq!(store.energy[p], 900.0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn at_threshold_does_not_reproduce() {
        let (mut store, mut graph, mut life) = setup(4);
        store.allocate("p", &AgentProperties::default().with_energy(600.0)).unwrap();
        let born = life.reproduce(0, &mut store, &mut graph, &mut StdRng::seed_from_u64(3));
        assert!(born.is_empty());
    }

    #[test]
    fn child_id_skips_taken_names() {
        let (mut store, mut graph, mut life) = setup(4);
        store.allocate("p", &AgentProperties::default().with_energy(700.0)).unwrap();
        store.allocate("p.1", &AgentProperties::default()).unwrap();
        let born = life.reproduce(0, &mut store, &mut graph, &mut StdRng::seed_from_u64(4));
        assert_eq!(born[0].child_id, "p.2");
    }

    #[test]
    fn cull_frees_slot_and_edges() {
        let (mut store, mut graph, life) = setup(3);
        let a = store.allocate("a", &AgentProperties::default().with_energy(50.0)).unwrap();
        let b = store.allocate("b", &AgentProperties::default().with_energy(50.0)).unwrap();
        graph.connect(a, b, 1.0);
        store.hp[b] = 0.0;

        let dead = life.cull(7, &mut store, &mut graph);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, "b");
        assert_eq!(dead[0].cause, DeathCause::Wounded);
        assert!(!graph.references(b));
        assert_eq!(graph.degree(a), 0);
        assert_eq!(store.index_of("b"), None);
        assert_eq!(store.alive_count(), 1);
    }

    #[test]
    fn death_conditions() {
        let (mut store, _, life) = setup(4);
        let i = store.allocate("x", &AgentProperties::default().with_energy(10.0)).unwrap();
        assert_eq!(life.death_cause(&store, i), None);
        store.energy[i] = 0.5;
        assert_eq!(life.death_cause(&store, i), Some(DeathCause::Exhausted));
        store.energy[i] = 0.0;
        assert_eq!(life.death_cause(&store, i), Some(DeathCause::Starved));
        store.energy[i] = 10.0;
        store.age[i] = life.config().max_age + 1;
        assert_eq!(life.death_cause(&store, i), Some(DeathCause::Aged));
    }
}
