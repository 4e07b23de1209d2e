//! Thread-safe handle for embedding a [`World`] in multi-threaded hosts.
//!
//! The engine has no internal locking. `SharedWorld` puts the whole world
//! behind one mutex so a tick, or any read, always sees a consistent state.

use super::{AwakeningEvent, World};
use crate::swarm::{AgentProperties, NewbornRecord};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        SharedWorld {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// One full tick under the lock.
    pub fn step(&self, dt: f32) -> (Vec<NewbornRecord>, Vec<AwakeningEvent>) {
        self.inner.lock().step(dt)
    }

    pub fn add_agent(&self, identifier: &str, properties: AgentProperties) -> Option<usize> {
        self.inner.lock().add_agent(identifier, properties)
    }

    pub fn add_connection(&self, id_a: &str, id_b: &str, strength: f32) -> bool {
        self.inner.lock().add_connection(id_a, id_b, strength)
    }

    pub fn summary(&self) -> String {
        self.inner.lock().summary()
    }

    /// Run `f` with exclusive access.
    pub fn with<T>(&self, f: impl FnOnce(&mut World) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AgentConfig, GridConfig, WorldConfig};
    use std::thread;

    #[test]
    fn ticks_from_many_threads_are_serialised() {
        let cfg = WorldConfig {
            grid: GridConfig {
                width: 16,
                height: 16,
                ..GridConfig::default()
            },
            agents: AgentConfig {
                capacity: 32,
                ..AgentConfig::default()
            },
            ..WorldConfig::default()
        };
        let shared = SharedWorld::new(World::with_seed(cfg, 3).unwrap());
        for k in 0..8 {
            shared.add_agent(&format!("a{}", k), AgentProperties::at(k as f32 + 0.5, 8.0).with_energy(400.0));
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let world = shared.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        world.step(1.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        shared.with(|w| {
            assert_eq!(w.tick(), 40);
            w.verify_invariants().unwrap();
        });
    }
}
