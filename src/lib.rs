//! FieldSwarm Core - Grid-and-Agent Simulation Engine
//!
//! A fixed-size grid of coupled continuous fields (value mass, will,
//! resource, events, wave phase and their derived views) shared by a
//! fixed-capacity columnar population of agents. Each tick the fields
//! diffuse and decay, agents move under composed forces, eat, reproduce
//! and die, and a bounded reward loop tunes how strongly each agent
//! follows the field.
//!
//! Everything lives in one owned [`World`]; [`SharedWorld`] wraps it in a
//! single lock for multi-threaded hosts.

pub mod core;
pub mod field;
pub mod policy;
pub mod swarm;
pub mod utils;
pub mod world;

pub use crate::core::config::{AgentConfig, ForceConfig, GridConfig, LifecycleConfig, PolicyConfig, WorldConfig};
pub use crate::core::error::{WorldError, WorldResult};
pub use field::{FieldGrid, FieldMaxima, WillOperation};
pub use policy::{AdaptivePolicy, Intervention, ReplayRecord};
pub use swarm::{AgentProperties, AgentView, DeathCause, DeathRecord, MemoryEntry, NewbornRecord};
pub use world::{AwakeningEvent, SharedWorld, World, WorldSnapshot};

/// Initialise the global `tracing` subscriber. `level` is an `EnvFilter`
/// directive such as `"info"` or `"fieldswarm_core=debug"`. Safe to call
/// more than once.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
