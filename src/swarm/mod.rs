//! Swarm Engine
//!
//! Agent-side state and per-tick agent dynamics: the columnar agent table,
//! the social graph, force composition, metabolism and lifecycle.

pub mod celestial;
pub mod forces;
pub mod graph;
pub mod lifecycle;
pub mod memory;
pub mod metabolism;
pub mod store;

pub use celestial::{CelestialBody, CelestialSystem};
pub use forces::ForceComposer;
pub use graph::ConnectionGraph;
pub use lifecycle::{DeathCause, DeathRecord, LifecycleManager, NewbornRecord};
pub use memory::{MemoryEntry, MemoryRing};
pub use store::{AgentProperties, AgentStore, AgentView, AllocError};
