//! Core infrastructure shared by every simulation layer.

pub mod config;
pub mod error;

pub use config::{AgentConfig, ForceConfig, GridConfig, LifecycleConfig, PolicyConfig, WorldConfig};
pub use error::{WorldError, WorldResult};
