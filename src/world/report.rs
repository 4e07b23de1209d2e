//! Human-readable summaries and on-disk snapshots.

use super::World;
use crate::core::error::{WorldError, WorldResult};
use crate::field::FieldMaxima;
use crate::policy::Intervention;
use crate::swarm::MemoryEntry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

const SNAPSHOT_MEMORY: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub position: [f32; 3],
    pub energy: f32,
    pub hp: f32,
    pub age: u32,
    pub valence: f32,
    pub arousal: f32,
    /// Most recent entries, oldest first
    pub memory: Vec<MemoryEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub exported_at: String,
    pub tick: u64,
    pub alive_count: usize,
    pub global_gain: f32,
    pub intervention: Intervention,
    pub field_maxima: FieldMaxima,
    pub agents: Vec<AgentSnapshot>,
}

impl World {
    /// One-line status: tick, population, vitals, field peaks, affect.
    pub fn summary(&self) -> String {
        let s = &self.store;
        let m = self.fields.maxima();
        format!(
            "tick={} alive={} energy={:.2} hp={:.2} | vm_max={:.3} will_max={:.3} coh_max={:.3} res_max={:.3} wave_max={:.3} | valence={:.3} arousal={:.3} | gain={:.3} intervention={}",
            self.tick,
            s.alive_count(),
            s.alive_mean(&s.energy),
            s.alive_mean(&s.hp),
            m.value_mass,
            m.will,
            m.coherence,
            m.resource,
            m.wave_amplitude,
            s.alive_mean(&s.valence),
            s.alive_mean(&s.arousal),
            self.policy.global_gain(),
            self.policy.current_intervention(),
        )
    }

    /// Capture the current post-tick state.
    pub fn to_snapshot(&self) -> WorldSnapshot {
        let s = &self.store;
        let agents = s
            .alive_indices()
            .into_iter()
            .map(|i| AgentSnapshot {
                id: s.id_of(i).unwrap_or_default().to_string(),
                position: s.position(i),
                energy: s.energy[i],
                hp: s.hp[i],
                age: s.age[i],
                valence: s.valence[i],
                arousal: s.arousal[i],
                memory: s.memory[i].last(SNAPSHOT_MEMORY),
            })
            .collect();
        WorldSnapshot {
            exported_at: Utc::now().to_rfc3339(),
            tick: self.tick,
            alive_count: s.alive_count(),
            global_gain: self.policy.global_gain(),
            intervention: self.policy.current_intervention(),
            field_maxima: self.fields.maxima(),
            agents,
        }
    }

    /// Write [`World::to_snapshot`] as pretty JSON, creating parent
    /// directories and overwriting any existing file.
    pub fn snapshot(&self, path: impl AsRef<Path>) -> WorldResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        write_creating_parents(path, &json)?;
        info!("[World] Snapshot at tick {} -> {}", self.tick, path.display());
        Ok(())
    }

    /// Dump the policy replay log as pretty JSON.
    pub fn export_replay(&self, path: impl AsRef<Path>) -> WorldResult<()> {
        let path = path.as_ref();
        let json = self.policy.replay().export_json()?;
        write_creating_parents(path, &json)?;
        info!(
            "[World] Replay log ({} records) -> {}",
            self.policy.replay().len(),
            path.display()
        );
        Ok(())
    }
}

fn write_creating_parents(path: &Path, contents: &str) -> WorldResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WorldError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| WorldError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AgentConfig, GridConfig, WorldConfig};
    use crate::policy::ReplayRecord;
    use crate::swarm::AgentProperties;
    use std::path::PathBuf;

    fn world() -> World {
        let cfg = WorldConfig {
            grid: GridConfig {
                width: 16,
                height: 16,
                ..GridConfig::default()
            },
            agents: AgentConfig {
                capacity: 8,
                ..AgentConfig::default()
            },
            ..WorldConfig::default()
        };
        let mut w = World::with_seed(cfg, 7).unwrap();
        w.add_agent("alpha", AgentProperties::at(4.0, 4.0).with_energy(300.0));
        w.add_agent("beta", AgentProperties::at(9.0, 9.0).with_energy(300.0));
        w
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("fieldswarm-{}-{}", name, std::process::id()))
            .join("nested")
            .join("out.json")
    }

    #[test]
    fn summary_mentions_tick_and_population() {
        let mut w = world();
        w.step(1.0);
        let s = w.summary();
        assert!(s.starts_with("tick=1 alive=2"));
        assert!(s.contains("intervention=none"));
    }

    #[test]
    fn snapshot_creates_dirs_and_overwrites() {
        let mut w = world();
        for _ in 0..5 {
            w.step(1.0);
        }
        let path = scratch("snap");
        w.snapshot(&path).unwrap();
        w.step(1.0);
        w.snapshot(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let snap: WorldSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snap.tick, 6);
        assert_eq!(snap.alive_count, 2);
        assert_eq!(snap.agents.len(), 2);
        assert_eq!(snap.agents[0].memory.len(), 3);
        assert_eq!(snap.agents[0].memory[2].tick, 6);
        assert!(chrono::DateTime::parse_from_rfc3339(&snap.exported_at).is_ok());

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn replay_export_round_trips() {
        let mut w = world();
        for _ in 0..4 {
            w.step(1.0);
        }
        let path = scratch("replay");
        w.export_replay(&path).unwrap();
        let records: Vec<ReplayRecord> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].tick, 4);

        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let w = world();
        let dir = std::env::temp_dir().join(format!("fieldswarm-blocker-{}", std::process::id()));
        fs::write(&dir, "file, not a dir").unwrap();
        let err = w.snapshot(dir.join("snap.json")).unwrap_err();
        assert!(matches!(err, WorldError::Io { .. }));
        let _ = fs::remove_file(&dir);
    }
}
