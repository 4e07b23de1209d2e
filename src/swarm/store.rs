//! Agent Store
//!
//! Fixed-capacity Struct-of-Arrays agent table. Each column is a plain `Vec`
//! indexed by slot; a slot is either alive or zeroed and sitting on the free
//! list. Allocation pops the free list (O(1)), freeing pushes onto it, so a
//! freshly freed slot is the next one handed out.

use super::memory::{MemoryEntry, MemoryRing};
use crate::core::config::AgentConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("agent table is full ({capacity} slots)")]
    Full { capacity: usize },
    #[error("identifier `{0}` is already alive")]
    Duplicate(String),
}

/// Initial values for a new agent; anything left `None` takes the default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProperties {
    pub position: Option<[f32; 3]>,
    pub velocity: Option<[f32; 3]>,
    pub mass: Option<f32>,
    /// Defaults to `hp` when unset
    pub energy: Option<f32>,
    pub hp: Option<f32>,
    pub valence: Option<f32>,
    pub arousal: Option<f32>,
    pub policy_gain: Option<f32>,
    pub group: Option<u32>,
}

impl AgentProperties {
    pub fn at(x: f32, y: f32) -> Self {
        AgentProperties {
            position: Some([x, y, 0.0]),
            ..Default::default()
        }
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_hp(mut self, hp: f32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_emotion(mut self, valence: f32, arousal: f32) -> Self {
        self.valence = Some(valence);
        self.arousal = Some(arousal);
        self
    }

    pub fn with_policy_gain(mut self, gain: f32) -> Self {
        self.policy_gain = Some(gain);
        self
    }
}

/// Read-only copy of one agent row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: String,
    pub index: usize,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub mass: f32,
    pub energy: f32,
    pub hp: f32,
    pub age: u32,
    pub valence: f32,
    pub arousal: f32,
    pub policy_gain: f32,
    pub group: Option<u32>,
}

/// Drop NaN and infinite inputs so they fall back to the default.
fn finite(v: Option<f32>) -> Option<f32> {
    v.filter(|x| x.is_finite())
}

fn finite3(v: Option<[f32; 3]>) -> Option<[f32; 3]> {
    v.filter(|c| c.iter().all(|x| x.is_finite()))
}

/// Largest `f32` strictly below a positive `limit`.
fn below(limit: f32) -> f32 {
    f32::from_bits(limit.to_bits() - 1)
}

pub struct AgentStore {
    capacity: usize,
    max_x: f32,
    max_y: f32,
    depth: f32,
    max_speed: f32,
    max_energy: f32,
    max_hp: f32,
    default_hp: f32,
    memory_len: usize,

    // Physics
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub vz: Vec<f32>,
    pub mass: Vec<f32>,

    // Vitals
    pub energy: Vec<f32>,
    pub hp: Vec<f32>,
    pub age: Vec<u32>,
    pub alive: Vec<bool>,

    // Affect / policy
    pub valence: Vec<f32>,
    pub arousal: Vec<f32>,
    pub policy_gain: Vec<f32>,
    pub awakened: Vec<bool>,
    pub group: Vec<Option<u32>>,
    pub memory: Vec<MemoryRing>,

    ids: Vec<Option<String>>,
    index: HashMap<String, usize>,
    free: Vec<usize>,
    alive_count: usize,
}

impl AgentStore {
    pub fn new(cfg: &AgentConfig, width: usize, height: usize) -> Self {
        let n = cfg.capacity;
        AgentStore {
            capacity: n,
            max_x: below(width as f32),
            max_y: below(height as f32),
            depth: cfg.depth.max(0.0),
            max_speed: cfg.max_speed,
            max_energy: cfg.max_energy,
            max_hp: cfg.max_hp,
            default_hp: cfg.default_hp,
            memory_len: cfg.memory_len,
            x: vec![0.0; n],
            y: vec![0.0; n],
            z: vec![0.0; n],
            vx: vec![0.0; n],
            vy: vec![0.0; n],
            vz: vec![0.0; n],
            mass: vec![0.0; n],
            energy: vec![0.0; n],
            hp: vec![0.0; n],
            age: vec![0; n],
            alive: vec![false; n],
            valence: vec![0.0; n],
            arousal: vec![0.0; n],
            policy_gain: vec![0.0; n],
            awakened: vec![false; n],
            group: vec![None; n],
            memory: (0..n).map(|_| MemoryRing::new(cfg.memory_len)).collect(),
            ids: vec![None; n],
            index: HashMap::with_capacity(n),
            // Reversed so the lowest slot is handed out first
            free: (0..n).rev().collect(),
            alive_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn max_energy(&self) -> f32 {
        self.max_energy
    }

    pub fn max_hp(&self) -> f32 {
        self.max_hp
    }

    /// Claim a free slot for `identifier` and initialise every column.
    pub fn allocate(&mut self, identifier: &str, props: &AgentProperties) -> Result<usize, AllocError> {
        if self.index.contains_key(identifier) {
            return Err(AllocError::Duplicate(identifier.to_string()));
        }
        let Some(i) = self.free.pop() else {
            return Err(AllocError::Full {
                capacity: self.capacity,
            });
        };

        let [px, py, pz] = finite3(props.position).unwrap_or([self.max_x * 0.5, self.max_y * 0.5, 0.0]);
        let [vx, vy, vz] = finite3(props.velocity).unwrap_or([0.0; 3]);
        let hp = finite(props.hp).unwrap_or(self.default_hp).clamp(0.0, self.max_hp);
        let energy = finite(props.energy).unwrap_or(hp).clamp(0.0, self.max_energy);

        self.x[i] = px;
        self.y[i] = py;
        self.z[i] = pz;
        self.vx[i] = vx;
        self.vy[i] = vy;
        self.vz[i] = vz;
        self.mass[i] = finite(props.mass).filter(|m| *m > 0.0).unwrap_or(1.0);
        self.energy[i] = energy;
        self.hp[i] = hp;
        self.age[i] = 0;
        self.alive[i] = true;
        self.valence[i] = finite(props.valence).unwrap_or(0.5).clamp(0.0, 1.0);
        self.arousal[i] = finite(props.arousal).unwrap_or(0.5).clamp(0.0, 1.0);
        self.policy_gain[i] = finite(props.policy_gain).unwrap_or(1.0);
        self.awakened[i] = false;
        self.group[i] = props.group;
        self.memory[i].clear();
        self.ids[i] = Some(identifier.to_string());
        self.index.insert(identifier.to_string(), i);
        self.alive_count += 1;

        self.clamp_velocity(i);
        self.clamp_position(i);
        Ok(i)
    }

    /// Zero slot `i` and return it to the free list. Returns the identifier
    /// that occupied it, or `None` if the slot was already free.
    pub fn free(&mut self, i: usize) -> Option<String> {
        if i >= self.capacity || !self.alive[i] {
            return None;
        }
        let id = self.ids[i].take();
        if let Some(id) = &id {
            self.index.remove(id);
        }
        self.x[i] = 0.0;
        self.y[i] = 0.0;
        self.z[i] = 0.0;
        self.vx[i] = 0.0;
        self.vy[i] = 0.0;
        self.vz[i] = 0.0;
        self.mass[i] = 0.0;
        self.energy[i] = 0.0;
        self.hp[i] = 0.0;
        self.age[i] = 0;
        self.alive[i] = false;
        self.valence[i] = 0.0;
        self.arousal[i] = 0.0;
        self.policy_gain[i] = 0.0;
        self.awakened[i] = false;
        self.group[i] = None;
        self.memory[i] = MemoryRing::new(self.memory_len);
        self.free.push(i);
        self.alive_count -= 1;
        id
    }

    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    pub fn id_of(&self, i: usize) -> Option<&str> {
        self.ids.get(i).and_then(|id| id.as_deref())
    }

    #[inline]
    pub fn is_alive(&self, i: usize) -> bool {
        self.alive.get(i).copied().unwrap_or(false)
    }

    /// Living slots in ascending order.
    pub fn alive_indices(&self) -> Vec<usize> {
        self.alive
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.then_some(i))
            .collect()
    }

    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    #[inline]
    pub fn speed(&self, i: usize) -> f32 {
        (self.vx[i] * self.vx[i] + self.vy[i] * self.vy[i] + self.vz[i] * self.vz[i]).sqrt()
    }

    pub fn clamp_position(&mut self, i: usize) {
        self.x[i] = self.x[i].clamp(0.0, self.max_x);
        self.y[i] = self.y[i].clamp(0.0, self.max_y);
        self.z[i] = self.z[i].clamp(-self.depth, self.depth);
    }

    pub fn clamp_velocity(&mut self, i: usize) {
        let speed = self.speed(i);
        if speed > self.max_speed {
            let k = self.max_speed / speed;
            self.vx[i] *= k;
            self.vy[i] *= k;
            self.vz[i] *= k;
        }
    }

    /// Semi-implicit Euler step for one agent under `force`.
    pub fn integrate(&mut self, i: usize, force: [f32; 3], dt: f32, retention: f32, force_to_accel: f32) {
        let k = force_to_accel * dt / self.mass[i].max(1e-3);
        self.vx[i] = self.vx[i] * retention + force[0] * k;
        self.vy[i] = self.vy[i] * retention + force[1] * k;
        self.vz[i] = self.vz[i] * retention + force[2] * k;
        self.clamp_velocity(i);
        self.x[i] += self.vx[i] * dt;
        self.y[i] += self.vy[i] * dt;
        self.z[i] += self.vz[i] * dt;
        self.clamp_position(i);
    }

    pub fn set_energy(&mut self, i: usize, energy: f32) {
        self.energy[i] = energy.clamp(0.0, self.max_energy);
    }

    pub fn set_hp(&mut self, i: usize, hp: f32) {
        self.hp[i] = hp.clamp(0.0, self.max_hp);
    }

    /// Mean position of all living agents.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        if self.alive_count == 0 {
            return None;
        }
        let mut sum = [0.0f64; 3];
        for i in (0..self.capacity).filter(|i| self.alive[*i]) {
            sum[0] += self.x[i] as f64;
            sum[1] += self.y[i] as f64;
            sum[2] += self.z[i] as f64;
        }
        let n = self.alive_count as f64;
        Some([(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32])
    }

    /// Living agents per grid cell, row-major.
    pub fn occupancy(&self, width: usize, height: usize) -> Vec<u32> {
        let mut counts = vec![0u32; width * height];
        for i in (0..self.capacity).filter(|i| self.alive[*i]) {
            let cx = (self.x[i].max(0.0) as usize).min(width - 1);
            let cy = (self.y[i].max(0.0) as usize).min(height - 1);
            counts[cy * width + cx] += 1;
        }
        counts
    }

    pub fn remember(&mut self, i: usize, tick: u64) {
        let entry = MemoryEntry {
            tick,
            position: self.position(i),
            valence: self.valence[i],
            arousal: self.arousal[i],
            energy: self.energy[i],
        };
        self.memory[i].push(entry);
    }

    pub fn view(&self, i: usize) -> Option<AgentView> {
        if !self.is_alive(i) {
            return None;
        }
        Some(AgentView {
            id: self.id_of(i)?.to_string(),
            index: i,
            position: self.position(i),
            velocity: [self.vx[i], self.vy[i], self.vz[i]],
            mass: self.mass[i],
            energy: self.energy[i],
            hp: self.hp[i],
            age: self.age[i],
            valence: self.valence[i],
            arousal: self.arousal[i],
            policy_gain: self.policy_gain[i],
            group: self.group[i],
        })
    }

    /// Mean of `column` over living agents (0 when empty).
    pub fn alive_mean(&self, column: &[f32]) -> f32 {
        if self.alive_count == 0 {
            return 0.0;
        }
        let sum: f32 = column
            .iter()
            .zip(self.alive.iter())
            .filter_map(|(v, a)| a.then_some(*v))
            .sum();
        sum / self.alive_count as f32
    }
}
