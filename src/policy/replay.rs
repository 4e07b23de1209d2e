//! Bounded per-tick replay log.

use super::intervention::Intervention;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Aggregate policy state for one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub tick: u64,
    pub mean_reward: f32,
    pub mean_valence: f32,
    pub mean_arousal: f32,
    pub intervention: Intervention,
}

/// Ring buffer of [`ReplayRecord`]s; the oldest record is evicted first.
#[derive(Clone, Debug)]
pub struct ReplayLog {
    records: VecDeque<ReplayRecord>,
    capacity: usize,
}

impl ReplayLog {
    pub fn new(capacity: usize) -> Self {
        ReplayLog {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: ReplayRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&ReplayRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplayRecord> {
        self.records.iter()
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}
