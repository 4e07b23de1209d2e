//! Per-agent short-term memory.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One remembered moment of an agent's life.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub tick: u64,
    pub position: [f32; 3],
    pub valence: f32,
    pub arousal: f32,
    pub energy: f32,
}

/// Bounded ring buffer; pushing past capacity evicts the oldest entry.
#[derive(Clone, Debug, Default)]
pub struct MemoryRing {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
}

impl MemoryRing {
    pub fn new(capacity: usize) -> Self {
        MemoryRing {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The most recent `n` entries, oldest first.
    pub fn last(&self, n: usize) -> Vec<MemoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).copied().collect()
    }

    pub fn latest(&self) -> Option<&MemoryEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tick: u64) -> MemoryEntry {
        MemoryEntry {
            tick,
            position: [0.0; 3],
            valence: 0.5,
            arousal: 0.5,
            energy: 10.0,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut ring = MemoryRing::new(3);
        for t in 1..=5 {
            ring.push(entry(t));
        }
        assert_eq!(ring.len(), 3);
        let ticks: Vec<u64> = ring.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert_eq!(ring.latest().map(|e| e.tick), Some(5));
    }

    #[test]
    fn last_n_is_oldest_first_and_saturates() {
        let mut ring = MemoryRing::new(8);
        ring.push(entry(1));
        ring.push(entry(2));
        assert_eq!(ring.last(3).len(), 2);
        for t in 3..=6 {
            ring.push(entry(t));
        }
        let ticks: Vec<u64> = ring.last(3).iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![4, 5, 6]);
    }
}
