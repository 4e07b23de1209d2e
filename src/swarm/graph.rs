//! Connection Graph
//!
//! Sparse weighted adjacency between agent slots. Edges live in an arena
//! indexed by slot, with separate outgoing and incoming maps so that removing
//! a node only touches the slots it was actually connected to. Maps are
//! ordered so neighbour iteration, and every float sum over it, is stable
//! for a given seed.

use std::collections::{BTreeMap, VecDeque};

pub struct ConnectionGraph {
    out_edges: Vec<BTreeMap<usize, f32>>,
    in_edges: Vec<BTreeMap<usize, f32>>,
}

impl ConnectionGraph {
    pub fn new(capacity: usize) -> Self {
        ConnectionGraph {
            out_edges: vec![BTreeMap::new(); capacity],
            in_edges: vec![BTreeMap::new(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.out_edges.len()
    }

    /// Insert (or overwrite) a symmetric edge `a ↔ b`.
    ///
    /// Self-loops and out-of-range slots are rejected.
    pub fn connect(&mut self, a: usize, b: usize, weight: f32) -> bool {
        let n = self.capacity();
        if a == b || a >= n || b >= n || !weight.is_finite() {
            return false;
        }
        self.out_edges[a].insert(b, weight);
        self.in_edges[b].insert(a, weight);
        self.out_edges[b].insert(a, weight);
        self.in_edges[a].insert(b, weight);
        true
    }

    pub fn weight(&self, a: usize, b: usize) -> Option<f32> {
        self.out_edges.get(a).and_then(|m| m.get(&b).copied())
    }

    /// Outgoing `(neighbour, weight)` pairs of `a`.
    pub fn neighbours(&self, a: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.out_edges
            .get(a)
            .into_iter()
            .flat_map(|m| m.iter().map(|(j, w)| (*j, *w)))
    }

    pub fn degree(&self, a: usize) -> usize {
        self.out_edges.get(a).map_or(0, |m| m.len())
    }

    /// Drop every edge touching `a`, in both directions. Returns how many
    /// directed edges were removed.
    pub fn remove_node(&mut self, a: usize) -> usize {
        if a >= self.capacity() {
            return 0;
        }
        let mut removed = 0;
        for (b, _) in std::mem::take(&mut self.out_edges[a]) {
            self.in_edges[b].remove(&a);
            removed += 1;
        }
        for (b, _) in std::mem::take(&mut self.in_edges[a]) {
            self.out_edges[b].remove(&a);
            removed += 1;
        }
        removed
    }

    /// No edge leaves or enters `a` according to its own maps.
    pub fn is_isolated(&self, a: usize) -> bool {
        self.degree(a) == 0 && self.in_edges.get(a).map_or(true, |m| m.is_empty())
    }

    /// True if any edge anywhere still points at or from `a`. Full scan.
    pub fn references(&self, a: usize) -> bool {
        if !self.is_isolated(a) {
            return true;
        }
        self.out_edges.iter().any(|m| m.contains_key(&a)) || self.in_edges.iter().any(|m| m.contains_key(&a))
    }

    /// Directed edge count (each symmetric connection counts twice).
    pub fn edge_count(&self) -> usize {
        self.out_edges.iter().map(|m| m.len()).sum()
    }

    /// Connected components over living slots. Components with at least two
    /// members get ids `0, 1, ...` in order of their lowest slot; everything
    /// else is `None`.
    pub fn components(&self, alive: &[bool]) -> Vec<Option<u32>> {
        let n = self.capacity().min(alive.len());
        let mut group = vec![None; alive.len()];
        let mut seen = vec![false; n];
        let mut next = 0u32;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if seen[start] || !alive[start] {
                continue;
            }
            seen[start] = true;
            queue.push_back(start);
            let mut members = Vec::new();
            while let Some(i) = queue.pop_front() {
                members.push(i);
                for (j, _) in self.neighbours(i) {
                    if j < n && alive[j] && !seen[j] {
                        seen[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            if members.len() >= 2 {
                for i in members {
                    group[i] = Some(next);
                }
                next += 1;
            }
        }
        group
    }
}
