//! Incremental Zobrist fingerprint of the defect state
//!
//! Each (node, occupied status) pair gets a fixed random 64-bit value from a
//! seeded generator; the fingerprint of a state is the XOR of the values for
//! every non-pristine node. Because XOR is its own inverse, the key can be
//! updated in O(1) on every status change and recomputed from scratch only
//! when validating.

use crate::state::defects::NodeStatus;
use crate::state::lattice::{Lattice, Node};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashMap;

/// Number of distinct non-pristine status classes
///
/// Vacancy layer masks 1, 2 and 3 plus trefoil membership. Pristine is the
/// implicit zero class and contributes nothing to the key.
const STATUS_CLASSES: usize = 4;

/// Zobrist table plus the running key for one lattice
#[derive(Debug, Clone)]
pub struct ZobristHash {
    table: HashMap<Node, [u64; STATUS_CLASSES]>,
    key: u64,
}

/// Map a status to its table class, or `None` for pristine
const fn status_class(status: NodeStatus) -> Option<usize> {
    match status {
        NodeStatus::Pristine => None,
        NodeStatus::Vacancy(mask) => Some(mask.bits() as usize - 1),
        NodeStatus::TrefoilMember => Some(3),
    }
}

impl ZobristHash {
    /// Build the table for every node of the lattice from a fixed seed
    ///
    /// Nodes are visited in lattice order so the table, and therefore every
    /// key derived from it, is reproducible for a given seed.
    pub fn new(lattice: &Lattice, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut table = HashMap::with_capacity(lattice.len());
        for node in lattice.nodes() {
            let mut row = [0u64; STATUS_CLASSES];
            for slot in &mut row {
                *slot = rng.random();
            }
            table.insert(node, row);
        }
        Self { table, key: 0 }
    }

    /// Current fingerprint
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Overwrite the running key, used when attaching to a non-empty state
    pub const fn set_key(&mut self, key: u64) {
        self.key = key;
    }

    /// Fold one status transition at a node into the key
    pub fn toggle(&mut self, node: Node, from: NodeStatus, to: NodeStatus) {
        let row = &self.table[&node];
        if let Some(class) = status_class(from) {
            self.key ^= row[class];
        }
        if let Some(class) = status_class(to) {
            self.key ^= row[class];
        }
    }

    /// Recompute the key from a full status assignment
    ///
    /// O(N); used by state validation to cross-check the incremental key.
    pub fn recompute(&self, statuses: impl Iterator<Item = (Node, NodeStatus)>) -> u64 {
        let mut key = 0;
        for (node, status) in statuses {
            if let Some(class) = status_class(status) {
                key ^= self.table[&node][class];
            }
        }
        key
    }
}
