//! Transition rules and their shared invalidation pattern
//!
//! A rule owns the exact set of moves it could currently perform, kept in an
//! [`IncrementalMoveCache`]. Rather than implementing bespoke cache surgery,
//! every rule answers one question: which of my moves, with which kinds,
//! depend on a given set of nodes? Initialization asks it for the whole
//! lattice; each step asks it twice for the affected nodes, once against the
//! pre-mutation state to retract and once against the post-mutation state to
//! re-add. The enumeration must be exhaustive per move: when a move appears
//! at all, every kind it carries appears with it.

/// Divacancy hop rule, the multi-kind case
pub mod migration;
/// Trefoil formation and dissociation rules
pub mod trefoil;
/// Vacancy creation, annihilation and layer-flip rules
pub mod vacancy;

use crate::engine::cache::{IncrementalMoveCache, Kind};
use crate::io::error::Result;
use crate::state::{DefectState, Node};
use serde::{Deserialize, Serialize};

pub use migration::MigrateVacancy;
pub use trefoil::{CreateTrefoil, DestroyTrefoil};
pub use vacancy::{CreateVacancy, FillVacancy, FlipMonovacancy};

/// A possible transition, scoped to the rule whose cache holds it
///
/// Value-comparable and ordered so enumerations can be deduplicated
/// deterministically. Triples are stored sorted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    /// Transition at a single node
    Site(Node),
    /// Directed hop between adjacent nodes
    Hop {
        /// Source node
        from: Node,
        /// Destination node
        to: Node,
    },
    /// Transition involving a sorted node triple
    Triple([Node; 3]),
}

/// Human- and machine-readable description of a performed move
///
/// Field names are part of the output contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MoveInfo {
    /// Something appeared or vanished at one node
    Site {
        /// The node involved
        node: Node,
    },
    /// A defect moved between nodes
    Hop {
        /// Node vacated
        was: Node,
        /// Node now occupied
        now: Node,
    },
    /// Three nodes changed together
    Cluster {
        /// The sorted member nodes
        nodes: [Node; 3],
    },
    /// A monovacancy changed layer
    Flip {
        /// The node involved
        node: Node,
    },
}

/// A transition rule with incremental move bookkeeping
///
/// `perform` on a move absent from the cache is a programming error and
/// asserts; eligibility is exactly cache membership.
pub trait Rule {
    /// Stable rule name, used by configuration and output
    fn name(&self) -> &'static str;

    /// The kinds this rule can produce, in declaration order
    fn kinds(&self) -> &'static [Kind];

    /// The rule's live move cache
    fn cache(&self) -> &IncrementalMoveCache;

    /// Mutable access to the live move cache
    fn cache_mut(&mut self) -> &mut IncrementalMoveCache;

    /// Enumerate every `(move, kind)` pair that depends on any of `nodes`
    ///
    /// Evaluated against `state` as given. The rule expands `nodes` by its
    /// own dependence radius; callers pass only the nodes whose status
    /// changed. Pairs may repeat across seed nodes; callers deduplicate.
    fn moves_dependent_on(
        &self,
        state: &DefectState,
        nodes: &[Node],
        out: &mut Vec<(Move, Kind)>,
    );

    /// Nodes whose status `perform` will change for this move
    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node>;

    /// Apply the move to the state
    fn perform(&self, mv: &Move, state: &mut DefectState);

    /// Describe a move for the output stream
    fn info(&self, mv: &Move) -> MoveInfo;

    /// Enumerate against the full lattice into a fresh cache
    ///
    /// # Errors
    ///
    /// Fails when the enumeration produces a duplicate `(move, kind)` pair.
    fn recompute_moves(&self, state: &DefectState) -> Result<IncrementalMoveCache> {
        let all: Vec<Node> = state.lattice().nodes().collect();
        let mut pairs = Vec::new();
        self.moves_dependent_on(state, &all, &mut pairs);
        pairs.sort_unstable();
        pairs.dedup();
        let mut cache = IncrementalMoveCache::new();
        for (mv, kind) in pairs {
            cache.add(mv, kind)?;
        }
        Ok(cache)
    }

    /// Replace the live cache with a full enumeration
    ///
    /// # Errors
    ///
    /// Fails when the enumeration produces a duplicate `(move, kind)` pair.
    fn initialize_moves(&mut self, state: &DefectState) -> Result<()> {
        *self.cache_mut() = self.recompute_moves(state)?;
        Ok(())
    }

    /// Retract every move dependent on `nodes`, before the state mutates
    ///
    /// Must be called against the pre-mutation state; the enumeration there
    /// covers exactly the cached moves touching the region, so the matching
    /// [`Rule::post_status_change`] re-adds without collisions.
    fn pre_status_change(&mut self, state: &DefectState, nodes: &[Node]) {
        let mut pairs = Vec::new();
        self.moves_dependent_on(state, nodes, &mut pairs);
        let mut moves: Vec<Move> = pairs.into_iter().map(|(mv, _)| mv).collect();
        moves.sort_unstable();
        moves.dedup();
        for mv in moves {
            self.cache_mut().clear_all(&mv);
        }
    }

    /// Re-add every move dependent on `nodes`, after the state mutated
    ///
    /// # Errors
    ///
    /// A duplicate add means the retraction pass missed a move and the
    /// bookkeeping has diverged.
    fn post_status_change(&mut self, state: &DefectState, nodes: &[Node]) -> Result<()> {
        let mut pairs = Vec::new();
        self.moves_dependent_on(state, nodes, &mut pairs);
        pairs.sort_unstable();
        pairs.dedup();
        for (mv, kind) in pairs {
            self.cache_mut().add(mv, kind)?;
        }
        Ok(())
    }

    /// Cross-check the live cache against a fresh full enumeration
    ///
    /// # Errors
    ///
    /// Fails naming the first divergent move.
    fn validate(&self, state: &DefectState) -> Result<()> {
        let fresh = self.recompute_moves(state)?;
        self.cache().validate_against(&fresh, self.name())
    }
}
