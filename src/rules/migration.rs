//! Divacancy migration, the genuinely multi-kind rule
//!
//! A divacancy may hop to any pristine neighbor. Every eligible hop proceeds
//! through the direct channel; when at least one of the two flanking sites
//! (the common neighbors of source and destination) is itself a divacancy,
//! the same hop additionally proceeds through a faster assisted channel. The
//! two channels share one outcome, so the hop is a single move carrying two
//! kinds and the cache's decide round apportions it between the rate classes.
//!
//! Eligibility and kind membership of a hop read the source, the destination
//! and the flanks, all within graph distance 1 of the source. The
//! invalidation region is therefore the changed nodes expanded by one shell;
//! pre- and post-enumeration expand identically, so retract and re-add stay
//! in lock-step.

use crate::engine::cache::{IncrementalMoveCache, Kind};
use crate::rules::{Move, MoveInfo, Rule};
use crate::state::{DefectState, LayerMask, Node};

/// Divacancy hops to a pristine neighbor site
#[derive(Debug, Default)]
pub struct MigrateVacancy {
    cache: IncrementalMoveCache,
}

impl MigrateVacancy {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a divacancy flanks the hop corridor
    fn is_assisted(state: &DefectState, from: Node, to: Node) -> bool {
        let from_neighbors = state.lattice().neighbors(from);
        state
            .lattice()
            .neighbors(to)
            .into_iter()
            .filter(|flank| from_neighbors.contains(flank))
            .any(|flank| state.is_divacancy(flank))
    }
}

impl Rule for MigrateVacancy {
    fn name(&self) -> &'static str {
        "migrate_vacancy"
    }

    fn kinds(&self) -> &'static [Kind] {
        &[Kind::Direct, Kind::Assisted]
    }

    fn cache(&self) -> &IncrementalMoveCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut IncrementalMoveCache {
        &mut self.cache
    }

    fn moves_dependent_on(
        &self,
        state: &DefectState,
        nodes: &[Node],
        out: &mut Vec<(Move, Kind)>,
    ) {
        // One shell past the changed nodes reaches every source whose hop
        // reads a changed node as destination or flank
        let region = state.lattice().nodes_in_distance_range(nodes, 0, 1);
        for from in region {
            if !state.is_divacancy(from) {
                continue;
            }
            for to in state.lattice().neighbors(from) {
                if !state.is_pristine(to) {
                    continue;
                }
                let mv = Move::Hop { from, to };
                out.push((mv, Kind::Direct));
                if Self::is_assisted(state, from, to) {
                    out.push((mv, Kind::Assisted));
                }
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Hop { from, to } = mv else {
            panic!("migrate_vacancy given foreign move {mv:?}");
        };
        vec![*from, *to]
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Hop { from, to } = mv else {
            panic!("migrate_vacancy given foreign move {mv:?}");
        };
        let layers = state.remove_vacancy(*from);
        assert!(layers.is_divacancy(), "migrate_vacancy on a monovacancy");
        state.create_vacancy(*to, LayerMask::BOTH);
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Hop { from, to } = mv else {
            panic!("migrate_vacancy given foreign move {mv:?}");
        };
        MoveInfo::Hop {
            was: *from,
            now: *to,
        }
    }
}
