//! Trefoil formation and dissociation
//!
//! Three divacancies sitting on each other's trefoil-neighbor stars can
//! rotate into a bound trefoil defect; a trefoil can rotate back. Both
//! rules identify a trefoil by its sorted member triple, and both depend
//! only on the statuses of the three members themselves.

use crate::engine::cache::{IncrementalMoveCache, Kind};
use crate::rules::{Move, MoveInfo, Rule};
use crate::state::{DefectState, Node};

const NATURAL_ONLY: &[Kind] = &[Kind::Natural];

/// Three mutually adjacent divacancies bind into a trefoil
#[derive(Debug, Default)]
pub struct CreateTrefoil {
    cache: IncrementalMoveCache,
}

impl CreateTrefoil {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rule for CreateTrefoil {
    fn name(&self) -> &'static str {
        "create_trefoil"
    }

    fn kinds(&self) -> &'static [Kind] {
        NATURAL_ONLY
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
        for &node in nodes {
            if !state.is_divacancy(node) {
                continue;
            }
            let partners = state.lattice().trefoil_neighbors(node);
            for (i, &p) in partners.iter().enumerate() {
                for &q in &partners[i + 1..] {
                    if p == q || p == node || q == node {
                        continue;
                    }
                    if !state.is_divacancy(p) || !state.is_divacancy(q) {
                        continue;
                    }
                    let mut triple = [node, p, q];
                    triple.sort_unstable();
                    if state.lattice().can_form_trefoil(triple) {
                        out.push((Move::Triple(triple), Kind::Natural));
                    }
                }
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Triple(triple) = mv else {
            panic!("create_trefoil given foreign move {mv:?}");
        };
        triple.to_vec()
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Triple(triple) = mv else {
            panic!("create_trefoil given foreign move {mv:?}");
        };
        state.create_trefoil(*triple);
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Triple(triple) = mv else {
            panic!("create_trefoil given foreign move {mv:?}");
        };
        MoveInfo::Cluster { nodes: *triple }
    }
}

/// A trefoil unbinds back into three divacancies
#[derive(Debug, Default)]
pub struct DestroyTrefoil {
    cache: IncrementalMoveCache,
}

impl DestroyTrefoil {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rule for DestroyTrefoil {
    fn name(&self) -> &'static str {
        "destroy_trefoil"
    }

    fn kinds(&self) -> &'static [Kind] {
        NATURAL_ONLY
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
        for &node in nodes {
            if let Some(triple) = state.trefoil_nodes_at(node) {
                out.push((Move::Triple(triple), Kind::Natural));
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Triple(triple) = mv else {
            panic!("destroy_trefoil given foreign move {mv:?}");
        };
        triple.to_vec()
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Triple(triple) = mv else {
            panic!("destroy_trefoil given foreign move {mv:?}");
        };
        let members = state.destroy_trefoil(triple[0]);
        assert_eq!(members, *triple, "trefoil membership changed under a cached move");
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Triple(triple) = mv else {
            panic!("destroy_trefoil given foreign move {mv:?}");
        };
        MoveInfo::Cluster { nodes: *triple }
    }
}
