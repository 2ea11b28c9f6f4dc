//! Single-node vacancy rules
//!
//! All three rules here depend only on the status of the node itself, so
//! their invalidation region is exactly the changed node set.

use crate::engine::cache::{IncrementalMoveCache, Kind};
use crate::rules::{Move, MoveInfo, Rule};
use crate::state::{DefectState, LayerMask, Node};

const NATURAL_ONLY: &[Kind] = &[Kind::Natural];

/// Pristine node turns into a divacancy
#[derive(Debug, Default)]
pub struct CreateVacancy {
    cache: IncrementalMoveCache,
}

impl CreateVacancy {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rule for CreateVacancy {
    fn name(&self) -> &'static str {
        "create_vacancy"
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
            if state.is_pristine(node) {
                out.push((Move::Site(node), Kind::Natural));
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Site(node) = mv else {
            panic!("create_vacancy given foreign move {mv:?}");
        };
        vec![*node]
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Site(node) = mv else {
            panic!("create_vacancy given foreign move {mv:?}");
        };
        state.create_vacancy(*node, LayerMask::BOTH);
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Site(node) = mv else {
            panic!("create_vacancy given foreign move {mv:?}");
        };
        MoveInfo::Site { node: *node }
    }
}

/// Divacancy heals back to pristine
#[derive(Debug, Default)]
pub struct FillVacancy {
    cache: IncrementalMoveCache,
}

impl FillVacancy {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rule for FillVacancy {
    fn name(&self) -> &'static str {
        "fill_vacancy"
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
            if state.is_divacancy(node) {
                out.push((Move::Site(node), Kind::Natural));
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Site(node) = mv else {
            panic!("fill_vacancy given foreign move {mv:?}");
        };
        vec![*node]
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Site(node) = mv else {
            panic!("fill_vacancy given foreign move {mv:?}");
        };
        let layers = state.remove_vacancy(*node);
        assert!(layers.is_divacancy(), "fill_vacancy on a monovacancy");
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Site(node) = mv else {
            panic!("fill_vacancy given foreign move {mv:?}");
        };
        MoveInfo::Site { node: *node }
    }
}

/// Monovacancy swaps between the bottom and top layer
///
/// Monovacancies only enter through the initial-state generator; this rule
/// keeps them mobile between sub-layers without changing occupancy.
#[derive(Debug, Default)]
pub struct FlipMonovacancy {
    cache: IncrementalMoveCache,
}

impl FlipMonovacancy {
    /// Create the rule with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rule for FlipMonovacancy {
    fn name(&self) -> &'static str {
        "flip_monovacancy"
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
            if state.is_monovacancy(node) {
                out.push((Move::Site(node), Kind::Natural));
            }
        }
    }

    fn nodes_affected_by(&self, mv: &Move) -> Vec<Node> {
        let Move::Site(node) = mv else {
            panic!("flip_monovacancy given foreign move {mv:?}");
        };
        vec![*node]
    }

    fn perform(&self, mv: &Move, state: &mut DefectState) {
        let Move::Site(node) = mv else {
            panic!("flip_monovacancy given foreign move {mv:?}");
        };
        let layers = match state.vacancy_layers(*node) {
            Some(layers) => layers,
            None => panic!("flip_monovacancy on node without a vacancy"),
        };
        state.set_vacancy_layers(*node, layers.flipped());
    }

    fn info(&self, mv: &Move) -> MoveInfo {
        let Move::Site(node) = mv else {
            panic!("flip_monovacancy given foreign move {mv:?}");
        };
        MoveInfo::Flip { node: *node }
    }
}
