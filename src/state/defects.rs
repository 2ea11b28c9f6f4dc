//! Defect state: per-node status table, defect entity sets and the primitive
//! mutators that keep them consistent
//!
//! The central invariant is that every node has exactly one status at all
//! times and that the status table, the vacancy set and the trefoil
//! membership table always agree. All mutation goes through the primitives
//! here; rules never touch the storage directly.

use crate::io::error::{KmcError, Result};
use crate::state::lattice::{Lattice, Node};
use crate::state::zobrist::ZobristHash;
use ndarray::Array2;
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which sub-layers of a site are vacant
///
/// Bit 1 is the bottom layer, bit 2 the top layer; `3` means both layers are
/// vacant (a divacancy).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u8);

impl LayerMask {
    /// Bottom layer only (monovacancy)
    pub const BOTTOM: Self = Self(1);
    /// Top layer only (monovacancy)
    pub const TOP: Self = Self(2);
    /// Both layers (divacancy)
    pub const BOTH: Self = Self(3);

    /// Construct from raw bits, rejecting anything outside `{1, 2, 3}`
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            1..=3 => Ok(Self(bits)),
            _ => Err(KmcError::Snapshot {
                reason: format!("invalid vacancy layer mask: {bits}"),
            }),
        }
    }

    /// Raw bitmask value
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Both sub-layers vacant
    pub const fn is_divacancy(self) -> bool {
        self.0 == 3
    }

    /// Exactly one sub-layer vacant
    pub const fn is_monovacancy(self) -> bool {
        self.0 == 1 || self.0 == 2
    }

    /// The opposite monovacancy layer
    ///
    /// # Panics
    ///
    /// Panics when called on a divacancy mask.
    pub const fn flipped(self) -> Self {
        assert!(self.is_monovacancy(), "only a monovacancy can flip layers");
        Self(self.0 ^ 3)
    }
}

/// Occupation status of a single node
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// No defect at this site
    Pristine,
    /// A point vacancy occupying the given sub-layers
    Vacancy(LayerMask),
    /// Member of a three-node trefoil defect
    TrefoilMember,
}

/// How the random initial-state generator interprets its fractions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomMode {
    /// Place exactly `round(fraction * sites)` defects of each species
    Exact,
    /// Independent per-node Bernoulli draw
    Probability,
}

/// Per-species occupation fractions for random initial states
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct RandomParams {
    /// Fraction of sites seeded as divacancies
    #[serde(default)]
    pub divacancy: f64,
    /// Fraction of sites seeded as monovacancies (random layer)
    #[serde(default)]
    pub monovacancy: f64,
}

impl RandomParams {
    /// Reject negative fractions or totals above one
    pub fn validate(&self) -> Result<()> {
        if self.divacancy < 0.0 || self.monovacancy < 0.0 {
            return Err(KmcError::Config {
                reason: "initial_state: negative occupation fraction".to_string(),
            });
        }
        if self.divacancy + self.monovacancy > 1.0 {
            return Err(KmcError::Config {
                reason: "initial_state: occupation fractions sum to more than 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The only persisted shape of a defect state
///
/// A state is reconstructible from its lattice dimensions plus explicit
/// vacancy and trefoil lists, and exports the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Periodic lattice dimensions
    pub dim: [usize; 2],
    /// Vacancies as (node, layer mask) pairs
    pub vacancies: Vec<(Node, LayerMask)>,
    /// Trefoils as sorted three-node sets
    pub trefoils: Vec<[Node; 3]>,
}

/// Mutable defect configuration on a fixed lattice
#[derive(Debug, Clone)]
pub struct DefectState {
    lattice: Lattice,
    status: Array2<NodeStatus>,
    vacancies: HashMap<Node, LayerMask>,
    trefoil_members: HashMap<Node, [Node; 3]>,
    fingerprint: Option<ZobristHash>,
}

impl DefectState {
    /// Create a pristine state over the given lattice
    pub fn new(lattice: Lattice) -> Self {
        let dim = lattice.dim();
        Self {
            lattice,
            status: Array2::from_elem(dim, NodeStatus::Pristine),
            vacancies: HashMap::new(),
            trefoil_members: HashMap::new(),
            fingerprint: None,
        }
    }

    /// Seed a random initial configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid occupation fractions.
    pub fn random<R: Rng>(
        lattice: Lattice,
        params: RandomParams,
        mode: RandomMode,
        rng: &mut R,
    ) -> Result<Self> {
        params.validate()?;
        let mut state = Self::new(lattice);
        let mut nodes: Vec<Node> = state.lattice.nodes().collect();

        match mode {
            RandomMode::Exact => {
                let total = nodes.len() as f64;
                let n_di = (params.divacancy * total).round() as usize;
                let n_mono = (params.monovacancy * total).round() as usize;
                nodes.shuffle(rng);
                for (i, &node) in nodes.iter().take(n_di + n_mono).enumerate() {
                    let mask = if i < n_di {
                        LayerMask::BOTH
                    } else {
                        random_mono_layer(rng)
                    };
                    state.create_vacancy(node, mask);
                }
            }
            RandomMode::Probability => {
                for &node in &nodes {
                    let draw: f64 = rng.random();
                    if draw < params.divacancy {
                        state.create_vacancy(node, LayerMask::BOTH);
                    } else if draw < params.divacancy + params.monovacancy {
                        let mask = random_mono_layer(rng);
                        state.create_vacancy(node, mask);
                    }
                }
            }
        }

        Ok(state)
    }

    /// Rebuild a state from its persisted shape
    ///
    /// # Errors
    ///
    /// Returns a snapshot error for overlapping entities or malformed
    /// trefoils.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Result<Self> {
        let mut state = Self::new(Lattice::new(snapshot.dim));
        for &(node, mask) in &snapshot.vacancies {
            let node = state.lattice.reduce(node.0, node.1);
            if !state.is_pristine(node) {
                return Err(KmcError::Snapshot {
                    reason: format!("duplicate entity at node ({}, {})", node.0, node.1),
                });
            }
            LayerMask::from_bits(mask.bits())?;
            state.create_vacancy(node, mask);
        }
        for &nodes in &snapshot.trefoils {
            let mut nodes = nodes.map(|n| state.lattice.reduce(n.0, n.1));
            nodes.sort_unstable();
            if !state.lattice.can_form_trefoil(nodes) {
                return Err(KmcError::Snapshot {
                    reason: format!("nodes {nodes:?} are not mutually trefoil-adjacent"),
                });
            }
            if nodes.iter().any(|&n| !state.is_pristine(n)) {
                return Err(KmcError::Snapshot {
                    reason: format!("trefoil overlaps another entity: {nodes:?}"),
                });
            }
            for &node in &nodes {
                state.create_vacancy(node, LayerMask::BOTH);
            }
            state.create_trefoil(nodes);
        }
        Ok(state)
    }

    /// Export the persisted shape, sorted for reproducible output
    pub fn snapshot(&self) -> StateSnapshot {
        let mut vacancies: Vec<(Node, LayerMask)> =
            self.vacancies.iter().map(|(&n, &m)| (n, m)).collect();
        vacancies.sort_unstable_by_key(|&(n, _)| n);
        let mut trefoils = self.trefoils();
        trefoils.sort_unstable();
        StateSnapshot {
            dim: self.lattice.dim(),
            vacancies,
            trefoils,
        }
    }

    /// Attach an incremental Zobrist fingerprint seeded deterministically
    ///
    /// The key reflects the current configuration immediately.
    pub fn enable_fingerprint(&mut self, seed: u64) {
        let mut hash = ZobristHash::new(&self.lattice, seed);
        let key = hash.recompute(self.statuses());
        hash.set_key(key);
        self.fingerprint = Some(hash);
    }

    /// Current fingerprint key, if enabled
    pub fn fingerprint_key(&self) -> Option<u64> {
        self.fingerprint.as_ref().map(ZobristHash::key)
    }

    //------------------------------------------
    // Accessors

    /// The lattice topology
    pub const fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Status of a node
    pub fn status(&self, node: Node) -> NodeStatus {
        self.status[[node.0 as usize, node.1 as usize]]
    }

    /// Iterate over `(node, status)` pairs in lattice order
    pub fn statuses(&self) -> impl Iterator<Item = (Node, NodeStatus)> + '_ {
        self.lattice.nodes().map(|n| (n, self.status(n)))
    }

    /// Whether the node carries no defect
    pub fn is_pristine(&self, node: Node) -> bool {
        self.status(node) == NodeStatus::Pristine
    }

    /// Whether the node is a divacancy
    pub fn is_divacancy(&self, node: Node) -> bool {
        matches!(self.status(node), NodeStatus::Vacancy(m) if m.is_divacancy())
    }

    /// Whether the node is a monovacancy in either layer
    pub fn is_monovacancy(&self, node: Node) -> bool {
        matches!(self.status(node), NodeStatus::Vacancy(m) if m.is_monovacancy())
    }

    /// Whether the node belongs to a trefoil
    pub fn is_trefoil_member(&self, node: Node) -> bool {
        self.status(node) == NodeStatus::TrefoilMember
    }

    /// Layer mask of the vacancy at a node, if any
    pub fn vacancy_layers(&self, node: Node) -> Option<LayerMask> {
        self.vacancies.get(&node).copied()
    }

    /// The full sorted triple of the trefoil a node belongs to, if any
    pub fn trefoil_nodes_at(&self, node: Node) -> Option<[Node; 3]> {
        self.trefoil_members.get(&node).copied()
    }

    /// Number of point vacancies
    pub fn vacancy_count(&self) -> usize {
        self.vacancies.len()
    }

    /// Number of trefoil defects
    pub fn trefoil_count(&self) -> usize {
        self.trefoil_members.len() / 3
    }

    /// Distinct trefoil triples, unordered
    pub fn trefoils(&self) -> Vec<[Node; 3]> {
        let mut out: Vec<[Node; 3]> = self.trefoil_members.values().copied().collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    //------------------------------------------
    // Primitive mutators
    // Each changes the status of one or several nodes atomically: status
    // table, entity sets and fingerprint always move together.

    /// Pristine node becomes a vacancy
    ///
    /// # Panics
    ///
    /// Panics if the node is not pristine.
    pub fn create_vacancy(&mut self, node: Node, layers: LayerMask) {
        assert!(self.is_pristine(node), "create_vacancy on occupied node");
        self.set_status(node, NodeStatus::Vacancy(layers));
        self.vacancies.insert(node, layers);
    }

    /// Vacancy becomes pristine, returning its layer mask
    ///
    /// # Panics
    ///
    /// Panics if the node holds no vacancy.
    pub fn remove_vacancy(&mut self, node: Node) -> LayerMask {
        let Some(layers) = self.vacancies.remove(&node) else {
            panic!("remove_vacancy on node without a vacancy");
        };
        self.set_status(node, NodeStatus::Pristine);
        layers
    }

    /// Change which sub-layers a vacancy occupies
    ///
    /// # Panics
    ///
    /// Panics if the node holds no vacancy.
    pub fn set_vacancy_layers(&mut self, node: Node, layers: LayerMask) {
        let Some(slot) = self.vacancies.get_mut(&node) else {
            panic!("set_vacancy_layers on node without a vacancy");
        };
        *slot = layers;
        self.set_status(node, NodeStatus::Vacancy(layers));
    }

    /// Three divacancies rotate into a trefoil
    ///
    /// # Panics
    ///
    /// Panics unless all three nodes are divacancies and pairwise
    /// trefoil-adjacent.
    pub fn create_trefoil(&mut self, mut nodes: [Node; 3]) {
        nodes.sort_unstable();
        assert!(
            self.lattice.can_form_trefoil(nodes),
            "create_trefoil on nodes that are not mutually trefoil-adjacent"
        );
        for &node in &nodes {
            assert!(self.is_divacancy(node), "create_trefoil on non-divacancy");
            self.vacancies.remove(&node);
            self.set_status(node, NodeStatus::TrefoilMember);
            self.trefoil_members.insert(node, nodes);
        }
    }

    /// A trefoil rotates back into three divacancies
    ///
    /// # Panics
    ///
    /// Panics if the node is not a trefoil member.
    pub fn destroy_trefoil(&mut self, member: Node) -> [Node; 3] {
        let Some(nodes) = self.trefoil_members.get(&member).copied() else {
            panic!("destroy_trefoil on node outside any trefoil");
        };
        for &node in &nodes {
            self.trefoil_members.remove(&node);
            self.set_status(node, NodeStatus::Vacancy(LayerMask::BOTH));
            self.vacancies.insert(node, LayerMask::BOTH);
        }
        nodes
    }

    fn set_status(&mut self, node: Node, to: NodeStatus) {
        let slot = &mut self.status[[node.0 as usize, node.1 as usize]];
        let from = *slot;
        *slot = to;
        if let Some(fp) = &mut self.fingerprint {
            fp.toggle(node, from, to);
        }
    }

    //------------------------------------------
    // Validation

    /// Expensive self-integrity check
    ///
    /// Recomputes the status table from the entity sets and compares it
    /// against the live table, then cross-checks the incremental fingerprint
    /// if one is enabled.
    ///
    /// # Errors
    ///
    /// Returns an inconsistency error naming the first divergent node.
    pub fn validate(&self) -> Result<()> {
        let mut expected = Array2::from_elem(self.lattice.dim(), NodeStatus::Pristine);
        for (&node, &layers) in &self.vacancies {
            expected[[node.0 as usize, node.1 as usize]] = NodeStatus::Vacancy(layers);
        }
        for (&node, triple) in &self.trefoil_members {
            if !triple.contains(&node) {
                return Err(KmcError::Inconsistency {
                    reason: format!("trefoil membership for {node:?} omits the node itself"),
                });
            }
            expected[[node.0 as usize, node.1 as usize]] = NodeStatus::TrefoilMember;
        }
        for node in self.lattice.nodes() {
            let want = expected[[node.0 as usize, node.1 as usize]];
            let got = self.status(node);
            if want != got {
                return Err(KmcError::Inconsistency {
                    reason: format!("status mismatch at {node:?}: table {got:?}, entities {want:?}"),
                });
            }
        }
        for triple in self.trefoils() {
            if !self.lattice.can_form_trefoil(triple) {
                return Err(KmcError::Inconsistency {
                    reason: format!("trefoil {triple:?} is not mutually adjacent"),
                });
            }
        }
        if let Some(fp) = &self.fingerprint {
            let fresh = fp.recompute(self.statuses());
            if fresh != fp.key() {
                return Err(KmcError::Inconsistency {
                    reason: format!(
                        "fingerprint drift: incremental {:#x}, recomputed {fresh:#x}",
                        fp.key()
                    ),
                });
            }
        }
        Ok(())
    }
}

fn random_mono_layer<R: Rng>(rng: &mut R) -> LayerMask {
    if rng.random::<bool>() {
        LayerMask::BOTTOM
    } else {
        LayerMask::TOP
    }
}
