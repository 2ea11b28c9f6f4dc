//! Periodic hexagonal lattice in axial coordinates
//!
//! Points are stored as axial pairs `(a, b)`; geometric relationships are
//! computed by lifting into cubic coordinates `(a, b, c)` with `a + b + c = 0`,
//! where the sixfold rotation about a node is the cyclic map
//! `(a, b, c) -> (-b, -c, -a)`. All coordinates returned by the lattice are
//! reduced into the unit cell `[0, dim0) x [0, dim1)`.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

/// A lattice site in axial coordinates, normalized into the unit cell
///
/// Equality and hashing are by normalized value; construction goes through
/// [`Lattice::reduce`] so un-normalized nodes cannot escape the topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node(pub i32, pub i32);

/// Rotate a cubic-coordinate displacement by 60 degrees
const fn cubic_rotate_60(d: [i32; 3]) -> [i32; 3] {
    [-d[1], -d[2], -d[0]]
}

/// The six 60-degree rotations of a cubic displacement, starting with the input
fn cubic_rotations_60(d: [i32; 3]) -> [[i32; 3]; 6] {
    let mut out = [d; 6];
    for i in 1..6 {
        out[i] = cubic_rotate_60(out[i - 1]);
    }
    out
}

/// Displacement whose rotation star yields the six lattice neighbors
const NEIGHBOR_DISPLACEMENT: [i32; 3] = [-1, 0, 1];

/// Displacement whose rotation star yields the six trefoil partners
const TREFOIL_DISPLACEMENT: [i32; 3] = [2, -2, 0];

/// Periodic hexagonal grid over a fixed `(dim0, dim1)` unit cell
///
/// Pure functions only; the lattice holds no simulation state and is immutable
/// for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    dim: [usize; 2],
}

impl Lattice {
    /// Create a lattice with the given periodic dimensions
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(dim: [usize; 2]) -> Self {
        assert!(dim[0] >= 1 && dim[1] >= 1, "lattice dimensions must be >= 1");
        Self { dim }
    }

    /// Periodic dimensions of the unit cell
    pub const fn dim(&self) -> [usize; 2] {
        self.dim
    }

    /// Number of sites in the unit cell
    pub const fn len(&self) -> usize {
        self.dim[0] * self.dim[1]
    }

    /// True only for a degenerate lattice; kept for container conventions
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply periodic boundary conditions to get a point's image in the unit cell
    pub fn reduce(&self, a: i32, b: i32) -> Node {
        Node(a.rem_euclid(self.dim[0] as i32), b.rem_euclid(self.dim[1] as i32))
    }

    /// Iterate over all nodes of the unit cell in row-major order
    pub fn nodes(&self) -> impl Iterator<Item = Node> + use<> {
        let [d0, d1] = self.dim;
        (0..d0 as i32).flat_map(move |a| (0..d1 as i32).map(move |b| Node(a, b)))
    }

    /// The node at `node + disp` together with its five images under the
    /// sixfold rotational symmetry about `node`
    fn rotations_around(&self, node: Node, disp: [i32; 3]) -> [Node; 6] {
        let mut out = [node; 6];
        for (slot, d) in out.iter_mut().zip(cubic_rotations_60(disp)) {
            *slot = self.reduce(node.0 + d[0], node.1 + d[1]);
        }
        out
    }

    /// The six neighbors of a node
    pub fn neighbors(&self, node: Node) -> [Node; 6] {
        self.rotations_around(node, NEIGHBOR_DISPLACEMENT)
    }

    /// The six nodes with which a node could jointly form a trefoil defect
    ///
    /// For one to actually form, three nodes must all mutually be trefoil
    /// neighbors.
    pub fn trefoil_neighbors(&self, node: Node) -> [Node; 6] {
        self.rotations_around(node, TREFOIL_DISPLACEMENT)
    }

    /// Whether the three given nodes are pairwise trefoil neighbors
    pub fn can_form_trefoil(&self, nodes: [Node; 3]) -> bool {
        let [n1, n2, n3] = nodes;
        [(n1, n2), (n2, n3), (n3, n1)]
            .iter()
            .all(|&(u, v)| self.trefoil_neighbors(v).contains(&u))
    }

    /// All nodes whose minimum graph distance from any seed lies in `[min_d, max_d]`
    ///
    /// Breadth-first expansion by [`Self::neighbors`]; used to bound the
    /// region a local state change can invalidate. The output order is
    /// deterministic for a fixed seed sequence.
    pub fn nodes_in_distance_range(
        &self,
        seeds: &[Node],
        min_d: usize,
        max_d: usize,
    ) -> Vec<Node> {
        let mut distance: HashMap<Node, usize> = HashMap::new();
        let mut queue: VecDeque<Node> = VecDeque::new();
        let mut out = Vec::new();

        for &seed in seeds {
            if let Entry::Vacant(slot) = distance.entry(seed) {
                slot.insert(0);
                queue.push_back(seed);
                if min_d == 0 {
                    out.push(seed);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            let d = distance[&node];
            if d == max_d {
                continue;
            }
            for nbr in self.neighbors(node) {
                if let Entry::Vacant(slot) = distance.entry(nbr) {
                    slot.insert(d + 1);
                    queue.push_back(nbr);
                    if d + 1 >= min_d {
                        out.push(nbr);
                    }
                }
            }
        }

        out
    }
}
