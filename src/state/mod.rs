/// Defect state table, entity sets and primitive mutators
pub mod defects;
/// Periodic hexagonal lattice topology
pub mod lattice;
/// Incremental Zobrist fingerprint of the defect state
pub mod zobrist;

pub use defects::{DefectState, LayerMask, NodeStatus, RandomMode, RandomParams, StateSnapshot};
pub use lattice::{Lattice, Node};
