//! Kinetic Monte Carlo simulation of point defects on a periodic hexagonal lattice
//!
//! The system tracks vacancies, divacancies and trefoil defects on a periodic
//! axial-coordinate grid, maintains the set of currently possible transitions
//! incrementally as the state evolves, and selects one transition per step with
//! probability proportional to its physical rate.

#![forbid(unsafe_code)]

/// Core selection engine: reverse multimap, incremental move cache, weighted choice, step loop
pub mod engine;
/// Input/output operations, configuration and error handling
pub mod io;
/// Physical transition rules and the rule contract
pub mod rules;
/// Lattice topology and defect state
pub mod state;

pub use io::error::{KmcError, Result};
