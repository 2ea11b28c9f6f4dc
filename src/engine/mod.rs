/// Per-rule incremental move cache with kind ambiguity resolution
pub mod cache;
/// Weighted random selection primitives
pub mod choice;
/// Reverse multimap with O(1) random retrieval
pub mod multimap;
/// Simulation engine: step selection, application and validation
pub mod sim;

pub use cache::{ALL_KINDS, Decision, IncrementalMoveCache, Kind, KindSet};
pub use choice::{weighted_choice, weighted_sample};
pub use multimap::ReverseMultimap;
pub use sim::{KmcEngine, RuleEntry, StepRecord, UpdateMode};
