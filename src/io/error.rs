//! Error types for simulation operations
//!
//! The taxonomy follows three classes. Invariant violations mean the
//! incremental bookkeeping has diverged from a full recomputation and are
//! never recovered from. Input errors describe a fixable configuration
//! problem. Exhaustion is a legitimate terminal condition, reported
//! distinctly so callers can tell "simulation stuck" from "simulation
//! broken".

use std::fmt;
use std::path::PathBuf;

/// Main error type for all simulation operations
#[derive(Debug)]
pub enum KmcError {
    /// A kind was added to a move that already carries it (invariant)
    DuplicateKind {
        /// Description of the move
        move_desc: String,
        /// Kind name
        kind: &'static str,
    },

    /// A kind was cleared from a move that does not carry it (invariant)
    KindNotPresent {
        /// Description of the move
        move_desc: String,
        /// Kind name
        kind: &'static str,
    },

    /// Lookup of a missing key or empty tag in the reverse multimap (invariant)
    NotFound {
        /// What was looked up
        entity: &'static str,
    },

    /// A decide round's sources no longer match the expected total (invariant)
    ///
    /// Indicates the cache was mutated between `decide` and `pick`.
    SourcesMismatch {
        /// Kind being picked
        kind: &'static str,
        /// Total the caller expected
        expected: u64,
        /// Total the sources actually sum to
        actual: u64,
    },

    /// Reverse multimap integrity check failed (invariant)
    Integrity {
        /// Description of the first violation found
        reason: String,
    },

    /// Incremental move cache diverged from a fresh recomputation (invariant)
    CacheDivergence {
        /// Rule owning the cache
        rule: &'static str,
        /// First divergent move and direction
        detail: String,
    },

    /// Defect state self-check failed (invariant)
    Inconsistency {
        /// Description of the first divergence
        reason: String,
    },

    /// Rate table omits a kind the rule requires (input)
    MissingRate {
        /// Rule name
        rule: &'static str,
        /// Missing kind name
        kind: &'static str,
    },

    /// A weighted choice received a negative weight (input)
    NegativeWeight {
        /// Display form of the offending value
        value: String,
        /// The negative weight
        weight: f64,
    },

    /// A weighted choice had no positive-weight entries (input)
    EmptyChoice,

    /// Configuration document failed validation (input)
    Config {
        /// What is wrong and where
        reason: String,
    },

    /// State snapshot failed validation (input)
    Snapshot {
        /// What is wrong with the snapshot
        reason: String,
    },

    /// General file system operation failure (input)
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// No transition is possible from the current state (terminal)
    ///
    /// The simulation has converged or jammed; this is not a bug.
    NoEligibleMoves {
        /// Step at which the run halted
        step: u64,
    },
}

impl KmcError {
    /// Whether this is the legitimate terminal condition rather than a defect
    pub const fn is_exhaustion(&self) -> bool {
        matches!(self, Self::NoEligibleMoves { .. })
    }
}

impl fmt::Display for KmcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKind { move_desc, kind } => {
                write!(f, "kind '{kind}' already associated with move {move_desc}")
            }
            Self::KindNotPresent { move_desc, kind } => {
                write!(f, "kind '{kind}' not associated with move {move_desc}")
            }
            Self::NotFound { entity } => {
                write!(f, "no such {entity} in reverse multimap")
            }
            Self::SourcesMismatch {
                kind,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "stale sources for kind '{kind}': expected total {expected}, found {actual}"
                )
            }
            Self::Integrity { reason } => {
                write!(f, "reverse multimap integrity violation: {reason}")
            }
            Self::CacheDivergence { rule, detail } => {
                write!(f, "move cache for rule '{rule}' diverged: {detail}")
            }
            Self::Inconsistency { reason } => {
                write!(f, "defect state inconsistency: {reason}")
            }
            Self::MissingRate { rule, kind } => {
                write!(f, "config: {rule}: missing required rate for kind '{kind}'")
            }
            Self::NegativeWeight { value, weight } => {
                write!(f, "negative weight {weight} for {value}")
            }
            Self::EmptyChoice => {
                write!(f, "cannot choose from total weight of zero")
            }
            Self::Config { reason } => {
                write!(f, "config: {reason}")
            }
            Self::Snapshot { reason } => {
                write!(f, "snapshot: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::NoEligibleMoves { step } => {
                write!(f, "no eligible moves remain at step {step}")
            }
        }
    }
}

impl std::error::Error for KmcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KmcError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for KmcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot {
            reason: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for KmcError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}

/// Convenience type alias for simulation results
pub type Result<T> = std::result::Result<T, KmcError>;

/// Create a file system error carrying the path and operation
pub fn fs_error(path: &std::path::Path, operation: &'static str, source: std::io::Error) -> KmcError {
    KmcError::FileSystem {
        path: path.to_path_buf(),
        operation,
        source,
    }
}
