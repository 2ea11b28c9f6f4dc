//! Runtime constants and the YAML run configuration
//!
//! A run is described by one YAML document: lattice dimensions, seed, step
//! count, update mode, the rule set with per-kind rates (or energy barriers
//! converted through an Arrhenius factor), and an optional random initial
//! state. Rules are instantiated in a fixed canonical order regardless of
//! their order in the document, so the generator stream depends only on the
//! configured values.

use crate::engine::cache::Kind;
use crate::engine::sim::UpdateMode;
use crate::io::error::{KmcError, Result, fs_error};
use crate::rules::{
    CreateTrefoil, CreateVacancy, DestroyTrefoil, FillVacancy, FlipMonovacancy, MigrateVacancy,
    Rule,
};
use crate::state::{DefectState, Lattice, RandomMode, RandomParams};
use rand::Rng;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Fixed seed for reproducible runs
pub const DEFAULT_SEED: u64 = 42;

/// Default number of steps before stopping
pub const DEFAULT_STEPS: u64 = 1000;

/// Default self-check cadence; zero disables periodic validation
pub const DEFAULT_VALIDATE_EVERY: u64 = 0;

/// Salt mixed into the run seed to derive the fingerprint table seed
///
/// Keeps the Zobrist table stream independent of the simulation stream.
pub const ZOBRIST_SEED_SALT: u64 = 0x9e37_79b9_97f4_a7c5;

/// Boltzmann constant in electronvolt per kelvin
pub const BOLTZMANN_EV_PER_K: f64 = 1.380_648_52e-23 * 6.241_509_13e18;

/// Canonical rule instantiation order
///
/// Selection weights are enumerated in this order every step, so it is part
/// of the determinism contract.
pub const RULE_ORDER: [&str; 6] = [
    "create_vacancy",
    "fill_vacancy",
    "flip_monovacancy",
    "migrate_vacancy",
    "create_trefoil",
    "destroy_trefoil",
];

/// Top-level run configuration document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Lattice section
    pub lattice: LatticeConfig,
    /// Seed for every random stream of the run
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of steps to attempt
    #[serde(default = "default_steps")]
    pub steps: u64,
    /// Cache update mode
    #[serde(default)]
    pub mode: ModeConfig,
    /// Temperature in kelvin, required when any rule gives barriers
    #[serde(default)]
    pub temperature_k: Option<f64>,
    /// Enabled rules keyed by canonical name
    pub rules: BTreeMap<String, RuleConfig>,
    /// Optional non-pristine initial state
    #[serde(default)]
    pub initial_state: Option<InitialStateConfig>,
}

/// Lattice section of the configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatticeConfig {
    /// Periodic dimensions of the unit cell
    pub dim: [usize; 2],
}

/// Cache update mode names
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeConfig {
    /// Incremental retract-and-re-add bookkeeping
    #[default]
    Incremental,
    /// Full cache rebuild every step
    Full,
}

impl ModeConfig {
    /// The engine-level mode
    pub const fn update_mode(self) -> UpdateMode {
        match self {
            Self::Incremental => UpdateMode::Incremental,
            Self::Full => UpdateMode::FullRecompute,
        }
    }
}

/// Per-rule section: exactly one of `rate` or `barrier`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Direct rate, scalar or per kind
    #[serde(default)]
    pub rate: Option<RateSpec>,
    /// Energy barrier in electronvolts, scalar or per kind
    #[serde(default)]
    pub barrier: Option<RateSpec>,
}

/// A scalar shorthand stands for the single `natural` kind
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RateSpec {
    /// One value for the `natural` kind
    Scalar(f64),
    /// One value per named kind
    PerKind(BTreeMap<String, f64>),
}

impl RateSpec {
    /// Expand into named values
    fn entries(&self) -> Vec<(&str, f64)> {
        match self {
            Self::Scalar(value) => vec![(Kind::Natural.as_str(), *value)],
            Self::PerKind(map) => map.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
        }
    }
}

/// Initial state section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialStateConfig {
    /// Random seeding parameters
    pub random: RandomInitConfig,
}

/// Random seeding parameters
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomInitConfig {
    /// Exact counts or per-node probabilities
    #[serde(default = "default_random_mode")]
    pub mode: RandomMode,
    /// Fraction of sites seeded as divacancies
    #[serde(default)]
    pub divacancy: f64,
    /// Fraction of sites seeded as monovacancies
    #[serde(default)]
    pub monovacancy: f64,
}

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

const fn default_steps() -> u64 {
    DEFAULT_STEPS
}

const fn default_random_mode() -> RandomMode {
    RandomMode::Exact
}

impl Config {
    /// Parse a configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed YAML or invalid values.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns a file system error when the file cannot be read, or a
    /// configuration error for invalid content.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| fs_error(path, "read config", e))?;
        Self::from_yaml_str(&text)
    }

    /// Validate cross-field constraints
    fn check(&self) -> Result<()> {
        if self.lattice.dim[0] < 1 || self.lattice.dim[1] < 1 {
            return Err(KmcError::Config {
                reason: format!("lattice dimensions must be >= 1, got {:?}", self.lattice.dim),
            });
        }
        if self.rules.is_empty() {
            return Err(KmcError::Config {
                reason: "at least one rule must be enabled".to_string(),
            });
        }
        for name in self.rules.keys() {
            if !RULE_ORDER.contains(&name.as_str()) {
                return Err(KmcError::Config {
                    reason: format!("unknown rule '{name}'"),
                });
            }
        }
        if let Some(t) = self.temperature_k
            && t <= 0.0
        {
            return Err(KmcError::Config {
                reason: format!("temperature_k must be positive, got {t}"),
            });
        }
        Ok(())
    }

    /// Instantiate the configured rules with resolved rate tables
    ///
    /// Rules come out in canonical order, never in document order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for contradictory rate sections or
    /// unknown kind names.
    pub fn build_rules(&self) -> Result<Vec<(Box<dyn Rule>, HashMap<Kind, f64>)>> {
        let mut out: Vec<(Box<dyn Rule>, HashMap<Kind, f64>)> = Vec::new();
        for name in RULE_ORDER {
            let Some(section) = self.rules.get(name) else {
                continue;
            };
            let rates = self.resolve_rates(name, section)?;
            out.push((make_rule(name), rates));
        }
        Ok(out)
    }

    /// Build the initial state from the configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid occupation fractions.
    pub fn build_state<R: Rng>(&self, rng: &mut R) -> Result<DefectState> {
        let lattice = Lattice::new(self.lattice.dim);
        match &self.initial_state {
            None => Ok(DefectState::new(lattice)),
            Some(init) => {
                let params = RandomParams {
                    divacancy: init.random.divacancy,
                    monovacancy: init.random.monovacancy,
                };
                DefectState::random(lattice, params, init.random.mode, rng)
            }
        }
    }

    fn resolve_rates(&self, name: &str, section: &RuleConfig) -> Result<HashMap<Kind, f64>> {
        let (spec, is_barrier) = match (&section.rate, &section.barrier) {
            (Some(_), Some(_)) => {
                return Err(KmcError::Config {
                    reason: format!("{name}: 'rate' and 'barrier' are mutually exclusive"),
                });
            }
            (None, None) => {
                return Err(KmcError::Config {
                    reason: format!("{name}: one of 'rate' or 'barrier' is required"),
                });
            }
            (Some(rate), None) => (rate, false),
            (None, Some(barrier)) => (barrier, true),
        };

        let mut rates = HashMap::new();
        for (kind_name, value) in spec.entries() {
            let Some(kind) = Kind::from_name(kind_name) else {
                return Err(KmcError::Config {
                    reason: format!("{name}: unknown kind '{kind_name}'"),
                });
            };
            let rate = if is_barrier {
                let Some(temperature) = self.temperature_k else {
                    return Err(KmcError::Config {
                        reason: format!("{name}: 'barrier' requires temperature_k"),
                    });
                };
                arrhenius_rate(value, temperature)
            } else {
                value
            };
            rates.insert(kind, rate);
        }
        Ok(rates)
    }
}

/// Arrhenius factor for an energy barrier at a temperature
///
/// Barrier in electronvolts, temperature in kelvin; the attempt frequency
/// prefactor is taken as one, so rates are relative.
pub fn arrhenius_rate(barrier_ev: f64, temperature_k: f64) -> f64 {
    (-barrier_ev / (BOLTZMANN_EV_PER_K * temperature_k)).exp()
}

fn make_rule(name: &str) -> Box<dyn Rule> {
    match name {
        "create_vacancy" => Box::new(CreateVacancy::new()),
        "fill_vacancy" => Box::new(FillVacancy::new()),
        "flip_monovacancy" => Box::new(FlipMonovacancy::new()),
        "migrate_vacancy" => Box::new(MigrateVacancy::new()),
        "create_trefoil" => Box::new(CreateTrefoil::new()),
        "destroy_trefoil" => Box::new(DestroyTrefoil::new()),
        other => panic!("rule name '{other}' passed canonical-name validation"),
    }
}
