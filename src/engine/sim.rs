//! Simulation engine: one Gillespie-style selection and application step
//!
//! The engine owns the defect state, the rule list with per-kind rate
//! tables, and the single random generator. All randomness flows through
//! that generator, and every generator-consuming iteration runs in vector
//! or sorted order, so two engines built with equal seeds over equal
//! configurations emit byte-identical record streams.

use crate::engine::cache::{Decision, Kind};
use crate::engine::choice::weighted_choice;
use crate::io::error::{KmcError, Result};
use crate::rules::{Move, MoveInfo, Rule};
use crate::state::DefectState;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How move caches are kept in sync with the state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// Retract and re-add only the moves touching changed nodes
    Incremental,
    /// Rebuild every cache from scratch after each mutation
    ///
    /// The reference mode: slower by a factor of the lattice size, immune
    /// to invalidation bugs, and the yardstick incremental runs are
    /// validated against.
    FullRecompute,
}

/// A rule together with its immutable per-kind rate table
pub struct RuleEntry {
    rule: Box<dyn Rule>,
    rates: HashMap<Kind, f64>,
}

impl RuleEntry {
    /// The rule itself
    pub fn rule(&self) -> &dyn Rule {
        self.rule.as_ref()
    }

    /// Rate for a kind; zero when the table omits it
    pub fn rate(&self, kind: Kind) -> f64 {
        self.rates.get(&kind).copied().unwrap_or(0.0)
    }
}

/// One performed step, in the shape the output stream persists
///
/// Field names are a stability contract with downstream analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step counter after this move
    pub step: u64,
    /// Name of the rule performed
    pub rule: String,
    /// Kind the move was decided to
    pub kind: String,
    /// Description of the move
    #[serde(rename = "move")]
    pub move_info: MoveInfo,
    /// Rate of the selected (rule, kind) channel
    pub rate: f64,
    /// Total rate of all channels at selection time
    pub total_rate: f64,
    /// State fingerprint after the move, when enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zobrist: Option<u64>,
}

/// Kinetic Monte Carlo engine over a defect state and a fixed rule list
pub struct KmcEngine {
    state: DefectState,
    rules: Vec<RuleEntry>,
    mode: UpdateMode,
    rng: StdRng,
    step: u64,
}

impl KmcEngine {
    /// Build an engine, validate the rate tables and initialize all caches
    ///
    /// Every kind a rule declares must have a non-negative rate; a rate for
    /// a kind the rule never produces is tolerated with a warning.
    ///
    /// # Errors
    ///
    /// Fails on a missing or negative rate, or when initial move
    /// enumeration finds an inconsistency.
    pub fn new(
        state: DefectState,
        rules: Vec<(Box<dyn Rule>, HashMap<Kind, f64>)>,
        mode: UpdateMode,
        seed: u64,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(rules.len());
        for (mut rule, rates) in rules {
            for &kind in rule.kinds() {
                match rates.get(&kind) {
                    None => {
                        return Err(KmcError::MissingRate {
                            rule: rule.name(),
                            kind: kind.as_str(),
                        });
                    }
                    Some(rate) if *rate < 0.0 => {
                        return Err(KmcError::Config {
                            reason: format!(
                                "{}: negative rate {rate} for kind '{}'",
                                rule.name(),
                                kind.as_str()
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
            for kind in rates.keys() {
                if !rule.kinds().contains(kind) {
                    tracing::warn!(
                        rule = rule.name(),
                        kind = kind.as_str(),
                        "rate given for a kind the rule never produces"
                    );
                }
            }
            rule.initialize_moves(&state)?;
            entries.push(RuleEntry { rule, rates });
        }
        Ok(Self {
            state,
            rules: entries,
            mode,
            rng: StdRng::seed_from_u64(seed),
            step: 0,
        })
    }

    /// The current defect state
    pub const fn state(&self) -> &DefectState {
        &self.state
    }

    /// Steps performed so far
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// The configured update mode
    pub const fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// The rule entries, in selection order
    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// Select one move proportionally to channel rates and apply it
    ///
    /// Per step: resolve each rule's ambiguous moves into per-kind counts,
    /// weight every (rule, kind) channel by `count * rate`, select one
    /// channel, draw a uniform move within it, retract dependent moves
    /// against the pre-move state, mutate, and re-add against the post-move
    /// state.
    ///
    /// # Errors
    ///
    /// `NoEligibleMoves` when no channel has positive weight (terminal);
    /// any other error is an invariant violation and the engine must not
    /// be stepped further.
    pub fn perform_random_move(&mut self) -> Result<StepRecord> {
        // 1. One decide round per rule, in rule order
        let mut decisions: Vec<Decision> = Vec::with_capacity(self.rules.len());
        for entry in &self.rules {
            decisions.push(entry.rule.cache().decide(&mut self.rng));
        }

        // 2. Weight every (rule, kind) channel
        let mut channels: Vec<((usize, Kind), f64)> = Vec::new();
        let mut total_rate = 0.0;
        for (index, entry) in self.rules.iter().enumerate() {
            for &kind in entry.rule.kinds() {
                let count = decisions[index].count(kind);
                let weight = count as f64 * entry.rate(kind);
                total_rate += weight;
                channels.push(((index, kind), weight));
            }
        }
        if total_rate <= 0.0 {
            return Err(KmcError::NoEligibleMoves { step: self.step });
        }

        // 3. Select a channel, then a uniform move within it
        let &(index, kind) = weighted_choice(&channels, &mut self.rng)?;
        let count = decisions[index].count(kind);
        let mv: Move =
            self.rules[index]
                .rule
                .cache()
                .pick(kind, &decisions[index], &mut self.rng, count)?;

        // 4. Retract, mutate, re-add
        let changed = self.rules[index].rule.nodes_affected_by(&mv);
        if self.mode == UpdateMode::Incremental {
            for entry in &mut self.rules {
                entry.rule.pre_status_change(&self.state, &changed);
            }
        }
        let info = self.rules[index].rule.info(&mv);
        self.rules[index].rule.perform(&mv, &mut self.state);
        match self.mode {
            UpdateMode::Incremental => {
                for entry in &mut self.rules {
                    entry.rule.post_status_change(&self.state, &changed)?;
                }
            }
            UpdateMode::FullRecompute => {
                // rebuild every cache so the engine is consistent between
                // steps, not just at selection time
                for entry in &mut self.rules {
                    entry.rule.initialize_moves(&self.state)?;
                }
            }
        }

        self.step += 1;
        Ok(StepRecord {
            step: self.step,
            rule: self.rules[index].rule.name().to_string(),
            kind: kind.as_str().to_string(),
            move_info: info,
            rate: self.rules[index].rate(kind),
            total_rate,
            zobrist: self.state.fingerprint_key(),
        })
    }

    /// Expensive cross-check of the state and every rule cache
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency, divergence or integrity violation
    /// found.
    pub fn validate(&self) -> Result<()> {
        self.state.validate()?;
        for entry in &self.rules {
            entry.rule.cache().validate_integrity()?;
            entry.rule.validate(&self.state)?;
        }
        Ok(())
    }
}
