//! Incremental move cache: rate-class bookkeeping for an evolving move set
//!
//! A move may be eligible under several rate classes ("kinds") at once. The
//! cache keys the reverse multimap by the move's full kind-set, so moves with
//! different ambiguity classes stay separately retrievable, and resolves the
//! ambiguity per selection round by multinomially splitting each kind-set
//! bucket across its members. Splitting first and then drawing a member from
//! the recorded source buckets reproduces exactly the distribution a full
//! rescan-and-enumerate would give, with no systematic favoritism between
//! kinds.

use crate::engine::multimap::ReverseMultimap;
use crate::io::error::{KmcError, Result};
use crate::rules::Move;
use rand::Rng;
use rand_distr::{Binomial, Distribution};
use std::collections::HashMap;

/// A rate class a move may belong to
///
/// Statically enumerable; each rule reports the subset it can produce. The
/// string forms are stable and appear in configuration files and step
/// records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// The single kind of rules that do not distinguish rates
    Natural,
    /// Unassisted divacancy hop
    Direct,
    /// Divacancy hop assisted by a vacant flanking site
    Assisted,
}

/// Every kind, in bitmask order
pub const ALL_KINDS: [Kind; 3] = [Kind::Natural, Kind::Direct, Kind::Assisted];

impl Kind {
    /// Stable name used by configuration and output
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Direct => "direct",
            Self::Assisted => "assisted",
        }
    }

    /// Parse a configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_KINDS.into_iter().find(|k| k.as_str() == name)
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Natural => 1,
            Self::Direct => 2,
            Self::Assisted => 4,
        }
    }
}

/// Immutable set of kinds, used as the multimap tag
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KindSet(u8);

impl KindSet {
    /// The empty set; never stored in the cache
    pub const EMPTY: Self = Self(0);

    /// Set containing a single kind
    pub const fn singleton(kind: Kind) -> Self {
        Self(kind.bit())
    }

    /// This set with a kind added
    pub const fn with(self, kind: Kind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// This set with a kind removed
    pub const fn without(self, kind: Kind) -> Self {
        Self(self.0 & !kind.bit())
    }

    /// Membership test
    pub const fn contains(self, kind: Kind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Number of kinds in the set
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members in bitmask order
    pub fn iter(self) -> impl Iterator<Item = Kind> {
        ALL_KINDS.into_iter().filter(move |k| self.contains(*k))
    }
}

/// One probabilistic resolution of all ambiguous moves into single kinds
///
/// Produced by [`IncrementalMoveCache::decide`] and consumed by
/// [`IncrementalMoveCache::pick`]; stale decisions are detected by total
/// mismatch.
#[derive(Debug, Default, Clone)]
pub struct Decision {
    counts: HashMap<Kind, u64>,
    /// kind -> (kind-set bucket, moves the bucket contributed to this kind)
    sources: HashMap<Kind, Vec<(KindSet, u64)>>,
}

impl Decision {
    /// Moves decided to a kind this round
    pub fn count(&self, kind: Kind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Tracks the exact set of currently valid moves for one rule, partitioned
/// by kind-set
#[derive(Debug, Clone, Default)]
pub struct IncrementalMoveCache {
    kindsets: ReverseMultimap<Move, KindSet>,
}

impl IncrementalMoveCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of moves currently tracked
    pub fn len(&self) -> usize {
        self.kindsets.len()
    }

    /// Whether no moves are tracked
    pub fn is_empty(&self) -> bool {
        self.kindsets.is_empty()
    }

    /// Drop every move, used by full-recompute mode
    pub fn clear(&mut self) {
        self.kindsets.clear();
    }

    /// Whether the move is present under any kind
    pub fn has_move(&self, mv: &Move) -> bool {
        self.kindsets.contains(mv)
    }

    /// The kind-set a move currently carries
    pub fn kinds_of(&self, mv: &Move) -> Option<KindSet> {
        self.kindsets.get(mv).copied()
    }

    /// Iterate over `(move, kind-set)` pairs in unspecified order
    pub fn moves(&self) -> impl Iterator<Item = (&Move, &KindSet)> {
        self.kindsets.iter()
    }

    /// Union a kind into a move's kind-set
    ///
    /// # Errors
    ///
    /// Fails when the kind is already associated; a duplicate add means an
    /// invalidation callback fired twice and the bookkeeping is suspect.
    pub fn add(&mut self, mv: Move, kind: Kind) -> Result<()> {
        let old = self.kinds_of(&mv).unwrap_or(KindSet::EMPTY);
        if old.contains(kind) {
            return Err(KmcError::DuplicateKind {
                move_desc: format!("{mv:?}"),
                kind: kind.as_str(),
            });
        }
        self.kindsets.set(mv, old.with(kind));
        Ok(())
    }

    /// Remove one kind from a move's kind-set
    ///
    /// The move is dropped entirely when its set empties; a move must never
    /// remain present with zero kinds.
    ///
    /// # Errors
    ///
    /// Fails when the kind is not associated with the move.
    pub fn clear_one(&mut self, mv: Move, kind: Kind) -> Result<()> {
        let old = self.kinds_of(&mv).unwrap_or(KindSet::EMPTY);
        if !old.contains(kind) {
            return Err(KmcError::KindNotPresent {
                move_desc: format!("{mv:?}"),
                kind: kind.as_str(),
            });
        }
        let new = old.without(kind);
        if new.is_empty() {
            let _ = self.kindsets.remove(&mv);
        } else {
            self.kindsets.set(mv, new);
        }
        Ok(())
    }

    /// Remove a move unconditionally; no-op when absent
    pub fn clear_all(&mut self, mv: &Move) {
        if self.kindsets.contains(mv) {
            let _ = self.kindsets.remove(mv);
        }
    }

    /// Count of moves exactly tagged with each kind-set
    ///
    /// Sorted by kind-set so downstream random draws consume the generator
    /// in a reproducible order. O(distinct kind-sets).
    pub fn undecided_counts(&self) -> Vec<(KindSet, u64)> {
        let mut out: Vec<(KindSet, u64)> = self
            .kindsets
            .count_by_tag()
            .map(|(set, n)| (*set, n as u64))
            .collect();
        out.sort_unstable_by_key(|&(set, _)| set);
        out
    }

    /// Resolve every ambiguous bucket into per-kind counts for this round
    ///
    /// Each bucket of `n` moves sharing kind-set `S` is split by a
    /// multinomial draw with uniform probability `1/|S|`, realized as a
    /// chain of binomial draws. Single-kind buckets pass through intact.
    pub fn decide<R: Rng>(&self, rng: &mut R) -> Decision {
        let mut decision = Decision::default();
        for (set, total) in self.undecided_counts() {
            let members: Vec<Kind> = set.iter().collect();
            let mut remaining = total;
            for (i, &kind) in members.iter().enumerate() {
                let left = members.len() - i;
                let share = if left == 1 || remaining == 0 {
                    remaining
                } else {
                    sample_binomial(remaining, 1.0 / left as f64, rng)
                };
                if share > 0 {
                    *decision.counts.entry(kind).or_default() += share;
                    decision.sources.entry(kind).or_default().push((set, share));
                }
                remaining -= share;
            }
        }
        decision
    }

    /// Draw one move decided to the given kind, consistent with the round
    ///
    /// First draws a source kind-set proportionally to its decided
    /// contribution, then a uniform member of that bucket. `expected_total`
    /// must equal the decision's count for the kind; a mismatch means the
    /// cache changed since `decide` and is a fatal invariant violation.
    ///
    /// # Errors
    ///
    /// Fails with a sources mismatch on stale decisions, or a lookup error
    /// when the kind has no decided moves.
    pub fn pick<R: Rng>(
        &self,
        kind: Kind,
        decision: &Decision,
        rng: &mut R,
        expected_total: u64,
    ) -> Result<Move> {
        let buckets = decision.sources.get(&kind).map_or(&[][..], Vec::as_slice);
        let total: u64 = buckets.iter().map(|&(_, n)| n).sum();
        if total != expected_total {
            return Err(KmcError::SourcesMismatch {
                kind: kind.as_str(),
                expected: expected_total,
                actual: total,
            });
        }
        if total == 0 {
            return Err(KmcError::NotFound { entity: "decided move" });
        }

        let mut draw = rng.random_range(0..total);
        for &(set, n) in buckets {
            if draw < n {
                return self.kindsets.get_random(&set, rng).copied();
            }
            draw -= n;
        }
        unreachable!("draw bounded by the bucket total")
    }

    /// Check the underlying multimap's redundant structures
    ///
    /// # Errors
    ///
    /// Returns an integrity error describing the first violation found.
    pub fn validate_integrity(&self) -> Result<()> {
        self.kindsets.validate_integrity()
    }

    /// Assert exact equality against a freshly recomputed cache
    ///
    /// # Errors
    ///
    /// Fails naming the first divergent move in sorted order.
    pub fn validate_against(&self, expected: &Self, rule: &'static str) -> Result<()> {
        let mut divergences: Vec<String> = Vec::new();
        for (mv, set) in self.moves() {
            match expected.kinds_of(mv) {
                None => divergences.push(format!("{mv:?} only in live cache")),
                Some(want) if want != *set => divergences.push(format!(
                    "{mv:?} kinds differ: live {set:?}, recomputed {want:?}"
                )),
                Some(_) => {}
            }
        }
        for (mv, _) in expected.moves() {
            if !self.has_move(mv) {
                divergences.push(format!("{mv:?} only in recomputed cache"));
            }
        }
        if divergences.is_empty() {
            return Ok(());
        }
        divergences.sort_unstable();
        Err(KmcError::CacheDivergence {
            rule,
            detail: divergences.swap_remove(0),
        })
    }
}

fn sample_binomial<R: Rng>(n: u64, p: f64, rng: &mut R) -> u64 {
    match Binomial::new(n, p) {
        Ok(dist) => dist.sample(rng),
        // p is always a reciprocal of a small positive integer
        Err(_) => unreachable!("binomial probability out of range"),
    }
}
