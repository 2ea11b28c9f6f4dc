//! Weighted random selection
//!
//! Entries are sorted ascending by weight before the cumulative table is
//! built, so the largest weights absorb the floating point error of the
//! running sum. Zero weights are dropped up front: an entry with weight zero
//! must be impossible, not merely improbable.

use crate::io::error::{KmcError, Result};
use rand::Rng;
use std::cmp::Ordering;
use std::fmt;

/// Select one entry with probability proportional to its weight
///
/// # Errors
///
/// Fails on a negative weight, or when no entry has positive weight.
pub fn weighted_choice<'a, T, R>(entries: &'a [(T, f64)], rng: &mut R) -> Result<&'a T>
where
    T: fmt::Debug,
    R: Rng,
{
    let (values, cumulative) = cumulative_table(entries)?;
    Ok(pick_from_table(&values, &cumulative, rng))
}

/// Draw `count` entries with replacement, sharing one cumulative table
///
/// # Errors
///
/// Fails on a negative weight, or when no entry has positive weight.
pub fn weighted_sample<'a, T, R>(
    entries: &'a [(T, f64)],
    count: usize,
    rng: &mut R,
) -> Result<Vec<&'a T>>
where
    T: fmt::Debug,
    R: Rng,
{
    let (values, cumulative) = cumulative_table(entries)?;
    Ok((0..count)
        .map(|_| pick_from_table(&values, &cumulative, rng))
        .collect())
}

/// Positive-weight values sorted ascending by weight, with running totals
fn cumulative_table<T>(entries: &[(T, f64)]) -> Result<(Vec<&T>, Vec<f64>)>
where
    T: fmt::Debug,
{
    let mut positive: Vec<(&T, f64)> = Vec::with_capacity(entries.len());
    for (value, weight) in entries {
        if *weight < 0.0 {
            return Err(KmcError::NegativeWeight {
                value: format!("{value:?}"),
                weight: *weight,
            });
        }
        if *weight > 0.0 {
            positive.push((value, *weight));
        }
    }
    if positive.is_empty() {
        return Err(KmcError::EmptyChoice);
    }
    // Stable sort: equal weights keep input order, so the draw sequence is
    // a pure function of the entries and the generator state
    positive.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut cumulative = Vec::with_capacity(positive.len());
    let mut total = 0.0;
    let mut values = Vec::with_capacity(positive.len());
    for (value, weight) in positive {
        total += weight;
        cumulative.push(total);
        values.push(value);
    }
    Ok((values, cumulative))
}

fn pick_from_table<'a, T, R: Rng>(values: &[&'a T], cumulative: &[f64], rng: &mut R) -> &'a T {
    let total = cumulative[cumulative.len() - 1];
    let draw = rng.random_range(0.0..total);
    let slot = cumulative.partition_point(|&edge| edge <= draw);
    values[slot.min(values.len() - 1)]
}
