//! Constraint checks shared by every kind.
//!
//! Each check returns the error it found, if any, so callers collect them into
//! an [`ErrorList`](crate::ErrorList) without short-circuiting.

use crate::field::{not_in_slice_message, FieldError, Path, Value};
use std::hash::Hash;

/// How many members of a discriminated union may be set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    ExactlyOne,
    AtMostOne,
}

/// The inclusive bounds of a single distribution weight. A weight of zero is
/// always accepted and sends no traffic.
pub const MIN_WEIGHT: f32 = 0.01;
pub const MAX_WEIGHT: f32 = 100.0;

// === impl Arity ===

impl Arity {
    pub fn admits(self, set: usize) -> bool {
        match self {
            Self::ExactlyOne => set == 1,
            Self::AtMostOne => set <= 1,
        }
    }
}

/// Counts how many members of a discriminated union are set.
pub fn count_set(members: &[bool]) -> usize {
    members.iter().filter(|set| **set).count()
}

/// Checks that the members of a discriminated union satisfy `arity`.
///
/// `value` is the containing structure, reported as evidence.
pub fn union(
    path: Path,
    value: impl Into<Value>,
    members: &[bool],
    arity: Arity,
    detail: &str,
) -> Option<FieldError> {
    if arity.admits(count_set(members)) {
        return None;
    }
    Some(FieldError::invalid(path, value, detail))
}

/// Rejects a tenancy field that is set while the capability it depends on is
/// disabled.
pub fn gated(path: Path, value: &str, enabled: bool, detail: &str) -> Option<FieldError> {
    if enabled || value.is_empty() {
        return None;
    }
    Some(FieldError::invalid(path, value, detail))
}

/// Checks that `value` is one of `allowed`.
pub fn one_of(path: Path, value: &str, allowed: &[&str]) -> Option<FieldError> {
    if allowed.contains(&value) {
        return None;
    }
    Some(FieldError::invalid(
        path,
        value,
        not_in_slice_message(allowed),
    ))
}

/// Checks that a path-like value is either empty or absolute.
pub fn path_prefix(path: Path, value: &str) -> Option<FieldError> {
    if value.is_empty() || value.starts_with('/') {
        return None;
    }
    Some(FieldError::invalid(path, value, "must begin with a '/'"))
}

/// Checks a single distribution weight.
pub fn weight(path: Path, weight: f32) -> Option<FieldError> {
    if weight == 0.0 || (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        return None;
    }
    Some(FieldError::invalid(
        path,
        weight,
        "weight must be a percentage between 0.01 and 100",
    ))
}

/// Checks that a distribution's weights, accumulated in single precision in
/// order, add up to exactly 100.
pub fn weight_sum(
    path: Path,
    value: impl Into<Value>,
    weights: impl IntoIterator<Item = f32>,
) -> Option<FieldError> {
    let sum = weights.into_iter().fold(0f32, |sum, w| sum + w);
    if sum == MAX_WEIGHT {
        return None;
    }
    Some(FieldError::invalid(
        path,
        value,
        format!(
            "the sum of weights across all splits must add up to 100 percent, but adds up to {sum:.6}"
        ),
    ))
}

/// Returns the indexes of items equal to an earlier item.
pub fn duplicates<'a, T, I>(items: I) -> Vec<usize>
where
    T: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut seen = ahash::AHashSet::new();
    items
        .into_iter()
        .enumerate()
        .filter(|(_, item)| !seen.insert(*item))
        .map(|(i, _)| i)
        .collect()
}

/// Checks that a duration-like quantity is not negative.
pub fn non_negative(path: Path, value: impl Into<Value>, negative: bool) -> Option<FieldError> {
    if !negative {
        return None;
    }
    Some(FieldError::invalid(path, value, "must be non-negative"))
}
