//! Resource value algebra — typed values carried by offered resources.
//!
//! Three value kinds mirror what the cluster manager offers:
//!
//! - **Scalar** — fractional quantities (cpus, mem, disk)
//! - **Ranges** — sets of inclusive integer intervals (ports)
//! - **Set** — unordered collections of distinct strings
//!
//! All operations are kind-homogeneous. Mixing kinds is a caller bug
//! surfaced as [`ValueError::KindMismatch`], never an "absent" result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Scalar comparisons tolerate this much floating-point drift.
const SCALAR_EPSILON: f64 = 1e-9;

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Scalar,
    Ranges,
    Set,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "scalar"),
            ValueKind::Ranges => write!(f, "ranges"),
            ValueKind::Set => write!(f, "set"),
        }
    }
}

/// An inclusive integer interval, e.g. ports 8080–8090.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub begin: u64,
    pub end: u64,
}

impl Interval {
    /// Number of integers covered by this interval.
    pub fn span(&self) -> u64 {
        self.end - self.begin + 1
    }
}

/// A typed resource quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Scalar { value: f64 },
    Ranges { ranges: Vec<Interval> },
    Set { items: BTreeSet<String> },
}

impl Value {
    /// A scalar quantity.
    pub fn scalar(value: f64) -> Self {
        Value::Scalar { value }
    }

    /// A range value from `(begin, end)` pairs, normalized on construction.
    pub fn ranges(pairs: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let intervals = pairs
            .into_iter()
            .map(|(begin, end)| Interval { begin, end })
            .collect();
        Value::Ranges {
            ranges: normalize(intervals),
        }
    }

    /// A set value from string items.
    pub fn set(items: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Value::Set {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar { .. } => ValueKind::Scalar,
            Value::Ranges { .. } => ValueKind::Ranges,
            Value::Set { .. } => ValueKind::Set,
        }
    }

    /// The empty value of the given kind.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Scalar => Value::Scalar { value: 0.0 },
            ValueKind::Ranges => Value::Ranges { ranges: Vec::new() },
            ValueKind::Set => Value::Set {
                items: BTreeSet::new(),
            },
        }
    }

    /// Whether this value is its kind's zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Scalar { value } => value.abs() < SCALAR_EPSILON,
            Value::Ranges { ranges } => ranges.is_empty(),
            Value::Set { items } => items.is_empty(),
        }
    }

    /// Total magnitude: scalar value, covered interval count, or set size.
    ///
    /// Used to order candidates when several could satisfy a request.
    pub fn quantity(&self) -> f64 {
        match self {
            Value::Scalar { value } => *value,
            Value::Ranges { ranges } => ranges.iter().map(Interval::span).sum::<u64>() as f64,
            Value::Set { items } => items.len() as f64,
        }
    }
}

/// Whether `have` can satisfy a request for `want`.
///
/// Scalar: numeric `>=`. Ranges: every wanted interval is contained in
/// the offered interval set. Set: subset.
pub fn sufficient(have: &Value, want: &Value) -> Result<bool, ValueError> {
    match (have, want) {
        (Value::Scalar { value: h }, Value::Scalar { value: w }) => {
            Ok(*h + SCALAR_EPSILON >= *w)
        }
        (Value::Ranges { ranges: h }, Value::Ranges { ranges: w }) => {
            let have = normalize(h.clone());
            let want = normalize(w.clone());
            Ok(want
                .iter()
                .all(|w| have.iter().any(|h| h.begin <= w.begin && w.end <= h.end)))
        }
        (Value::Set { items: h }, Value::Set { items: w }) => Ok(w.is_subset(h)),
        _ => Err(ValueError::KindMismatch {
            have: have.kind(),
            want: want.kind(),
        }),
    }
}

/// Combine two values of the same kind.
///
/// Scalar: sum. Ranges: interval-set union, merging overlapping and
/// adjacent intervals. Set: union.
pub fn add(a: &Value, b: &Value) -> Result<Value, ValueError> {
    match (a, b) {
        (Value::Scalar { value: x }, Value::Scalar { value: y }) => {
            Ok(Value::Scalar { value: x + y })
        }
        (Value::Ranges { ranges: x }, Value::Ranges { ranges: y }) => {
            let mut all = x.clone();
            all.extend(y.iter().copied());
            Ok(Value::Ranges {
                ranges: normalize(all),
            })
        }
        (Value::Set { items: x }, Value::Set { items: y }) => Ok(Value::Set {
            items: x.union(y).cloned().collect(),
        }),
        _ => Err(ValueError::KindMismatch {
            have: a.kind(),
            want: b.kind(),
        }),
    }
}

/// Remove `want` from `have`.
///
/// Fails with [`ValueError::Insufficient`] when `have` cannot satisfy
/// `want`; callers must check [`sufficient`] first for absent-style
/// handling.
pub fn subtract(have: &Value, want: &Value) -> Result<Value, ValueError> {
    if !sufficient(have, want)? {
        return Err(ValueError::Insufficient);
    }
    match (have, want) {
        (Value::Scalar { value: h }, Value::Scalar { value: w }) => Ok(Value::Scalar {
            value: (h - w).max(0.0),
        }),
        (Value::Ranges { ranges: h }, Value::Ranges { ranges: w }) => Ok(Value::Ranges {
            ranges: difference(&normalize(h.clone()), &normalize(w.clone())),
        }),
        (Value::Set { items: h }, Value::Set { items: w }) => Ok(Value::Set {
            items: h.difference(w).cloned().collect(),
        }),
        // sufficient() already rejected mismatched kinds.
        _ => Err(ValueError::KindMismatch {
            have: have.kind(),
            want: want.kind(),
        }),
    }
}

/// Sort intervals and merge any that overlap or are adjacent.
fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    if intervals.is_empty() {
        return intervals;
    }
    intervals.sort_by_key(|i| (i.begin, i.end));
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        match merged.last_mut() {
            Some(last) if next.begin <= last.end.saturating_add(1) => {
                last.end = last.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Interval-set difference `have \ want`. Both inputs must be normalized.
fn difference(have: &[Interval], want: &[Interval]) -> Vec<Interval> {
    let mut result = Vec::new();
    for h in have {
        let mut pieces = vec![*h];
        for w in want {
            let mut next = Vec::new();
            for p in pieces {
                if w.end < p.begin || w.begin > p.end {
                    next.push(p);
                    continue;
                }
                if w.begin > p.begin {
                    next.push(Interval {
                        begin: p.begin,
                        end: w.begin - 1,
                    });
                }
                if w.end < p.end {
                    next.push(Interval {
                        begin: w.end + 1,
                        end: p.end,
                    });
                }
            }
            pieces = next;
        }
        result.extend(pieces);
    }
    result
}
