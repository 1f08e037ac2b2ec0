//! Nested numeric values and the structural walker over them.
//!
//! A target (and the matching simulation state) is a [`Value`] tree: a bare
//! number, a list, or an insertion-ordered map whose leaves are numbers.
//! Non-numeric leaves are unrepresentable by construction; the JSON boundary
//! rejects them explicitly instead of letting NaN propagate through the
//! integrator.

use std::fmt;

/// A numeric value tree.
///
/// Maps preserve insertion order, so traversal order is deterministic and
/// matches the order keys were added in, the same way the original data
/// source (JSON objects) behaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

/// Rejected input at the JSON boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("non-numeric leaf in value tree: {0}")]
pub struct ValueError(pub String);

impl Value {
    /// Builds a map value preserving the iteration order of `entries`.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Looks up a map entry by key.
    pub fn entry(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up a list element by index.
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Returns a same-shaped tree with every leaf set to zero. Used to seed
    /// velocity trees.
    pub fn zeroed(&self) -> Value {
        match self {
            Value::Number(_) => Value::Number(0.),
            Value::List(items) => Value::List(items.iter().map(Value::zeroed).collect()),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.zeroed()))
                    .collect(),
            ),
        }
    }

    /// Converts from JSON. Integers are widened to `f64`; any null, bool or
    /// string leaf is a contract violation.
    pub fn from_json(json: &serde_json::Value) -> Result<Value, ValueError> {
        match json {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| ValueError(n.to_string())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Result<_, _>>()
                .map(Value::List),
            serde_json::Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
                .collect::<Result<_, _>>()
                .map(Value::Map),
            other => Err(ValueError(other.to_string())),
        }
    }

    /// Converts to JSON, preserving map order. Integral leaves come out as
    /// JSON integers, so values widened by [`from_json`](Self::from_json)
    /// round-trip unchanged.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Number(x) => to_json_number(*x),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn to_json_number(x: f64) -> serde_json::Value {
    if x.is_finite() && x.fract() == 0. && (i64::MIN as f64..=i64::MAX as f64).contains(&x) {
        serde_json::Value::from(x as i64)
    } else {
        serde_json::Number::from_f64(x).map_or(serde_json::Value::Null, Into::into)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Value::List(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Produces the (values, velocities) pair mirroring the target's shape:
/// values copied from the target leaves, velocity zero everywhere.
pub fn rest_state(target: &Value) -> (Value, Value) {
    (target.clone(), target.zeroed())
}

/// Whether every leaf of the target is at rest in the simulation state.
///
/// A leaf is at rest only when its velocity is exactly zero and its current
/// value exactly equals the target; the integrator's snap rule guarantees
/// exact equality is reached, so no epsilon is involved here. A branch the
/// state does not have yet (the target just grew it) counts as not
/// converged, which keeps the animation running until the branch is lazily
/// initialized and settles.
///
/// All branches must be at rest; the check never stops early on a converged
/// branch while others are still moving.
pub fn all_converged(current: &Value, target: &Value, velocity: &Value) -> bool {
    match target {
        Value::Number(t) => match (current, velocity) {
            (Value::Number(x), Value::Number(v)) => *v == 0. && x == t,
            _ => false,
        },
        Value::List(targets) => targets.iter().enumerate().all(|(i, t)| {
            match (current.at(i), velocity.at(i)) {
                (Some(x), Some(v)) => all_converged(x, t, v),
                _ => false,
            }
        }),
        Value::Map(targets) => targets.iter().all(|(key, t)| {
            match (current.entry(key), velocity.entry(key)) {
                (Some(x), Some(v)) => all_converged(x, t, v),
                _ => false,
            }
        }),
    }
}
