//! Parameter bag threaded through every activation call
//!
//! Values are JSON values so externally authored configuration keeps its
//! shape. Accessors are typed and fallible: a missing key or a type mismatch
//! is a [`ParamError`], which the engine turns into a round-fatal
//! configuration error. Nothing silently defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParamError;

/// When `true` in a caller's bag, a child's merged bag is written back.
pub const COLLATE: &str = "Collate";
/// Pending stateful-memory bag for the current stake
pub const STATEFUL_STASH: &str = "__StatefulMap";
/// Pending stateless-memory bag for the current round
pub const STATELESS_STASH: &str = "__StatelessMap";
/// Operator override keys start with this and only survive in developer mode
pub const FORCE_PREFIX: &str = "Force";
/// Developer-mode fixed seed for the round generator
pub const FORCE_SEED: &str = "ForceSeed";

/// Trigger origin written by triggers, read by expanding effects
pub const POSITION: &str = "Position";
/// Linear grid positions (`reel * rows + row`)
pub const POSITIONS: &str = "Positions";
/// Symbol painted by `TileExpansion`
pub const TILE_ID: &str = "TileId";

/// Heterogeneous, string-keyed parameter bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(a) => format!("list of {}", a.len()),
        Value::Object(_) => "bag".to_string(),
    }
}

fn as_int(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn as_uint(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|v| usize::try_from(v).ok())
}

fn as_weight(value: &Value) -> Option<u64> {
    value.as_u64()
}

fn as_list<T>(value: &Value, item: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(item).collect()
}

fn as_bag(value: &Value) -> Option<Params> {
    value.as_object().cloned().map(Params)
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object; anything else is a mismatch
    pub fn from_value(value: Value) -> Result<Self, ParamError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParamError::Mismatch {
                key: "<root>".to_string(),
                expected: "bag",
                found: describe(&other),
            }),
        }
    }

    /// Overlay-merge: a fresh bag of `defaults` with every `caller` key on top
    pub fn overlay(defaults: &Params, caller: &Params) -> Params {
        let mut merged = defaults.clone();
        merged.extend_from(caller);
        merged
    }

    /// Copy every key of `other` into this bag, replacing existing values
    pub fn extend_from(&mut self, other: &Params) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Builder: add a value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Drop every key matching the predicate, returning the dropped keys
    pub fn remove_where(&mut self, predicate: impl Fn(&str) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self.0.keys().filter(|k| predicate(k.as_str())).cloned().collect();
        for key in &doomed {
            self.0.remove(key);
        }
        doomed
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether child bags are written back into this one
    pub fn is_collate(&self) -> Result<bool, ParamError> {
        Ok(self.opt_bool(COLLATE)?.unwrap_or(false))
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Result<Option<T>, ParamError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| ParamError::Mismatch {
                key: key.to_string(),
                expected,
                found: describe(value),
            }),
        }
    }

    fn required<T>(&self, key: &str, value: Result<Option<T>, ParamError>) -> Result<T, ParamError> {
        value?.ok_or_else(|| ParamError::Missing(key.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SCALARS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn opt_int(&self, key: &str) -> Result<Option<i64>, ParamError> {
        self.typed(key, "int", as_int)
    }

    pub fn int(&self, key: &str) -> Result<i64, ParamError> {
        self.required(key, self.opt_int(key))
    }

    /// Non-negative integer (counts, indices, positions)
    pub fn opt_uint(&self, key: &str) -> Result<Option<usize>, ParamError> {
        self.typed(key, "non-negative int", as_uint)
    }

    pub fn uint(&self, key: &str) -> Result<usize, ParamError> {
        self.required(key, self.opt_uint(key))
    }

    /// Symbol id (fits `i32`)
    pub fn opt_symbol(&self, key: &str) -> Result<Option<i32>, ParamError> {
        self.typed(key, "symbol id", |v| v.as_i64().and_then(|n| i32::try_from(n).ok()))
    }

    pub fn symbol(&self, key: &str) -> Result<i32, ParamError> {
        self.required(key, self.opt_symbol(key))
    }

    /// Float; integer values are accepted
    pub fn opt_float(&self, key: &str) -> Result<Option<f64>, ParamError> {
        self.typed(key, "float", Value::as_f64)
    }

    pub fn float(&self, key: &str) -> Result<f64, ParamError> {
        self.required(key, self.opt_float(key))
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, ParamError> {
        self.typed(key, "bool", Value::as_bool)
    }

    pub fn bool(&self, key: &str) -> Result<bool, ParamError> {
        self.required(key, self.opt_bool(key))
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<String>, ParamError> {
        self.typed(key, "string", |v| v.as_str().map(str::to_string))
    }

    pub fn string(&self, key: &str) -> Result<String, ParamError> {
        self.required(key, self.opt_string(key))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LISTS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn opt_ints(&self, key: &str) -> Result<Option<Vec<i64>>, ParamError> {
        self.typed(key, "int list", |v| as_list(v, as_int))
    }

    pub fn ints(&self, key: &str) -> Result<Vec<i64>, ParamError> {
        self.required(key, self.opt_ints(key))
    }

    pub fn opt_symbols(&self, key: &str) -> Result<Option<Vec<i32>>, ParamError> {
        self.typed(key, "symbol list", |v| {
            as_list(v, |i| i.as_i64().and_then(|n| i32::try_from(n).ok()))
        })
    }

    pub fn symbols(&self, key: &str) -> Result<Vec<i32>, ParamError> {
        self.required(key, self.opt_symbols(key))
    }

    /// Linear grid positions; negative entries are a mismatch
    pub fn opt_positions(&self, key: &str) -> Result<Option<Vec<usize>>, ParamError> {
        self.typed(key, "position list", |v| as_list(v, as_uint))
    }

    pub fn positions(&self, key: &str) -> Result<Vec<usize>, ParamError> {
        self.required(key, self.opt_positions(key))
    }

    /// Selection weights
    pub fn opt_weights(&self, key: &str) -> Result<Option<Vec<u64>>, ParamError> {
        self.typed(key, "weight list", |v| as_list(v, as_weight))
    }

    pub fn weights(&self, key: &str) -> Result<Vec<u64>, ParamError> {
        self.required(key, self.opt_weights(key))
    }

    pub fn opt_floats(&self, key: &str) -> Result<Option<Vec<f64>>, ParamError> {
        self.typed(key, "float list", |v| as_list(v, Value::as_f64))
    }

    pub fn floats(&self, key: &str) -> Result<Vec<f64>, ParamError> {
        self.required(key, self.opt_floats(key))
    }

    pub fn opt_strings(&self, key: &str) -> Result<Option<Vec<String>>, ParamError> {
        self.typed(key, "string list", |v| {
            as_list(v, |i| i.as_str().map(str::to_string))
        })
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>, ParamError> {
        self.required(key, self.opt_strings(key))
    }

    /// List of int lists (reel strips, patterns)
    pub fn opt_int_lists(&self, key: &str) -> Result<Option<Vec<Vec<i64>>>, ParamError> {
        self.typed(key, "list of int lists", |v| {
            as_list(v, |i| as_list(i, as_int))
        })
    }

    pub fn int_lists(&self, key: &str) -> Result<Vec<Vec<i64>>, ParamError> {
        self.required(key, self.opt_int_lists(key))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NESTED BAGS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn opt_bag(&self, key: &str) -> Result<Option<Params>, ParamError> {
        self.typed(key, "bag", as_bag)
    }

    pub fn bag(&self, key: &str) -> Result<Params, ParamError> {
        self.required(key, self.opt_bag(key))
    }

    pub fn opt_bags(&self, key: &str) -> Result<Option<Vec<Params>>, ParamError> {
        self.typed(key, "list of bags", |v| as_list(v, as_bag))
    }

    pub fn bags(&self, key: &str) -> Result<Vec<Params>, ParamError> {
        self.required(key, self.opt_bags(key))
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        Value::Object(params.0)
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Params {
        Params::from_value(value).unwrap()
    }

    #[test]
    fn test_typed_access() {
        let p = bag(json!({
            "TileId": 7,
            "Multiplier": 2.5,
            "Whole": 3,
            "Collate": true,
            "Name": "base",
            "Positions": [0, 1, 2],
            "Reels": [[1, 2], [3]],
            "Nested": {"A": 1},
            "Sets": [{"Weight": 1}, {"Weight": 2}]
        }));

        assert_eq!(p.int("TileId").unwrap(), 7);
        assert_eq!(p.symbol("TileId").unwrap(), 7);
        assert_eq!(p.float("Multiplier").unwrap(), 2.5);
        assert_eq!(p.float("Whole").unwrap(), 3.0);
        assert!(p.bool("Collate").unwrap());
        assert_eq!(p.string("Name").unwrap(), "base");
        assert_eq!(p.positions("Positions").unwrap(), vec![0, 1, 2]);
        assert_eq!(p.int_lists("Reels").unwrap(), vec![vec![1, 2], vec![3]]);
        assert_eq!(p.bag("Nested").unwrap().int("A").unwrap(), 1);
        assert_eq!(p.bags("Sets").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_key_is_error() {
        let p = Params::new();
        assert!(matches!(p.int("TileId"), Err(ParamError::Missing(k)) if k == "TileId"));
        assert_eq!(p.opt_int("TileId").unwrap(), None);
    }

    #[test]
    fn test_mismatch_is_error_even_when_optional() {
        let p = bag(json!({"TileId": "seven", "Positions": [0, -1]}));
        let err = p.opt_int("TileId").unwrap_err();
        assert!(matches!(&err, ParamError::Mismatch { key, expected: "int", .. } if key == "TileId"));
        assert!(err.to_string().contains("\"seven\""));
        assert!(p.positions("Positions").is_err());
    }

    #[test]
    fn test_float_is_not_an_int() {
        let p = bag(json!({"Count": 2.5}));
        assert!(p.int("Count").is_err());
        assert!(p.uint("Count").is_err());
    }

    #[test]
    fn test_overlay_caller_wins() {
        let defaults = bag(json!({"TileId": 7, "W": 3}));
        let caller = bag(json!({"TileId": 9, "Collate": false}));
        let merged = Params::overlay(&defaults, &caller);

        assert_eq!(merged.int("TileId").unwrap(), 9);
        assert_eq!(merged.int("W").unwrap(), 3);
        assert!(merged.contains("Collate"));
        // inputs untouched
        assert_eq!(defaults.int("TileId").unwrap(), 7);
        assert_eq!(caller.len(), 2);
    }

    #[test]
    fn test_remove_where() {
        let mut p = bag(json!({"ForceStops": [1], "ForceSeed": 3, "TileId": 1}));
        let mut dropped = p.remove_where(|k| k.starts_with(FORCE_PREFIX));
        dropped.sort();
        assert_eq!(dropped, vec!["ForceSeed", "ForceStops"]);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_collate_flag() {
        assert!(!Params::new().is_collate().unwrap());
        assert!(Params::new().with(COLLATE, true).is_collate().unwrap());
        assert!(Params::new().with(COLLATE, 1).is_collate().is_err());
    }
}
