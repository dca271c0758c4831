//! Caller-supplied named parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker prefix callers may keep on parameter names (`@EQP_NO`).
pub const PARAMETER_MARKER: char = '@';

/// A name → JSON value map, matched case-insensitively.
///
/// Names may carry the `@` marker prefix; it is ignored on lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBag {
    values: Map<String, Value>,
}

fn bare(name: &str) -> &str {
    name.strip_prefix(PARAMETER_MARKER).unwrap_or(name)
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Any existing key that differs only by case
    /// or marker is replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let existing = self
            .values
            .keys()
            .find(|k| bare(k).eq_ignore_ascii_case(bare(&name)))
            .cloned();
        if let Some(key) = existing {
            self.values.remove(&key);
        }
        self.values.insert(name, value.into());
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a value by name, ignoring case and the `@` marker.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let wanted = bare(name);
        self.values
            .iter()
            .find(|(k, _)| bare(k).eq_ignore_ascii_case(wanted))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for ParameterBag {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_ignores_case_and_marker() {
        let bag: ParameterBag = [("@EQP_NO", json!("E-01")), ("qty", json!(3))]
            .into_iter()
            .collect();
        assert_eq!(bag.get("eqp_no"), Some(&json!("E-01")));
        assert_eq!(bag.get("@QTY"), Some(&json!(3)));
        assert!(!bag.contains("lot"));
    }

    #[test]
    fn insert_replaces_case_variants() {
        let bag = ParameterBag::new().with("Lot", "A").with("@LOT", "B");
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get("lot"), Some(&json!("B")));
    }

    #[test]
    fn deserializes_from_object() {
        let bag: ParameterBag = serde_json::from_value(json!({"EQP_NO": "E-01"})).unwrap();
        assert!(bag.contains("@eqp_no"));
    }
}
