use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::utils::CCStr;

/// Named request parameters of a load
pub type Params = Map<String, Value>;

/// Projection of the request parameters on the `index_by` fields of a loader
///
/// Two requests sharing a fingerprint are answered by the same cached entities.
/// A loader without index fields always produces the empty fingerprint, which
/// matches every entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint(Params);

impl Fingerprint {
    /// Picks the `index_by` fields out of `params`, missing fields projecting to `null`
    pub fn project(params: &Params, index_by: &[CCStr]) -> Self {
        Self(
            index_by
                .iter()
                .map(|field| {
                    let value = params.get(field.as_ref()).cloned().unwrap_or(Value::Null);
                    (field.to_string(), value)
                })
                .collect(),
        )
    }

    /// Whether every projected field of the fingerprint is equal in `entity`
    pub fn matches(&self, entity: &Value) -> bool {
        self.0.iter().all(|(field, expected)| {
            entity.get(field).unwrap_or(&Value::Null) == expected
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_params(&self) -> &Params {
        &self.0
    }
}

impl From<Params> for Fingerprint {
    fn from(value: Params) -> Self {
        Self(value)
    }
}

/// Canonical text form of params, used to recognize identical calls
pub(crate) fn canonical_params(params: &Params) -> String {
    let sorted: BTreeMap<&String, &Value> = params.iter().collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Merges `fetched` into `existing`, keeping one entity per `unique_identifier`
///
/// Fetched entities come first and win over existing ones sharing the same
/// identifier. Entities without the identifier field all share the same
/// "missing" identifier.
pub(crate) fn merge_unique(existing: Vec<Value>, fetched: &[Value], unique_identifier: &str) -> Vec<Value> {
    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(existing.len() + fetched.len());
    fetched
        .iter()
        .cloned()
        .chain(existing)
        .filter(|entity| seen.insert(entity.get(unique_identifier).map(Value::to_string)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn projection_keeps_only_index_fields() {
        let fp = Fingerprint::project(
            &params(json!({"group": "x", "page": 2})),
            &[CCStr::from("group")],
        );
        assert_eq!(fp.as_params(), &params(json!({"group": "x"})));
    }

    #[test]
    fn projection_of_missing_field_is_null() {
        let fp = Fingerprint::project(&Params::new(), &[CCStr::from("clusterId")]);
        assert_eq!(fp.get("clusterId"), Some(&Value::Null));
        assert!(fp.matches(&json!({"uuid": "n1"})));
        assert!(!fp.matches(&json!({"uuid": "n1", "clusterId": "a"})));
    }

    #[test]
    fn empty_fingerprint_matches_everything() {
        let fp = Fingerprint::project(&params(json!({"group": "x"})), &[]);
        assert!(fp.is_empty());
        assert!(fp.matches(&json!({"group": "y"})));
        assert!(fp.matches(&json!(42)));
    }

    #[test]
    fn matching_compares_every_index_field() {
        let fp = Fingerprint::project(
            &params(json!({"a": 1, "b": "z"})),
            &[CCStr::from("a"), CCStr::from("b")],
        );
        assert!(fp.matches(&json!({"id": 1, "a": 1, "b": "z"})));
        assert!(!fp.matches(&json!({"id": 1, "a": 1, "b": "y"})));
    }

    #[test]
    fn canonical_params_ignore_insertion_order() {
        let mut first = Params::new();
        first.insert("b".into(), json!(2));
        first.insert("a".into(), json!(1));
        let mut second = Params::new();
        second.insert("a".into(), json!(1));
        second.insert("b".into(), json!(2));
        assert_eq!(canonical_params(&first), canonical_params(&second));
    }

    #[test]
    fn merge_prefers_fetched_entities() {
        let existing = vec![json!({"id": 1, "v": "old"}), json!({"id": 2, "v": "old"})];
        let fetched = vec![json!({"id": 2, "v": "new"}), json!({"id": 3, "v": "new"})];
        let merged = merge_unique(existing, &fetched, "id");
        assert_eq!(
            merged,
            vec![
                json!({"id": 2, "v": "new"}),
                json!({"id": 3, "v": "new"}),
                json!({"id": 1, "v": "old"}),
            ]
        );
    }

    #[test]
    fn merge_collapses_entities_without_identifier() {
        let merged = merge_unique(vec![json!({"name": "a"})], &[json!({"name": "b"})], "id");
        assert_eq!(merged, vec![json!({"name": "b"})]);
    }
}
