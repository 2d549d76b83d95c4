use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::clamp_count;
use crate::domain::{CounterEntry, TrackedField};

/// In-memory mirror of the ledger, grouped by field.
///
/// Every tracked field always has a (possibly empty) map, so readers can index
/// without checking. The store stays the authority; this copy may lag behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projection {
    values: BTreeMap<TrackedField, BTreeMap<String, u64>>,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            values: TrackedField::ALL
                .iter()
                .map(|f| (*f, BTreeMap::new()))
                .collect(),
        }
    }
}

impl Projection {
    pub fn from_entries(entries: &[CounterEntry]) -> Self {
        let mut projection = Self::default();
        for entry in entries.iter().filter(|e| e.count > 0) {
            projection
                .values
                .entry(entry.field)
                .or_default()
                .insert(entry.value.clone(), entry.count);
        }
        projection
    }

    /// Apply `delta` locally with the same delete-at-zero rule as the store.
    pub fn apply(&mut self, field: TrackedField, value: &str, delta: i64) {
        let values = self.values.entry(field).or_default();
        let current = values.get(value).copied().map(clamp_count).unwrap_or(0);
        let next = current.saturating_add(delta);
        if next <= 0 {
            values.remove(value);
        } else {
            values.insert(value.to_string(), next as u64);
        }
    }

    pub fn get(&self, field: TrackedField, value: &str) -> Option<u64> {
        self.values.get(&field).and_then(|v| v.get(value)).copied()
    }

    pub fn field(&self, field: TrackedField) -> &BTreeMap<String, u64> {
        // Every field is seeded in `default`, `apply` never removes a field map.
        static EMPTY: BTreeMap<String, u64> = BTreeMap::new();
        self.values.get(&field).unwrap_or(&EMPTY)
    }

    /// Number of distinct values per field, for dashboards.
    pub fn counts(&self) -> BTreeMap<TrackedField, usize> {
        self.values.iter().map(|(f, v)| (*f, v.len())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackedField, &BTreeMap<String, u64>)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_every_field() {
        let p = Projection::default();
        for field in TrackedField::ALL {
            assert!(p.field(field).is_empty());
        }
        assert_eq!(p.counts().len(), TrackedField::ALL.len());
    }

    #[test]
    fn test_apply_deletes_at_zero() {
        let mut p = Projection::default();
        p.apply(TrackedField::Tags, "x", 2);
        assert_eq!(p.get(TrackedField::Tags, "x"), Some(2));
        p.apply(TrackedField::Tags, "x", -2);
        assert_eq!(p.get(TrackedField::Tags, "x"), None);
    }

    #[test]
    fn test_apply_negative_on_absent_is_noop() {
        let mut p = Projection::default();
        p.apply(TrackedField::Model, "X100", -1);
        assert!(p.field(TrackedField::Model).is_empty());
    }

    #[test]
    fn test_apply_saturates_instead_of_overflowing() {
        let mut projection = Projection::default();
        projection.apply(TrackedField::Model, "X100", i64::MAX);
        projection.apply(TrackedField::Model, "X100", i64::MAX);
        assert_eq!(projection.get(TrackedField::Model, "X100"), Some(i64::MAX as u64));
        projection.apply(TrackedField::Model, "X100", i64::MIN);
        assert_eq!(projection.get(TrackedField::Model, "X100"), None);
    }

    #[test]
    fn test_serializes_as_nested_map() {
        let p = Projection::from_entries(&[CounterEntry {
            field: TrackedField::Year,
            value: "2024".to_string(),
            count: 3,
        }]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["year"]["2024"], 3);
        assert!(json["tags"].as_object().unwrap().is_empty());
    }
}
