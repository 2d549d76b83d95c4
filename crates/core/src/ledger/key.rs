use std::fmt;

use tracing::warn;

use crate::domain::TrackedField;

/// Record kind prefixed to every counter id.
pub const RECORD_KIND: &str = "Photo";

/// Separator between the parts of a counter id. Not escaped in values, so an id
/// cannot be split back into its parts; field names never contain it, which
/// keeps ids of distinct (field, value) pairs distinct.
pub const DELIM: &str = "||";

/// Composite key of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub field: TrackedField,
    pub value: String,
}

impl CounterKey {
    pub fn new(field: TrackedField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Stored identifier, `Photo||<field>||<value>`.
    pub fn id(&self) -> String {
        counter_id(self.field, &self.value)
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

pub fn counter_id(field: TrackedField, value: &str) -> String {
    if value.contains(DELIM) {
        warn!(field = %field, value, "counter value contains the id delimiter");
    }
    format!("{RECORD_KIND}{DELIM}{}{DELIM}{value}", field.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_id_format() {
        assert_eq!(counter_id(TrackedField::Tags, "beach"), "Photo||tags||beach");
        assert_eq!(
            CounterKey::new(TrackedField::Year, "2024").id(),
            "Photo||year||2024"
        );
    }

    #[test]
    fn test_delimiter_in_value_is_not_escaped() {
        let id = counter_id(TrackedField::Tags, "a||b");
        assert_eq!(id, "Photo||tags||a||b");

        // Splitting on the delimiter no longer yields (kind, field, value).
        let parts: Vec<&str> = id.split(DELIM).collect();
        assert_eq!(parts, ["Photo", "tags", "a", "b"]);

        // The first two separators still delimit kind and field.
        let rest = id.splitn(3, DELIM).nth(2);
        assert_eq!(rest, Some("a||b"));
    }

    #[test]
    fn test_distinct_pairs_have_distinct_ids() {
        let values = ["a", "a||b", "b", "||", "tags||a"];
        let mut ids = std::collections::HashSet::new();
        for field in TrackedField::ALL {
            for value in values {
                assert!(ids.insert(counter_id(field, value)), "{field} {value}");
            }
        }
    }
}
