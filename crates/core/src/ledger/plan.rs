use std::fmt;

use crate::domain::{Photo, TrackedField};

/// Fields a caller plans deltas for. `nick` follows `email` through the cascade.
pub const PLANNED_FIELDS: [TrackedField; 6] = [
    TrackedField::Year,
    TrackedField::Month,
    TrackedField::Tags,
    TrackedField::Model,
    TrackedField::Lens,
    TrackedField::Email,
];

/// One `update_counter` call of a compound change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterStep {
    pub field: TrackedField,
    pub value: String,
    pub delta: i64,
}

impl fmt::Display for CounterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({:+})", self.field, self.value, self.delta)
    }
}

/// Ordered counter steps for one record change. Applied one at a time, with no
/// atomicity across steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterPlan {
    steps: Vec<CounterStep>,
}

impl CounterPlan {
    pub fn for_create(photo: &Photo) -> Self {
        Self::for_edit(&Photo::default(), photo)
    }

    pub fn for_delete(photo: &Photo) -> Self {
        Self::for_edit(photo, &Photo::default())
    }

    pub fn for_edit(old: &Photo, new: &Photo) -> Self {
        let mut plan = Self::default();
        for field in PLANNED_FIELDS {
            let before = old.values_for(field);
            let after = new.values_for(field);
            if field.is_set_valued() {
                for value in before.iter().filter(|v| !after.contains(v)) {
                    plan.push(field, value, -1);
                }
                for value in after.iter().filter(|v| !before.contains(v)) {
                    plan.push(field, value, 1);
                }
            } else if before != after {
                for value in &before {
                    plan.push(field, value, -1);
                }
                for value in &after {
                    plan.push(field, value, 1);
                }
            }
        }
        plan
    }

    /// Plan for replacing only the tag set of a record.
    pub fn for_tags(old: &[String], new: &[String]) -> Self {
        let before = Photo {
            tags: old.to_vec(),
            ..Default::default()
        };
        let after = Photo {
            tags: new.to_vec(),
            ..Default::default()
        };
        Self::for_edit(&before, &after)
    }

    fn push(&mut self, field: TrackedField, value: &str, delta: i64) {
        self.steps.push(CounterStep {
            field,
            value: value.to_string(),
            delta,
        });
    }

    pub fn steps(&self) -> &[CounterStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fields that may have drifted if the plan stops before step `index`.
    /// Includes `nick` whenever `email` is among them.
    pub fn fields_from(&self, index: usize) -> Vec<TrackedField> {
        let mut fields: Vec<TrackedField> = Vec::new();
        for step in self.steps.iter().skip(index) {
            if !fields.contains(&step.field) {
                fields.push(step.field);
            }
        }
        if fields.contains(&TrackedField::Email) && !fields.contains(&TrackedField::Nick) {
            fields.push(TrackedField::Nick);
        }
        fields
    }
}
