//! Counter ledger: per-(field, value) occurrence counts kept in step with the
//! photo records.
//!
//! Each `update_counter` is one read-modify-write transaction on one entry, so
//! writers touching different values never conflict. A compound record change is
//! a [`CounterPlan`] of such calls with no atomicity across them; a failure part
//! way leaves the ledger drifted until [`Ledger::recompute_field`] repairs it.

pub mod cascade;
pub mod key;
pub mod plan;
pub mod projection;
pub mod store;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::{CounterEntry, TrackedField};
use crate::error::{Error, Result};

pub use cascade::{default_rules, CascadeRule, FamilyMap, NickFromEmail};
pub use key::{counter_id, CounterKey, DELIM, RECORD_KIND};
pub use plan::{CounterPlan, CounterStep};
pub use projection::Projection;
pub use store::{CounterOp, CounterWrite, LedgerStore};

/// Cascades deeper than this are cut off; a rule chain that long is a cycle.
const MAX_CASCADE_DEPTH: usize = 4;

/// Outcome of reconciling one field against the record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub field: Option<TrackedField>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Decide the write for `delta` against the current stored count.
/// Never produces a zero or negative entry; counts saturate at `i64::MAX`,
/// the largest value the store can hold.
pub fn resolve_delta(current: Option<u64>, delta: i64) -> CounterWrite {
    match current {
        None if delta > 0 => CounterWrite::Create(delta as u64),
        None => CounterWrite::Noop,
        Some(count) => {
            let next = clamp_count(count).saturating_add(delta);
            if next <= 0 {
                CounterWrite::Delete
            } else {
                CounterWrite::Update(next as u64)
            }
        }
    }
}

pub(crate) fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Compute the batch that brings `existing` entries of `field` in line with
/// `truth` (value -> true count).
pub fn diff_field(
    field: TrackedField,
    mut truth: BTreeMap<String, u64>,
    existing: &[CounterEntry],
) -> (Vec<CounterOp>, ReconcileReport) {
    let mut ops = Vec::new();
    let mut report = ReconcileReport {
        field: Some(field),
        ..Default::default()
    };

    for entry in existing {
        match truth.remove(&entry.value) {
            Some(count) if count == entry.count => report.unchanged += 1,
            Some(count) => {
                ops.push(CounterOp::Put(CounterEntry {
                    field,
                    value: entry.value.clone(),
                    count,
                }));
                report.updated += 1;
            }
            None => {
                ops.push(CounterOp::Delete(CounterKey::new(field, entry.value.clone())));
                report.deleted += 1;
            }
        }
    }

    for (value, count) in truth {
        ops.push(CounterOp::Put(CounterEntry { field, value, count }));
        report.created += 1;
    }

    (ops, report)
}

/// Service object owning the in-memory projection and the cascade rules.
/// Every operation runs against the store it is handed.
pub struct Ledger {
    projection: Projection,
    rules: Vec<Box<dyn CascadeRule>>,
}

impl Ledger {
    pub fn new(rules: Vec<Box<dyn CascadeRule>>) -> Self {
        Self {
            projection: Projection::default(),
            rules,
        }
    }

    pub fn with_family(family: FamilyMap) -> Self {
        Self::new(default_rules(family))
    }

    pub fn set_rules(&mut self, rules: Vec<Box<dyn CascadeRule>>) {
        self.rules = rules;
    }

    /// Load the projection from the store. Call once before serving reads.
    pub fn init<S: LedgerStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        self.load_ledger(store).map(|_| ())
    }

    pub fn refresh<S: LedgerStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        self.load_ledger(store).map(|_| ())
    }

    /// Replace the projection with every stored entry. Returns the entry count.
    pub fn load_ledger<S: LedgerStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        let entries = store.load_counters()?;
        self.projection = Projection::from_entries(&entries);
        debug!(entries = entries.len(), "ledger loaded");
        Ok(entries.len())
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn counts(&self) -> BTreeMap<TrackedField, usize> {
        self.projection.counts()
    }

    /// Apply one occurrence delta to `(field, value)`, then run the cascade rules
    /// triggered by `field`.
    ///
    /// Empty values and zero deltas are no-ops that never reach the store. On a
    /// store failure the projection is left untouched and the error returned.
    pub fn update_counter<S: LedgerStore + ?Sized>(
        &mut self,
        store: &mut S,
        field: TrackedField,
        value: &str,
        delta: i64,
    ) -> Result<CounterWrite> {
        self.update_at_depth(store, field, value, delta, 0)
    }

    fn update_at_depth<S: LedgerStore + ?Sized>(
        &mut self,
        store: &mut S,
        field: TrackedField,
        value: &str,
        delta: i64,
        depth: usize,
    ) -> Result<CounterWrite> {
        if value.is_empty() || delta == 0 {
            return Ok(CounterWrite::Noop);
        }

        let key = CounterKey::new(field, value);
        let write = store.transact_counter(&key, &|current| resolve_delta(current, delta))?;
        debug!(%key, delta, ?write, "counter committed");
        self.projection.apply(field, value, delta);

        let derived: Vec<(TrackedField, String)> = self
            .rules
            .iter()
            .filter(|rule| rule.trigger() == field)
            .filter_map(|rule| rule.derive(value))
            .collect();
        for (target, target_value) in derived {
            if depth + 1 > MAX_CASCADE_DEPTH {
                warn!(%key, %target, "cascade depth exceeded, skipping");
                continue;
            }
            self.update_at_depth(store, target, &target_value, delta, depth + 1)?;
        }

        Ok(write)
    }

    /// Run every step of `plan` in order. Stops at the first failure with
    /// [`Error::PartialUpdate`] naming the fields to reconcile.
    pub fn apply_plan<S: LedgerStore + ?Sized>(
        &mut self,
        store: &mut S,
        plan: &CounterPlan,
    ) -> Result<usize> {
        for (index, step) in plan.steps().iter().enumerate() {
            if let Err(err) = self.update_counter(store, step.field, &step.value, step.delta) {
                let stale_fields = plan.fields_from(index);
                warn!(
                    step = %step,
                    completed = index,
                    total = plan.len(),
                    ?stale_fields,
                    "counter plan interrupted"
                );
                return Err(Error::PartialUpdate {
                    completed: index,
                    total: plan.len(),
                    step: step.to_string(),
                    stale_fields,
                    source: Box::new(err),
                });
            }
        }
        Ok(plan.len())
    }

    /// Recompute every entry of `field` from the records and write the
    /// difference as one batch, then reload the projection.
    pub fn recompute_field<S: LedgerStore + ?Sized>(
        &mut self,
        store: &mut S,
        field: TrackedField,
    ) -> Result<ReconcileReport> {
        let records = store.scan_records()?;
        let mut truth: BTreeMap<String, u64> = BTreeMap::new();
        for record in &records {
            for value in record.values_for(field) {
                *truth.entry(value).or_insert(0) += 1;
            }
        }

        let existing = store.counters_for_field(field)?;
        let (ops, report) = diff_field(field, truth, &existing);
        if !ops.is_empty() {
            store.write_counters(&ops)?;
        }
        self.load_ledger(store)?;

        info!(
            field = %field,
            records = records.len(),
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            "counters recomputed"
        );
        Ok(report)
    }

    /// Compensation for an interrupted plan: recompute each field in turn.
    pub fn reconcile<S: LedgerStore + ?Sized>(
        &mut self,
        store: &mut S,
        fields: &[TrackedField],
    ) -> Result<Vec<ReconcileReport>> {
        fields
            .iter()
            .map(|field| self.recompute_field(store, *field))
            .collect()
    }
}
