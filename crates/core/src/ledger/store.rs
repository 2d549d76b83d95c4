use crate::domain::{CounterEntry, Photo, TrackedField};
use crate::error::Result;

use super::key::CounterKey;

/// What a read-modify-write decided to do with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWrite {
    /// Entry was absent and is created with this count.
    Create(u64),
    /// Entry exists and now holds this count.
    Update(u64),
    /// Entry reached zero and is removed.
    Delete,
    /// Nothing to write.
    Noop,
}

/// One write of a reconciliation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterOp {
    Put(CounterEntry),
    Delete(CounterKey),
}

/// Storage the ledger runs against.
///
/// Implementations must run `transact_counter` as a single read-modify-write
/// transaction on one entry, and `write_counters` as one all-or-nothing batch.
pub trait LedgerStore {
    /// Read the current count of `key`, let `decide` choose the write, apply it,
    /// commit. Returns the decision that was committed.
    fn transact_counter(
        &mut self,
        key: &CounterKey,
        decide: &dyn Fn(Option<u64>) -> CounterWrite,
    ) -> Result<CounterWrite>;

    fn write_counters(&mut self, ops: &[CounterOp]) -> Result<()>;

    /// All live records.
    fn scan_records(&self) -> Result<Vec<Photo>>;

    fn load_counters(&self) -> Result<Vec<CounterEntry>>;

    fn counters_for_field(&self, field: TrackedField) -> Result<Vec<CounterEntry>>;

    fn get_counter(&self, key: &CounterKey) -> Result<Option<CounterEntry>>;

    fn put_counter(&mut self, entry: &CounterEntry) -> Result<()>;

    /// Returns whether an entry was removed.
    fn delete_counter(&mut self, key: &CounterKey) -> Result<bool>;
}
