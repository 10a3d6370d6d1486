//! Ordered mutation log: ingestion, grouping, and invariant validation.
//!
//! Both temporal models are built from a [`MutationLog`]. The log owns the
//! record vector sorted by timestamp and knows how to slice itself by time
//! window and group records by entity key.

use crate::error::{ChronographError, Result};
use crate::types::{Action, EntityKey, FOREVER, Interval, LogRecord, Timestamp};
use rustc_hash::FxHashMap;

/// An immutable, timestamp-ordered collection of [`LogRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct MutationLog {
    records: Vec<LogRecord>,
}

impl MutationLog {
    /// Build a log from records in any order. The sort is stable, so
    /// records sharing a timestamp keep their input order.
    pub fn from_records(mut records: Vec<LogRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Timestamp of the earliest record.
    pub fn min_timestamp(&self) -> Option<Timestamp> {
        self.records.first().map(|r| r.timestamp)
    }

    /// Timestamp of the latest record.
    pub fn max_timestamp(&self) -> Option<Timestamp> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Records with `timestamp` inside the half-open `window`.
    pub fn slice(&self, window: &Interval) -> &[LogRecord] {
        let lo = self.records.partition_point(|r| r.timestamp < window.start);
        let hi = self.records.partition_point(|r| r.timestamp < window.stop);
        &self.records[lo..hi]
    }

    /// Records with `low < timestamp <= high`, the replay suffix between a
    /// snapshot instant and a query instant.
    pub fn suffix(&self, low: Timestamp, high: Timestamp) -> &[LogRecord] {
        let lo = self.records.partition_point(|r| r.timestamp <= low);
        let hi = self.records.partition_point(|r| r.timestamp <= high);
        &self.records[lo..hi]
    }

    /// Group a run of records by entity key, preserving order within each
    /// run. A key-based shuffle; grouping never reorders a run.
    pub fn group_by_entity<'a>(
        records: impl IntoIterator<Item = &'a LogRecord>,
    ) -> FxHashMap<EntityKey, Vec<&'a LogRecord>> {
        let mut groups: FxHashMap<EntityKey, Vec<&LogRecord>> = FxHashMap::default();
        for record in records {
            groups.entry(record.entity.key()).or_default().push(record);
        }
        groups
    }

    /// Check the per-entity action-sequence invariant over the whole log:
    /// each run is CREATE, zero or more UPDATE, optionally one trailing
    /// DELETE. Re-creation after deletion is also accepted (the entity
    /// lives again); what is rejected is any action before the first
    /// CREATE or after a DELETE other than a new CREATE.
    ///
    /// Records stamped at [`FOREVER`] are also rejected: under the
    /// half-open convention a record at the unbounded-future sentinel can
    /// never become visible.
    pub fn validate(&self) -> Result<()> {
        if let Some(record) = self.records.iter().find(|r| r.timestamp == FOREVER) {
            let (kind, id) = record.entity.key();
            return Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!(
                    "{:?} stamped at the unbounded-future sentinel",
                    record.action
                ),
            });
        }

        let groups = Self::group_by_entity(&self.records);
        for ((kind, id), run) in &groups {
            let mut alive = false;
            for record in run {
                match (alive, record.action) {
                    (false, Action::Create) => alive = true,
                    (false, action) => {
                        return Err(ChronographError::InconsistentLogSequence {
                            kind: *kind,
                            id: *id,
                            detail: format!(
                                "{:?} at t={} before any CREATE",
                                action, record.timestamp
                            ),
                        });
                    }
                    (true, Action::Create) => {
                        return Err(ChronographError::InconsistentLogSequence {
                            kind: *kind,
                            id: *id,
                            detail: format!(
                                "CREATE at t={} over a live entity",
                                record.timestamp
                            ),
                        });
                    }
                    (true, Action::Update) => {}
                    (true, Action::Delete) => alive = false,
                }
            }
        }
        log::debug!(
            "validated log: {} records across {} entities",
            self.records.len(),
            groups.len()
        );
        Ok(())
    }
}
