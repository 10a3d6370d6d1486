//! Merge/squash algebra: collapse an ordered per-entity run into one net
//! record, so a query needs only the net effect of a sub-range instead of
//! a full replay.

use crate::error::{ChronographError, Result};
use crate::types::{Action, LogRecord, merge_attributes};

/// Merge two consecutive records of the same entity, `prev` older than
/// `next`. Not commutative; always apply left-to-right in timestamp order.
///
/// | prev   | next   | result                                   |
/// |--------|--------|------------------------------------------|
/// | UPDATE | DELETE | next                                     |
/// | CREATE | DELETE | next                                     |
/// | UPDATE | UPDATE | next, attributes merged (next dominant)  |
/// | CREATE | UPDATE | prev, attributes merged (next dominant)  |
/// | DELETE | UPDATE | prev, only at the same timestamp (no-op) |
///
/// Any other pair violates the log invariant.
pub fn merge(prev: LogRecord, next: &LogRecord) -> Result<LogRecord> {
    debug_assert_eq!(prev.entity.key(), next.entity.key());
    match (prev.action, next.action) {
        (Action::Update | Action::Create, Action::Delete) => Ok(next.clone()),
        (Action::Update, Action::Update) => {
            let attributes = merge_attributes(&prev.attributes, &next.attributes);
            Ok(LogRecord {
                attributes,
                ..next.clone()
            })
        }
        (Action::Create, Action::Update) => {
            let attributes = merge_attributes(&prev.attributes, &next.attributes);
            Ok(LogRecord { attributes, ..prev })
        }
        (Action::Delete, Action::Update) if prev.timestamp == next.timestamp => Ok(prev),
        (prev_action, next_action) => {
            let (kind, id) = next.entity.key();
            Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!(
                    "cannot merge {:?} at t={} into {:?} at t={}",
                    next_action, next.timestamp, prev_action, prev.timestamp
                ),
            })
        }
    }
}

/// Reduce an ordered run of records sharing one entity key to a single net
/// record. Returns `None` for an empty run.
pub fn squash(run: &[LogRecord]) -> Result<Option<LogRecord>> {
    let mut iter = run.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut acc = first.clone();
    for record in iter {
        acc = merge(acc, record)?;
    }
    Ok(Some(acc))
}
