//! Temporal models and the common query contract they implement.
//!
//! Two competing materialization strategies answer the same queries over
//! one mutation log:
//!
//! - [`ValidityModel`] stamps every entity version with its own valid-time
//!   window and answers by interval containment.
//! - [`SnapshotDeltaModel`] stores periodic full materializations and
//!   replays only the log suffix past the nearest prior snapshot.
//!
//! Both are built once from an immutable log and are read-only afterwards,
//! so queries are freely concurrent and idempotent.

use crate::error::Result;
use crate::types::{Attributes, EdgeId, Entity, Interval, Snapshot, Timestamp, VertexId};
use rustc_hash::FxHashSet;

mod snapshot_delta;
mod validity;

pub use snapshot_delta::SnapshotDeltaModel;
pub use validity::{EntityVersion, ValidityModel};

/// The query contract shared by both temporal models.
pub trait TemporalModel {
    /// State of one entity at `instant`, or `None` if it did not exist.
    fn entity_at(&self, entity: &Entity, instant: Timestamp)
    -> Result<Option<(Entity, Attributes)>>;

    /// Fully materialized graph state at `instant`.
    fn snapshot_at(&self, instant: Timestamp) -> Result<Snapshot>;

    /// Vertices whose creation falls inside `window`.
    ///
    /// The two models intentionally diverge here: [`ValidityModel`] reports
    /// strict first-ever creations, [`SnapshotDeltaModel`] reports net
    /// creations within the window.
    fn activated_vertices(&self, window: &Interval) -> Result<FxHashSet<VertexId>>;

    /// Edges whose creation falls inside `window`. Same divergence as
    /// [`TemporalModel::activated_vertices`].
    fn activated_edges(&self, window: &Interval) -> Result<FxHashSet<EdgeId>>;

    /// Distinct vertices connected to `vertex` by an edge whose existence
    /// overlaps `window`.
    fn direct_neighbours(&self, vertex: VertexId, window: &Interval)
    -> Result<FxHashSet<VertexId>>;
}

/// Reject degenerate query windows up front.
pub(crate) fn check_window(window: &Interval) -> Result<()> {
    if window.is_empty() {
        return Err(crate::error::ChronographError::EmptyInterval {
            start: window.start,
            stop: window.stop,
        });
    }
    Ok(())
}
