//! Error types for chronograph.

use crate::types::{EntityKind, Timestamp};
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChronographError>;

/// All failure modes surfaced by model construction and queries.
///
/// Every variant reflects a violated data invariant, never a transient
/// fault, so callers should report and halt rather than retry.
#[derive(Debug, Error)]
pub enum ChronographError {
    /// An operation received a vertex where an edge is structurally
    /// required.
    #[error("invalid entity kind: expected {expected:?}, found {found:?} (id {id})")]
    InvalidEntityKind {
        expected: EntityKind,
        found: EntityKind,
        id: u64,
    },

    /// The log violates the per-entity action-sequence invariant
    /// (CREATE, zero or more UPDATE, optional trailing DELETE).
    #[error("inconsistent log sequence for {kind:?} {id}: {detail}")]
    InconsistentLogSequence {
        kind: EntityKind,
        id: u64,
        detail: String,
    },

    /// An edge's squashed run is neither `[CREATE]` nor `[CREATE, DELETE]`.
    #[error("ambiguous neighbour shape for edge {edge}: squashed run is {shape}")]
    AmbiguousNeighbourShape { edge: u64, shape: String },

    /// A query window with `start >= stop` selects nothing and is
    /// almost certainly caller error.
    #[error("empty query interval [{start}, {stop})")]
    EmptyInterval { start: Timestamp, stop: Timestamp },

    /// Configuration rejected by [`Config::validate`](crate::types::Config::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_offender() {
        let err = ChronographError::AmbiguousNeighbourShape {
            edge: 7,
            shape: "[Delete, Create]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("edge 7"));
        assert!(msg.contains("[Delete, Create]"));
    }

    #[test]
    fn test_inconsistent_sequence_reports_entity() {
        let err = ChronographError::InconsistentLogSequence {
            kind: EntityKind::Vertex,
            id: 42,
            detail: "CREATE over a live entity".to_string(),
        };
        assert!(err.to_string().contains("42"));
    }
}
