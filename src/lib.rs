//! Embedded temporal property-graph engine answering time-travel queries
//! over an ordered log of entity mutations.
//!
//! Two competing materialization strategies implement one query contract:
//! the [`ValidityModel`] stamps every entity version with its valid-time
//! window, while the [`SnapshotDeltaModel`] materializes periodic full
//! graph states and replays forward deltas.
//!
//! ```rust
//! use chronograph::prelude::*;
//!
//! let records = vec![
//!     LogRecord::new(10, Action::Create, Entity::Vertex(1)),
//!     LogRecord::new(30, Action::Delete, Entity::Vertex(1)),
//! ];
//!
//! let model = ModelBuilder::new().records(records).build_validity()?;
//! assert!(model.entity_at(&Entity::Vertex(1), 20)?.is_some());
//! assert!(model.entity_at(&Entity::Vertex(1), 30)?.is_none());
//! # Ok::<(), chronograph::ChronographError>(())
//! ```

pub mod builder;
pub mod error;
pub mod log;
pub mod model;
pub mod squash;
pub mod types;

pub use builder::ModelBuilder;
pub use error::{ChronographError, Result};
pub use self::log::MutationLog;
pub use model::{EntityVersion, SnapshotDeltaModel, TemporalModel, ValidityModel};
pub use squash::{merge, squash};
pub use types::{
    Action, Attributes, Config, EdgeId, EdgeState, Entity, EntityKey, EntityKind, FOREVER, Graph,
    Interval, LogRecord, Snapshot, SnapshotGranularity, Timestamp, VertexId, merge_attributes,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ChronographError, ModelBuilder, MutationLog, Result};

    pub use crate::{SnapshotDeltaModel, TemporalModel, ValidityModel};

    pub use crate::{Action, Config, Entity, Interval, LogRecord, SnapshotGranularity};

    pub use crate::{Attributes, Graph, Snapshot, Timestamp};
}
