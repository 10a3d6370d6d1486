//! Core types and configuration for chronograph.
//!
//! This module defines the entity/log data model shared by both temporal
//! models, plus the serializable `Config` used at construction time.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Abstract instant. Callers decide the unit (ticks, millis, ...).
pub type Timestamp = u64;

/// Sentinel for "never deleted": the far end of an unbounded validity window.
pub const FOREVER: Timestamp = u64::MAX;

/// Stable vertex identifier, unique among vertices.
pub type VertexId = u64;

/// Stable edge identifier, unique among edges.
pub type EdgeId = u64;

/// Attribute payload attached to an entity: string keys to string values.
pub type Attributes = BTreeMap<String, String>;

/// Merge `base` with `dominant`: key-wise override, dominant wins.
pub fn merge_attributes(base: &Attributes, dominant: &Attributes) -> Attributes {
    let mut merged = base.clone();
    for (key, value) in dominant {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Half-open time range `[start, stop)`.
///
/// This is the single interval convention used everywhere in the crate:
/// `contains(t)` holds iff `start <= t < stop`, and two intervals overlap
/// iff their half-open ranges intersect. The start instant is inside, the
/// stop instant is outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: Timestamp,
    pub stop: Timestamp,
}

impl Interval {
    /// Create an interval. Bounds are normalized so `start <= stop`.
    pub fn new(start: Timestamp, stop: Timestamp) -> Self {
        if start <= stop {
            Self { start, stop }
        } else {
            Self {
                start: stop,
                stop: start,
            }
        }
    }

    /// Interval reaching from `start` to the infinite future.
    pub fn since(start: Timestamp) -> Self {
        Self {
            start,
            stop: FOREVER,
        }
    }

    /// Whether `t` falls inside `[start, stop)`.
    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.stop
    }

    /// Whether two half-open ranges intersect.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// True when the interval selects nothing.
    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }
}

/// Discriminant for the two entity kinds. Vertex and edge id spaces are
/// independent, so grouping always keys on `(kind, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vertex,
    Edge,
}

/// Grouping key for per-entity log runs.
pub type EntityKey = (EntityKind, u64);

/// A graph entity: a vertex, or an edge with its two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Vertex(VertexId),
    Edge {
        id: EdgeId,
        src: VertexId,
        dst: VertexId,
    },
}

impl Entity {
    /// The id within the entity's own kind.
    pub fn id(&self) -> u64 {
        match self {
            Entity::Vertex(id) => *id,
            Entity::Edge { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Vertex(_) => EntityKind::Vertex,
            Entity::Edge { .. } => EntityKind::Edge,
        }
    }

    /// Grouping key: kind plus id.
    pub fn key(&self) -> EntityKey {
        (self.kind(), self.id())
    }

    /// The edge id and endpoints, failing when this is structurally not
    /// an edge.
    pub fn expect_edge(&self) -> crate::error::Result<(EdgeId, VertexId, VertexId)> {
        match self {
            Entity::Edge { id, src, dst } => Ok((*id, *src, *dst)),
            Entity::Vertex(id) => Err(crate::error::ChronographError::InvalidEntityKind {
                expected: EntityKind::Edge,
                found: EntityKind::Vertex,
                id: *id,
            }),
        }
    }

    /// Endpoints, if this is an edge.
    pub fn endpoints(&self) -> Option<(VertexId, VertexId)> {
        match self {
            Entity::Vertex(_) => None,
            Entity::Edge { src, dst, .. } => Some((*src, *dst)),
        }
    }

    /// For an edge incident to `vertex`, the opposite endpoint.
    pub fn other_endpoint(&self, vertex: VertexId) -> Option<VertexId> {
        match self.endpoints() {
            Some((src, dst)) if src == vertex => Some(dst),
            Some((src, dst)) if dst == vertex => Some(src),
            _ => None,
        }
    }
}

/// Mutation kind carried by a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// One timestamped mutation of one entity.
///
/// Per entity id, ordered by timestamp, a valid run is CREATE, zero or
/// more UPDATE, optionally a trailing DELETE. No other shape is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: Timestamp,
    pub action: Action,
    pub entity: Entity,
    #[serde(default)]
    pub attributes: Attributes,
}

impl LogRecord {
    pub fn new(timestamp: Timestamp, action: Action, entity: Entity) -> Self {
        Self {
            timestamp,
            action,
            entity,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Materialized state of one edge inside a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeState {
    pub src: VertexId,
    pub dst: VertexId,
    pub attributes: Attributes,
}

/// A fully materialized, immutable graph state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub vertices: BTreeMap<VertexId, Attributes>,
    pub edges: BTreeMap<EdgeId, EdgeState>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }
}

/// A graph state pinned to the instant it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub graph: Graph,
    pub instant: Timestamp,
}

/// Bucketing policy for the snapshot-delta model.
///
/// Finer granularity costs more storage and build time; coarser
/// granularity costs more replay per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotGranularity {
    /// Fixed wall-clock span per bucket, starting at the minimum timestamp.
    Time(u64),
    /// Fixed record count per bucket.
    Count(usize),
}

impl Default for SnapshotGranularity {
    fn default() -> Self {
        SnapshotGranularity::Count(Config::default_bucket_records())
    }
}

/// Model construction configuration.
///
/// Designed to be easily serializable and loadable from JSON or TOML
/// while keeping complexity minimal.
///
/// # Example
///
/// ```rust
/// use chronograph::{Config, SnapshotGranularity};
///
/// let config = Config::default();
///
/// let json = r#"{
///     "granularity": { "time": 3600 },
///     "warn_on_churn": false
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.granularity, SnapshotGranularity::Time(3600));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot bucketing policy for the snapshot-delta model.
    #[serde(default)]
    pub granularity: SnapshotGranularity,

    /// Emit a `log::warn!` when an entity is created and deleted entirely
    /// inside one bucket (invisible churn).
    #[serde(default = "Config::default_warn_on_churn")]
    pub warn_on_churn: bool,
}

impl Config {
    const fn default_bucket_records() -> usize {
        1024
    }

    const fn default_warn_on_churn() -> bool {
        true
    }

    pub fn with_granularity(mut self, granularity: SnapshotGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_warn_on_churn(mut self, warn: bool) -> Self {
        self.warn_on_churn = warn;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.granularity {
            SnapshotGranularity::Time(0) => {
                Err("Time granularity must be greater than zero".to_string())
            }
            SnapshotGranularity::Count(0) => {
                Err("Count granularity must be greater than zero".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a TOML string (requires `toml` feature).
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(serde::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a TOML string (requires `toml` feature).
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            granularity: SnapshotGranularity::default(),
            warn_on_churn: Self::default_warn_on_churn(),
        }
    }
}
