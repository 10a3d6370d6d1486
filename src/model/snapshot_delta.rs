//! Periodic-snapshot-plus-forward-delta temporal model.
//!
//! The log is partitioned into consecutive buckets (by wall-clock span or
//! record count) and a full graph state is materialized at the end of each
//! bucket by squashing the bucket per entity and combining it with the
//! previous state. Queries locate the nearest prior snapshot and replay
//! only the remaining log suffix; snapshots are never applied backwards.

use crate::error::{ChronographError, Result};
use crate::log::MutationLog;
use crate::model::{TemporalModel, check_window};
use crate::squash::squash;
use crate::types::{
    Action, Attributes, Config, EdgeId, EdgeState, Entity, EntityKey, EntityKind, Graph, Interval,
    LogRecord, Snapshot, SnapshotGranularity, Timestamp, VertexId, merge_attributes,
};
use rustc_hash::FxHashSet;

/// Temporal model backed by an ordered sequence of materialized snapshots
/// (strictly increasing instants) plus the full log for delta replay.
///
/// Granularity is the space/time trade-off knob: finer buckets cost more
/// storage and build time, coarser buckets cost more replay per query.
#[derive(Debug, Clone)]
pub struct SnapshotDeltaModel {
    snapshots: Vec<Snapshot>,
    log: MutationLog,
    granularity: SnapshotGranularity,
    warn_on_churn: bool,
}

impl SnapshotDeltaModel {
    /// Build the snapshot sequence with the default configuration.
    pub fn build(log: MutationLog) -> Result<Self> {
        Self::build_with_config(log, &Config::default())
    }

    /// Build the snapshot sequence. Buckets are folded strictly in order
    /// from the empty graph; a snapshot's instant is the timestamp of the
    /// last record it has applied, so the state at `instant` covers every
    /// record with `timestamp <= instant`. Empty buckets emit no snapshot.
    pub fn build_with_config(log: MutationLog, config: &Config) -> Result<Self> {
        config.validate().map_err(ChronographError::InvalidConfig)?;
        log.validate()?;

        let mut snapshots = Vec::new();
        let mut state = Graph::new();
        for bucket in Self::buckets(&log, config.granularity) {
            if bucket.is_empty() {
                continue;
            }
            Self::apply_delta(&mut state, bucket, config.warn_on_churn)?;
            let instant = bucket[bucket.len() - 1].timestamp;
            snapshots.push(Snapshot {
                graph: state.clone(),
                instant,
            });
        }

        log::debug!(
            "snapshot-delta model built: {} snapshots over {} records ({:?})",
            snapshots.len(),
            log.len(),
            config.granularity
        );

        Ok(Self {
            snapshots,
            log,
            granularity: config.granularity,
            warn_on_churn: config.warn_on_churn,
        })
    }

    /// The stored snapshot sequence, ascending by instant.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn granularity(&self) -> SnapshotGranularity {
        self.granularity
    }

    /// Partition the ordered log into consecutive buckets starting at the
    /// minimum timestamp. Count buckets are extended past their nominal
    /// size rather than split records sharing one timestamp.
    fn buckets(log: &MutationLog, granularity: SnapshotGranularity) -> Vec<&[LogRecord]> {
        let records = log.records();
        let mut buckets = Vec::new();
        if records.is_empty() {
            return buckets;
        }

        match granularity {
            SnapshotGranularity::Time(span) => {
                let mut bucket_start = records[0].timestamp;
                let mut lo = 0;
                while lo < records.len() {
                    let stop = bucket_start.saturating_add(span);
                    let hi = lo + records[lo..].partition_point(|r| r.timestamp < stop);
                    if hi > lo {
                        buckets.push(&records[lo..hi]);
                    }
                    lo = hi;
                    bucket_start = stop;
                }
            }
            SnapshotGranularity::Count(n) => {
                let mut lo = 0;
                while lo < records.len() {
                    let mut hi = usize::min(lo + n, records.len());
                    while hi < records.len() && records[hi].timestamp == records[hi - 1].timestamp {
                        hi += 1;
                    }
                    buckets.push(&records[lo..hi]);
                    lo = hi;
                }
            }
        }
        buckets
    }

    /// Full outer combination of the running state with one bucket's
    /// squashed deltas, keyed by entity id:
    ///
    /// | in state | net action | result                            |
    /// |----------|------------|-----------------------------------|
    /// | yes      | UPDATE     | retained, attrs merged (bucket dominant) |
    /// | yes      | DELETE     | dropped                           |
    /// | yes      | CREATE     | inconsistent (re-creating live)   |
    /// | no       | CREATE     | inserted                          |
    /// | no       | DELETE     | no-op (invisible churn)           |
    /// | no       | UPDATE     | inconsistent (no prior existence) |
    fn apply_delta(state: &mut Graph, records: &[LogRecord], warn_on_churn: bool) -> Result<()> {
        let groups = MutationLog::group_by_entity(records);
        for (key, run) in groups {
            let run: Vec<LogRecord> = run.into_iter().cloned().collect();
            let Some(net) = squash(&run)? else { continue };
            Self::apply_net(state, &key, &net, warn_on_churn)?;
        }
        Ok(())
    }

    fn apply_net(
        state: &mut Graph,
        key: &EntityKey,
        net: &LogRecord,
        warn_on_churn: bool,
    ) -> Result<()> {
        let (kind, id) = *key;
        let present = match kind {
            EntityKind::Vertex => state.contains_vertex(id),
            EntityKind::Edge => state.contains_edge(id),
        };

        match (present, net.action) {
            (true, Action::Update) => {
                match kind {
                    EntityKind::Vertex => {
                        if let Some(attrs) = state.vertices.get_mut(&id) {
                            *attrs = merge_attributes(attrs, &net.attributes);
                        }
                    }
                    EntityKind::Edge => {
                        if let Some(edge) = state.edges.get_mut(&id) {
                            edge.attributes = merge_attributes(&edge.attributes, &net.attributes);
                        }
                    }
                }
                Ok(())
            }
            (true, Action::Delete) => {
                match kind {
                    EntityKind::Vertex => {
                        state.vertices.remove(&id);
                    }
                    EntityKind::Edge => {
                        state.edges.remove(&id);
                    }
                }
                Ok(())
            }
            (true, Action::Create) => Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!("CREATE at t={} over a live entity", net.timestamp),
            }),
            (false, Action::Create) => {
                match &net.entity {
                    Entity::Vertex(id) => {
                        state.vertices.insert(*id, net.attributes.clone());
                    }
                    Entity::Edge { id, src, dst } => {
                        state.edges.insert(
                            *id,
                            EdgeState {
                                src: *src,
                                dst: *dst,
                                attributes: net.attributes.clone(),
                            },
                        );
                    }
                }
                Ok(())
            }
            (false, Action::Delete) => {
                // Created and deleted entirely inside this range.
                if warn_on_churn {
                    log::warn!("invisible churn: {:?} {} never reached a snapshot", kind, id);
                }
                Ok(())
            }
            (false, Action::Update) => Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!("UPDATE at t={} with no prior existence", net.timestamp),
            }),
        }
    }

    /// Latest stored snapshot at or before `t`, never after.
    fn nearest_prior(&self, t: Timestamp) -> Option<&Snapshot> {
        let idx = self.snapshots.partition_point(|s| s.instant <= t);
        idx.checked_sub(1).map(|i| &self.snapshots[i])
    }

    /// Records with `timestamp <= t`.
    fn prefix(&self, t: Timestamp) -> &[LogRecord] {
        let records = self.log.records();
        &records[..records.partition_point(|r| r.timestamp <= t)]
    }

    /// Apply the squashed per-entity suffix of one key to an optional base
    /// state, the single-entity version of the combination table.
    fn replay_entity(
        &self,
        key: &EntityKey,
        base: Option<(Entity, Attributes)>,
        suffix: &[LogRecord],
    ) -> Result<Option<(Entity, Attributes)>> {
        let run: Vec<LogRecord> = suffix
            .iter()
            .filter(|r| r.entity.key() == *key)
            .cloned()
            .collect();
        let Some(net) = squash(&run)? else {
            return Ok(base);
        };
        let (kind, id) = *key;

        match (base, net.action) {
            (Some((entity, attributes)), Action::Update) => {
                let attributes = merge_attributes(&attributes, &net.attributes);
                Ok(Some((entity, attributes)))
            }
            (Some(_), Action::Delete) => Ok(None),
            (Some(_), Action::Create) => Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!("CREATE at t={} over a live entity", net.timestamp),
            }),
            (None, Action::Create) => Ok(Some((net.entity.clone(), net.attributes))),
            (None, Action::Delete) => Ok(None),
            (None, Action::Update) => Err(ChronographError::InconsistentLogSequence {
                kind,
                id,
                detail: format!("UPDATE at t={} with no prior existence", net.timestamp),
            }),
        }
    }

    fn lookup(graph: &Graph, entity: &Entity) -> Option<(Entity, Attributes)> {
        match entity {
            Entity::Vertex(id) => graph
                .vertices
                .get(id)
                .map(|attrs| (Entity::Vertex(*id), attrs.clone())),
            Entity::Edge { id, .. } => graph.edges.get(id).map(|state| {
                (
                    Entity::Edge {
                        id: *id,
                        src: state.src,
                        dst: state.dst,
                    },
                    state.attributes.clone(),
                )
            }),
        }
    }

    fn activated_ids(&self, kind: EntityKind, window: &Interval) -> Result<FxHashSet<u64>> {
        // Net semantics: an entity created and deleted inside the window
        // collapses away, and a re-creation counts. This intentionally
        // diverges from the validity model's first-ever-creation report.
        let groups = MutationLog::group_by_entity(self.log.slice(window));
        let mut activated = FxHashSet::default();
        for ((k, id), run) in groups {
            if k != kind {
                continue;
            }
            let run: Vec<LogRecord> = run.into_iter().cloned().collect();
            if let Some(net) = squash(&run)?
                && net.action == Action::Create
            {
                activated.insert(id);
            }
        }
        Ok(activated)
    }

    /// Existence interval of one edge from its UPDATE-free action shape:
    /// `[CREATE]` lives to the infinite future, `[CREATE, DELETE]` ends at
    /// the delete. Anything else cannot be mapped to a single span.
    fn edge_existence(id: EdgeId, run: &[&LogRecord]) -> Result<Interval> {
        let markers: Vec<&LogRecord> = run
            .iter()
            .copied()
            .filter(|r| r.action != Action::Update)
            .collect();
        match markers.as_slice() {
            [create] if create.action == Action::Create => Ok(Interval::since(create.timestamp)),
            [create, delete] if create.action == Action::Create && delete.action == Action::Delete => {
                Ok(Interval::new(create.timestamp, delete.timestamp))
            }
            _ => {
                let shape: Vec<String> = run.iter().map(|r| format!("{:?}", r.action)).collect();
                Err(ChronographError::AmbiguousNeighbourShape {
                    edge: id,
                    shape: format!("[{}]", shape.join(", ")),
                })
            }
        }
    }
}

impl TemporalModel for SnapshotDeltaModel {
    fn entity_at(
        &self,
        entity: &Entity,
        instant: Timestamp,
    ) -> Result<Option<(Entity, Attributes)>> {
        let key = entity.key();
        match self.nearest_prior(instant) {
            Some(snapshot) => {
                let base = Self::lookup(&snapshot.graph, entity);
                self.replay_entity(&key, base, self.log.suffix(snapshot.instant, instant))
            }
            // Before the first snapshot: replay the whole prefix directly.
            None => self.replay_entity(&key, None, self.prefix(instant)),
        }
    }

    fn snapshot_at(&self, instant: Timestamp) -> Result<Snapshot> {
        let (mut graph, suffix) = match self.nearest_prior(instant) {
            Some(snapshot) => (
                snapshot.graph.clone(),
                self.log.suffix(snapshot.instant, instant),
            ),
            None => (Graph::new(), self.prefix(instant)),
        };
        Self::apply_delta(&mut graph, suffix, self.warn_on_churn)?;
        Ok(Snapshot { graph, instant })
    }

    fn activated_vertices(&self, window: &Interval) -> Result<FxHashSet<VertexId>> {
        check_window(window)?;
        self.activated_ids(EntityKind::Vertex, window)
    }

    fn activated_edges(&self, window: &Interval) -> Result<FxHashSet<EdgeId>> {
        check_window(window)?;
        self.activated_ids(EntityKind::Edge, window)
    }

    fn direct_neighbours(
        &self,
        vertex: VertexId,
        window: &Interval,
    ) -> Result<FxHashSet<VertexId>> {
        check_window(window)?;

        // Scan only edge logs touching the vertex, then derive each
        // edge's existence span from its full run.
        let incident = self.log.records().iter().filter(|r| {
            r.entity.kind() == EntityKind::Edge && r.entity.other_endpoint(vertex).is_some()
        });
        let groups = MutationLog::group_by_entity(incident);

        let mut neighbours = FxHashSet::default();
        for ((_, id), run) in groups {
            let existence = Self::edge_existence(id, &run)?;
            if existence.overlaps(window) {
                let (_, src, dst) = run[0].entity.expect_edge()?;
                let other = if src == vertex { dst } else { src };
                neighbours.insert(other);
            }
        }
        Ok(neighbours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn edge(id: EdgeId, src: VertexId, dst: VertexId) -> Entity {
        Entity::Edge { id, src, dst }
    }

    fn lifecycle_log() -> MutationLog {
        MutationLog::from_records(vec![
            LogRecord::new(10, Action::Create, Entity::Vertex(1)),
            LogRecord::new(20, Action::Update, Entity::Vertex(1))
                .with_attributes(attrs(&[("color", "red")])),
            LogRecord::new(30, Action::Delete, Entity::Vertex(1)),
        ])
    }

    fn count_config(n: usize) -> Config {
        Config::default()
            .with_granularity(SnapshotGranularity::Count(n))
            .with_warn_on_churn(false)
    }

    #[test]
    fn test_snapshot_instants_strictly_increase() {
        let model =
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(1)).unwrap();
        let instants: Vec<_> = model.snapshots().iter().map(|s| s.instant).collect();
        assert_eq!(instants, vec![10, 20, 30]);
    }

    #[test]
    fn test_time_buckets_skip_empty_spans() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(0, Action::Create, Entity::Vertex(1)),
            LogRecord::new(100, Action::Create, Entity::Vertex(2)),
        ]);
        let config = Config::default().with_granularity(SnapshotGranularity::Time(10));
        let model = SnapshotDeltaModel::build_with_config(log, &config).unwrap();
        assert_eq!(model.snapshots().len(), 2);
        assert_eq!(model.snapshots()[0].instant, 0);
        assert_eq!(model.snapshots()[1].instant, 100);
    }

    #[test]
    fn test_count_buckets_do_not_split_equal_timestamps() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(10, Action::Create, Entity::Vertex(1)),
            LogRecord::new(10, Action::Create, Entity::Vertex(2)),
            LogRecord::new(20, Action::Create, Entity::Vertex(3)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(1)).unwrap();
        let instants: Vec<_> = model.snapshots().iter().map(|s| s.instant).collect();
        assert_eq!(instants, vec![10, 20]);
        assert_eq!(model.snapshots()[0].graph.vertex_count(), 2);
    }

    #[test]
    fn test_entity_at_lifecycle() {
        let model =
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(2)).unwrap();
        let v1 = Entity::Vertex(1);

        let (_, at_15) = model.entity_at(&v1, 15).unwrap().unwrap();
        assert!(at_15.is_empty());
        let (_, at_25) = model.entity_at(&v1, 25).unwrap().unwrap();
        assert_eq!(at_25, attrs(&[("color", "red")]));
        assert!(model.entity_at(&v1, 35).unwrap().is_none());
        assert!(model.entity_at(&v1, 5).unwrap().is_none());
    }

    #[test]
    fn test_entity_at_before_first_snapshot_replays_prefix() {
        // Coarse granularity: the single snapshot lands at t=30, so a
        // query at t=15 has no prior snapshot and must replay directly.
        let model =
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(100)).unwrap();
        assert_eq!(model.snapshots().len(), 1);
        assert_eq!(model.snapshots()[0].instant, 30);

        let (_, at_15) = model.entity_at(&Entity::Vertex(1), 15).unwrap().unwrap();
        assert!(at_15.is_empty());
    }

    #[test]
    fn test_snapshot_at_before_first_record_is_empty() {
        let model =
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(2)).unwrap();
        let snap = model.snapshot_at(5).unwrap();
        assert!(snap.graph.is_empty());
    }

    #[test]
    fn test_snapshot_at_replays_suffix_without_storing() {
        let model =
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(2)).unwrap();
        // Snapshots at t=20 and t=30; query t=25 replays nothing extra.
        let snap = model.snapshot_at(25).unwrap();
        assert_eq!(snap.instant, 25);
        assert_eq!(
            snap.graph.vertices.get(&1),
            Some(&attrs(&[("color", "red")]))
        );

        let snap = model.snapshot_at(30).unwrap();
        assert!(snap.graph.is_empty());
    }

    #[test]
    fn test_churn_inside_one_bucket_is_invisible() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(10, Action::Create, Entity::Vertex(1)),
            LogRecord::new(11, Action::Create, Entity::Vertex(2)),
            LogRecord::new(12, Action::Delete, Entity::Vertex(2)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(10)).unwrap();
        assert_eq!(model.snapshots().len(), 1);
        let graph = &model.snapshots()[0].graph;
        assert!(graph.contains_vertex(1));
        assert!(!graph.contains_vertex(2));
    }

    #[test]
    fn test_zero_granularity_fails_at_build() {
        assert!(matches!(
            SnapshotDeltaModel::build_with_config(lifecycle_log(), &count_config(0)),
            Err(ChronographError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_double_create_fails_at_build() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(10, Action::Create, Entity::Vertex(1)),
            LogRecord::new(20, Action::Create, Entity::Vertex(1)),
        ]);
        assert!(matches!(
            SnapshotDeltaModel::build_with_config(log, &count_config(1)),
            Err(ChronographError::InconsistentLogSequence { .. })
        ));
    }

    #[test]
    fn test_activation_uses_net_semantics() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(10, Action::Create, Entity::Vertex(1)),
            LogRecord::new(20, Action::Delete, Entity::Vertex(1)),
            LogRecord::new(40, Action::Create, Entity::Vertex(1)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(1)).unwrap();

        // Churn collapses: created and deleted inside the window.
        let activated = model.activated_vertices(&Interval::new(0, 30)).unwrap();
        assert!(activated.is_empty());

        // A re-creation counts as a net creation in its window.
        let activated = model.activated_vertices(&Interval::new(35, 50)).unwrap();
        assert_eq!(activated, [1].into_iter().collect());
    }

    #[test]
    fn test_direct_neighbours_from_edge_shape() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(5, Action::Create, edge(1, 1, 2)),
            LogRecord::new(50, Action::Delete, edge(1, 1, 2)),
            LogRecord::new(7, Action::Create, edge(2, 3, 1)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(2)).unwrap();

        let n = model.direct_neighbours(1, &Interval::new(10, 20)).unwrap();
        assert_eq!(n, [2, 3].into_iter().collect());

        // Edge 1's existence [5, 50) ended before the window.
        let n = model.direct_neighbours(1, &Interval::new(60, 70)).unwrap();
        assert_eq!(n, [3].into_iter().collect());
    }

    #[test]
    fn test_neighbour_updates_do_not_break_shape() {
        let log = MutationLog::from_records(vec![
            LogRecord::new(5, Action::Create, edge(1, 1, 2)),
            LogRecord::new(10, Action::Update, edge(1, 1, 2))
                .with_attributes(attrs(&[("w", "3")])),
            LogRecord::new(50, Action::Delete, edge(1, 1, 2)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(3)).unwrap();
        let n = model.direct_neighbours(2, &Interval::new(10, 20)).unwrap();
        assert_eq!(n, [1].into_iter().collect());
    }

    #[test]
    fn test_recreated_edge_is_ambiguous_for_neighbours() {
        // Bucket size 1 keeps the re-creation legal across buckets; only
        // the neighbour query's shape check rejects it.
        let log = MutationLog::from_records(vec![
            LogRecord::new(5, Action::Create, edge(1, 1, 2)),
            LogRecord::new(10, Action::Delete, edge(1, 1, 2)),
            LogRecord::new(20, Action::Create, edge(1, 1, 2)),
        ]);
        let model = SnapshotDeltaModel::build_with_config(log, &count_config(1)).unwrap();
        let err = model
            .direct_neighbours(1, &Interval::new(0, 100))
            .unwrap_err();
        assert!(matches!(
            err,
            ChronographError::AmbiguousNeighbourShape { edge: 1, .. }
        ));
    }

    #[test]
    fn test_empty_log_yields_empty_model() {
        let model =
            SnapshotDeltaModel::build_with_config(MutationLog::default(), &count_config(4))
                .unwrap();
        assert!(model.snapshots().is_empty());
        assert!(model.snapshot_at(100).unwrap().graph.is_empty());
        assert!(model.entity_at(&Entity::Vertex(1), 100).unwrap().is_none());
    }
}
