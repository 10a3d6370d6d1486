//! Interval-stamped temporal model.
//!
//! Every entity version carries its own valid-time window, built directly
//! from the log with no incremental state. Queries are pure interval
//! containment and overlap tests.

use crate::error::Result;
use crate::log::MutationLog;
use crate::model::{TemporalModel, check_window};
use crate::types::{
    Action, Attributes, EdgeId, EdgeState, Entity, EntityKey, EntityKind, Graph, Interval,
    Snapshot, Timestamp, VertexId, FOREVER, merge_attributes,
};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// One version of an entity: the attributes it carried over one span of
/// its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityVersion {
    pub entity: Entity,
    pub interval: Interval,
    pub attributes: Attributes,
}

/// Most entities see only a handful of mutations.
type VersionList = SmallVec<[EntityVersion; 2]>;

/// Temporal model where each entity version is stamped with the interval
/// during which it was the live state.
///
/// For a fixed entity id the version intervals are pairwise disjoint and
/// contiguous (the stop of one is the start of the next), covering exactly
/// the spans during which the entity existed, ending at [`FOREVER`] if it
/// was never deleted.
#[derive(Debug, Clone)]
pub struct ValidityModel {
    versions: FxHashMap<EntityKey, VersionList>,
    min_timestamp: Timestamp,
}

impl ValidityModel {
    /// Build the full interval cover from a log. Validates the per-entity
    /// action-sequence invariant first, so a malformed log fails here and
    /// not at query time.
    pub fn build(log: &MutationLog) -> Result<Self> {
        log.validate()?;

        let groups = MutationLog::group_by_entity(log.records());
        let mut versions: FxHashMap<EntityKey, VersionList> = FxHashMap::default();

        for (key, run) in groups {
            versions.insert(key, Self::versions_for_run(&run));
        }

        log::debug!(
            "validity model built: {} entities, {} versions",
            versions.len(),
            versions.values().map(|v| v.len()).sum::<usize>()
        );

        Ok(Self {
            versions,
            min_timestamp: log.min_timestamp().unwrap_or(0),
        })
    }

    /// Forward pass accumulates the attribute state each CREATE/UPDATE
    /// leaves behind; reverse pass closes the windows, newest first, with
    /// a trailing boundary that starts at the infinite future. DELETE
    /// emits no version, it only closes the chronologically earlier one.
    fn versions_for_run(run: &[&crate::types::LogRecord]) -> VersionList {
        let mut states: Vec<(Timestamp, Option<Attributes>, &Entity)> =
            Vec::with_capacity(run.len());
        let mut acc = Attributes::new();
        for record in run {
            match record.action {
                Action::Create => {
                    acc = record.attributes.clone();
                    states.push((record.timestamp, Some(acc.clone()), &record.entity));
                }
                Action::Update => {
                    acc = merge_attributes(&acc, &record.attributes);
                    states.push((record.timestamp, Some(acc.clone()), &record.entity));
                }
                Action::Delete => states.push((record.timestamp, None, &record.entity)),
            }
        }

        let mut list = VersionList::new();
        let mut boundary = FOREVER;
        for (timestamp, attributes, entity) in states.into_iter().rev() {
            match attributes {
                Some(attributes) => {
                    list.push(EntityVersion {
                        entity: entity.clone(),
                        interval: Interval::new(timestamp, boundary),
                        attributes,
                    });
                    boundary = timestamp;
                }
                None => boundary = timestamp,
            }
        }
        list.reverse();
        list
    }

    /// All versions of one entity, ascending by window start.
    pub fn versions_of(&self, key: &EntityKey) -> &[EntityVersion] {
        self.versions.get(key).map_or(&[], |list| list.as_slice())
    }

    fn activated_ids(&self, kind: EntityKind, window: &Interval) -> FxHashSet<u64> {
        // Only the earliest validFrom counts: the entity's true creation,
        // never a re-creation after deletion.
        self.versions
            .iter()
            .filter(|((k, _), list)| *k == kind && !list.is_empty())
            .filter(|(_, list)| window.contains(list[0].interval.start))
            .map(|((_, id), _)| *id)
            .collect()
    }
}

impl TemporalModel for ValidityModel {
    fn entity_at(
        &self,
        entity: &Entity,
        instant: Timestamp,
    ) -> Result<Option<(Entity, Attributes)>> {
        let found = self
            .versions_of(&entity.key())
            .iter()
            .find(|v| v.interval.contains(instant))
            .map(|v| (v.entity.clone(), v.attributes.clone()));
        Ok(found)
    }

    fn snapshot_at(&self, instant: Timestamp) -> Result<Snapshot> {
        let mut graph = Graph::new();
        if instant < self.min_timestamp {
            return Ok(Snapshot { graph, instant });
        }

        // Cost scales with total history size; no incremental indexing.
        for list in self.versions.values() {
            let Some(version) = list.iter().find(|v| v.interval.contains(instant)) else {
                continue;
            };
            match &version.entity {
                Entity::Vertex(id) => {
                    graph.vertices.insert(*id, version.attributes.clone());
                }
                Entity::Edge { id, src, dst } => {
                    graph.edges.insert(
                        *id,
                        EdgeState {
                            src: *src,
                            dst: *dst,
                            attributes: version.attributes.clone(),
                        },
                    );
                }
            }
        }
        Ok(Snapshot { graph, instant })
    }

    fn activated_vertices(&self, window: &Interval) -> Result<FxHashSet<VertexId>> {
        check_window(window)?;
        Ok(self.activated_ids(EntityKind::Vertex, window))
    }

    fn activated_edges(&self, window: &Interval) -> Result<FxHashSet<EdgeId>> {
        check_window(window)?;
        Ok(self.activated_ids(EntityKind::Edge, window))
    }

    fn direct_neighbours(
        &self,
        vertex: VertexId,
        window: &Interval,
    ) -> Result<FxHashSet<VertexId>> {
        check_window(window)?;
        let mut neighbours = FxHashSet::default();
        for ((kind, _), list) in &self.versions {
            if *kind != EntityKind::Edge {
                continue;
            }
            for version in list {
                let (_, src, dst) = version.entity.expect_edge()?;
                if src != vertex && dst != vertex {
                    break;
                }
                if version.interval.overlaps(window) {
                    let other = if src == vertex { dst } else { src };
                    neighbours.insert(other);
                    break;
                }
            }
        }
        Ok(neighbours)
    }
}
