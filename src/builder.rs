//! Model builder for flexible configuration.
//!
//! This module provides a builder pattern for constructing temporal models
//! from a mutation log with custom configuration.

use crate::error::Result;
use crate::log::MutationLog;
use crate::model::{SnapshotDeltaModel, ValidityModel};
use crate::types::{Config, LogRecord, SnapshotGranularity};

/// Builder collecting log records and configuration before constructing
/// either temporal model (or both, from one shared log).
#[derive(Debug, Default)]
pub struct ModelBuilder {
    records: Vec<LogRecord>,
    config: Config,
}

impl ModelBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records. Input order does not matter; the log sorts by
    /// timestamp on construction.
    pub fn records(mut self, records: impl IntoIterator<Item = LogRecord>) -> Self {
        self.records.extend(records);
        self
    }

    /// Add a single record.
    pub fn record(mut self, record: LogRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Set the full configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set only the snapshot bucketing policy.
    pub fn granularity(mut self, granularity: SnapshotGranularity) -> Self {
        self.config = self.config.with_granularity(granularity);
        self
    }

    /// Build the ordered log without constructing a model.
    pub fn into_log(self) -> MutationLog {
        MutationLog::from_records(self.records)
    }

    /// Build the interval-stamped model. Fails on a malformed log.
    pub fn build_validity(self) -> Result<ValidityModel> {
        ValidityModel::build(&MutationLog::from_records(self.records))
    }

    /// Build the snapshot-plus-delta model. Fails on a malformed log.
    pub fn build_snapshot_delta(self) -> Result<SnapshotDeltaModel> {
        let config = self.config;
        SnapshotDeltaModel::build_with_config(MutationLog::from_records(self.records), &config)
    }
}
