//! Ingestion Module
//!
//! Moves one batch per entity from a source into the store:
//! - Schema inference from the batch's column types
//! - Idempotent table creation
//! - Bulk append stamped with a load timestamp
//! - Per-entity outcomes, so one failing entity never stops the run

pub mod batch;
pub mod connector;
pub mod csv_connector;
pub mod http_connector;
pub mod loader;
pub mod orchestrator;
pub mod schema_inference;
pub mod sink;
pub mod table_builder;

pub use batch::{Batch, ColumnValues, TypedColumn};
pub use connector::{FetchOutcome, FetchStatus, SourceConnector};
pub use csv_connector::CsvConnector;
pub use http_connector::HttpConnector;
pub use loader::{BulkLoader, LoadStrategy};
pub use orchestrator::{IngestionOptions, IngestionOrchestrator};
pub use schema_inference::{ColumnDef, ColumnKind, SchemaInference, TableSchema};
pub use sink::{PgSink, TableSink};
pub use table_builder::TableBuilder;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Ingestion run report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Ingestion run ID
    pub run_id: String,

    /// Source type and location
    pub source: String,

    /// One entry per attempted entity, in run order
    pub entities: Vec<EntityReport>,

    pub status: IngestionStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity: Entity,
    pub outcome: EntityOutcome,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum EntityOutcome {
    Loaded {
        table: String,
        rows: u64,
        loaded_at: NaiveDateTime,
    },
    /// Nothing to load: empty batch, or the source refused the request
    Skipped { reason: String },
    Failed { stage: IngestStage, error: String },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestStage {
    Fetch,
    Provision,
    Load,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestionStatus {
    Success,
    Partial,
    Failed,
}

impl IngestionReport {
    pub fn rows_loaded(&self) -> u64 {
        self.entities
            .iter()
            .map(|e| match e.outcome {
                EntityOutcome::Loaded { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| matches!(e.outcome, EntityOutcome::Failed { .. }))
            .count()
    }

    /// Failed only when every attempted entity failed.
    pub(crate) fn status_of(entities: &[EntityReport]) -> IngestionStatus {
        let failed = entities
            .iter()
            .filter(|e| matches!(e.outcome, EntityOutcome::Failed { .. }))
            .count();
        match failed {
            0 => IngestionStatus::Success,
            n if n == entities.len() => IngestionStatus::Failed,
            _ => IngestionStatus::Partial,
        }
    }
}
