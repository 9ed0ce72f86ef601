//! Ingestion Orchestrator - Sequential one-shot load over the entity list

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entity::Entity;
use crate::ingestion::{
    EntityOutcome, EntityReport, FetchStatus, IngestStage, IngestionReport, SchemaInference,
    SourceConnector, TableSink,
};
use crate::pagination::Pagination;

/// Options controlling a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionOptions {
    /// Entities to load, in order
    pub entities: Vec<Entity>,
    /// Row window passed to the connector
    pub page: Option<Pagination>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            entities: Entity::ALL.to_vec(),
            page: None,
        }
    }
}

/// Ingestion Orchestrator - fetch, infer, provision, load, per entity.
///
/// Every entity gets at most one attempt. A failure is recorded against that
/// entity and the run moves on; batches already loaded for other entities stay.
pub struct IngestionOrchestrator {
    schema_inference: SchemaInference,
    sink: Arc<dyn TableSink>,
}

impl IngestionOrchestrator {
    pub fn new(sink: Arc<dyn TableSink>) -> Self {
        Self {
            schema_inference: SchemaInference::new(),
            sink,
        }
    }

    pub async fn run(
        &self,
        connector: &dyn SourceConnector,
        options: &IngestionOptions,
    ) -> IngestionReport {
        let run_id = Uuid::new_v4().to_string();
        let source = format!("{} {}", connector.source_type(), connector.source_uri());
        info!(
            "Ingestion run {} from {} into {}",
            run_id,
            source,
            self.sink.describe()
        );

        let mut entities = Vec::with_capacity(options.entities.len());
        for &entity in &options.entities {
            let outcome = self.ingest_entity(connector, entity, options.page).await;
            entities.push(EntityReport { entity, outcome });
        }

        let status = IngestionReport::status_of(&entities);
        IngestionReport {
            run_id,
            source,
            entities,
            status,
        }
    }

    async fn ingest_entity(
        &self,
        connector: &dyn SourceConnector,
        entity: Entity,
        page: Option<Pagination>,
    ) -> EntityOutcome {
        let table = entity.table_name();

        let fetched = match connector.fetch(entity, page).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("Fetching {} failed: {}", entity, e);
                return EntityOutcome::Failed {
                    stage: IngestStage::Fetch,
                    error: e.to_string(),
                };
            }
        };

        if let FetchStatus::Rejected { code } = fetched.status {
            warn!("No Data From {} (status {}), skipping", entity, code);
            return EntityOutcome::Skipped {
                reason: format!("source responded with status {}", code),
            };
        }

        let batch = fetched.batch;
        if batch.is_empty() {
            info!("No Data From {}, skipping", entity);
            return EntityOutcome::Skipped {
                reason: "empty batch".to_string(),
            };
        }

        let schema = self.schema_inference.infer_schema(&batch);
        info!(
            "{}: {} rows, columns [{}]",
            entity,
            batch.height(),
            schema
                .sql_columns()
                .iter()
                .map(|(name, sql_type)| format!("{} {}", name, sql_type))
                .collect::<Vec<_>>()
                .join(", ")
        );

        if let Err(e) = self.sink.provision(table, &schema).await {
            error!("Provisioning {} failed: {}", table, e);
            return EntityOutcome::Failed {
                stage: IngestStage::Provision,
                error: e.to_string(),
            };
        }

        // one stamp for the whole batch
        let loaded_at = load_timestamp();
        match self.sink.load(table, &batch, loaded_at).await {
            Ok(rows) => {
                info!("Ingested {} rows into {} table.", rows, table);
                EntityOutcome::Loaded {
                    table: table.to_string(),
                    rows,
                    loaded_at,
                }
            }
            Err(e) => {
                error!("Loading {} failed: {}", table, e);
                EntityOutcome::Failed {
                    stage: IngestStage::Load,
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Wall-clock UTC, truncated to the microsecond precision `TIMESTAMP` stores.
fn load_timestamp() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond((now.nanosecond() / 1_000) * 1_000)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_timestamp_has_microsecond_precision() {
        let stamp = load_timestamp();
        assert_eq!(stamp.nanosecond() % 1_000, 0);
    }
}
