//! Table Sink - the store seam the orchestrator writes through

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::error::{PipelineError, Result};
use crate::ingestion::batch::Batch;
use crate::ingestion::loader::{BulkLoader, LoadStrategy};
use crate::ingestion::schema_inference::TableSchema;
use crate::ingestion::table_builder::TableBuilder;

/// Where provisioned tables live and batches land
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Ensure `table` exists; a no-op when it already does.
    async fn provision(&self, table: &str, schema: &TableSchema) -> Result<()>;

    /// Append `batch` to `table`, returning the number of rows written.
    async fn load(&self, table: &str, batch: &Batch, loaded_at: NaiveDateTime) -> Result<u64>;

    /// Human-readable destination, for logs
    fn describe(&self) -> String;
}

/// PostgreSQL sink. Each call checks out its own pooled connection, which goes
/// back to the pool when dropped on every exit path.
pub struct PgSink {
    pool: PgPool,
    table_builder: TableBuilder,
    loader: BulkLoader,
}

impl PgSink {
    pub fn new(pool: PgPool, namespace: &str, strategy: LoadStrategy) -> Self {
        Self {
            pool,
            table_builder: TableBuilder::new(namespace),
            loader: BulkLoader::new(namespace, strategy),
        }
    }
}

#[async_trait]
impl TableSink for PgSink {
    async fn provision(&self, table: &str, schema: &TableSchema) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PipelineError::provision(table, e))?;
        self.table_builder.ensure_table(&mut conn, table, schema).await
    }

    async fn load(&self, table: &str, batch: &Batch, loaded_at: NaiveDateTime) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PipelineError::load(table, e))?;
        self.loader.load(&mut conn, table, batch, loaded_at).await
    }

    fn describe(&self) -> String {
        format!(
            "postgres schema '{}' via {}",
            self.table_builder.namespace(),
            self.loader.strategy()
        )
    }
}
