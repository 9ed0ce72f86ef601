//! Table Builder - Creates target tables from inferred schemas

use sqlx::PgConnection;
use tracing::debug;

use crate::db::{qualified, quote_ident};
use crate::error::{PipelineError, Result};
use crate::ingestion::schema_inference::TableSchema;

/// SQLSTATEs a concurrent `IF NOT EXISTS` can still raise
const DUPLICATE_TABLE: &str = "42P07";
const DUPLICATE_SCHEMA: &str = "42P06";
const UNIQUE_VIOLATION: &str = "23505";

/// Table Builder - Issues idempotent DDL into one schema namespace.
///
/// An existing table is trusted as-is: its shape is never compared with the
/// newly inferred schema, so drift only shows up when a load fails.
#[derive(Clone, Debug)]
pub struct TableBuilder {
    namespace: String,
}

impl TableBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn create_schema_sql(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.namespace))
    }

    pub fn create_table_sql(&self, table: &str, schema: &TableSchema) -> String {
        let columns = schema
            .sql_columns()
            .into_iter()
            .map(|(name, sql_type)| format!("{} {}", quote_ident(name), sql_type))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            qualified(&self.namespace, table),
            columns
        )
    }

    /// Create the namespace and the table when absent. Runs in auto-commit.
    pub async fn ensure_table(
        &self,
        conn: &mut PgConnection,
        table: &str,
        schema: &TableSchema,
    ) -> Result<()> {
        let ddl = [self.create_schema_sql(), self.create_table_sql(table, schema)];
        for statement in ddl {
            debug!("{}", statement);
            match sqlx::query(&statement).execute(&mut *conn).await {
                Ok(_) => {}
                Err(e) if is_duplicate_definition(&e) => {
                    debug!("{} was created concurrently", table);
                }
                Err(e) => return Err(PipelineError::provision(table, e)),
            }
        }
        Ok(())
    }
}

/// Losing a create-if-absent race is success.
fn is_duplicate_definition(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(DUPLICATE_TABLE) | Some(DUPLICATE_SCHEMA) | Some(UNIQUE_VIOLATION)
        ),
        _ => false,
    }
}
