//! Bulk Loader - Appends a batch to an existing table with one load timestamp

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::db::{qualified, quote_ident};
use crate::error::{PipelineError, Result};
use crate::ingestion::batch::{Batch, ColumnValues, TypedColumn};
use crate::ingestion::schema_inference::{is_provenance, LOAD_TIMESTAMP_COLUMN};

/// Postgres caps a statement at 65535 bind parameters
const MAX_BIND_PARAMS: usize = 65_535;
const COPY_CHUNK_BYTES: usize = 64 * 1024;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// How rows travel to the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// `COPY ... FROM STDIN` with the batch serialized as CSV
    Copy,
    /// Multi-row `INSERT ... VALUES`
    Insert,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStrategy::Copy => f.write_str("copy"),
            LoadStrategy::Insert => f.write_str("insert"),
        }
    }
}

impl FromStr for LoadStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "copy" => Ok(LoadStrategy::Copy),
            "insert" => Ok(LoadStrategy::Insert),
            other => Err(PipelineError::Validation(format!(
                "unknown load strategy '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BulkLoader {
    namespace: String,
    strategy: LoadStrategy,
}

impl BulkLoader {
    pub fn new(namespace: impl Into<String>, strategy: LoadStrategy) -> Self {
        Self {
            namespace: namespace.into(),
            strategy,
        }
    }

    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Append every row of `batch`, all stamped with `loaded_at`.
    ///
    /// Columns are named explicitly so values align with the table by name. The
    /// whole batch commits or none of it does.
    pub async fn load(
        &self,
        conn: &mut PgConnection,
        table: &str,
        batch: &Batch,
        loaded_at: NaiveDateTime,
    ) -> Result<u64> {
        let columns = load_columns(batch)?;
        if batch.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        match self.strategy {
            LoadStrategy::Copy => self.copy_in(conn, table, &columns, loaded_at).await,
            LoadStrategy::Insert => self.insert_rows(conn, table, &columns, loaded_at).await,
        }
    }

    pub fn copy_statement(&self, table: &str, columns: &[TypedColumn]) -> String {
        format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
            qualified(&self.namespace, table),
            column_list(columns)
        )
    }

    pub fn insert_prefix(&self, table: &str, columns: &[TypedColumn]) -> String {
        format!(
            "INSERT INTO {} ({}) ",
            qualified(&self.namespace, table),
            column_list(columns)
        )
    }

    async fn copy_in(
        &self,
        conn: &mut PgConnection,
        table: &str,
        columns: &[TypedColumn],
        loaded_at: NaiveDateTime,
    ) -> Result<u64> {
        let payload = encode_csv(columns, loaded_at)?;
        let statement = self.copy_statement(table, columns);
        debug!("{} ({} bytes)", statement, payload.len());

        // COPY is a single statement, so the store applies it atomically
        let mut copy = conn
            .copy_in_raw(&statement)
            .await
            .map_err(|e| PipelineError::load(table, e))?;

        for chunk in payload.chunks(COPY_CHUNK_BYTES) {
            if let Err(e) = copy.send(chunk).await {
                let _ = copy.abort(e.to_string()).await;
                return Err(PipelineError::load(table, e));
            }
        }

        copy.finish().await.map_err(|e| PipelineError::load(table, e))
    }

    async fn insert_rows(
        &self,
        conn: &mut PgConnection,
        table: &str,
        columns: &[TypedColumn],
        loaded_at: NaiveDateTime,
    ) -> Result<u64> {
        let rows = columns[0].values.len();
        let chunk_rows = rows_per_statement(columns.len());
        let prefix = self.insert_prefix(table, columns);

        let mut tx = conn.begin().await.map_err(|e| PipelineError::load(table, e))?;
        let mut inserted = 0;
        let mut start = 0;
        while start < rows {
            let end = (start + chunk_rows).min(rows);
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(start..end, |mut row, idx| {
                for column in columns {
                    match &column.values {
                        ColumnValues::Integer(v) => row.push_bind(v[idx]),
                        ColumnValues::Float(v) => row.push_bind(v[idx]),
                        ColumnValues::Text(v) => row.push_bind(v[idx].clone()),
                    };
                }
                row.push_bind(loaded_at);
            });

            // dropping `tx` on error rolls back earlier chunks
            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| PipelineError::load(table, e))?;
            inserted += result.rows_affected();
            start = end;
        }
        tx.commit().await.map_err(|e| PipelineError::load(table, e))?;

        Ok(inserted)
    }
}

/// Typed columns of `batch` minus any incoming provenance column.
fn load_columns(batch: &Batch) -> Result<Vec<TypedColumn>> {
    Ok(batch
        .typed_columns()?
        .into_iter()
        .filter(|c| !is_provenance(&c.name))
        .collect())
}

fn column_list(columns: &[TypedColumn]) -> String {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .chain(std::iter::once(LOAD_TIMESTAMP_COLUMN))
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / (column_count + 1)).max(1)
}

/// Serialize rows as headerless CSV, provenance value last.
///
/// `COPY ... (FORMAT csv)` reads an unquoted empty field as NULL and a quoted
/// one as the empty string, so every text value is quoted here and NULL is
/// left bare.
pub fn encode_csv(columns: &[TypedColumn], loaded_at: NaiveDateTime) -> Result<Vec<u8>> {
    let stamp = loaded_at.format(TIMESTAMP_FORMAT).to_string();
    let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);

    // quoting is decided per field below
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());

    let mut record: Vec<String> = Vec::with_capacity(columns.len() + 1);
    for idx in 0..rows {
        record.clear();
        for column in columns {
            record.push(match &column.values {
                ColumnValues::Integer(v) => v[idx].map(|n| n.to_string()).unwrap_or_default(),
                ColumnValues::Float(v) => v[idx].map(format_float).unwrap_or_default(),
                ColumnValues::Text(v) => v[idx].as_deref().map(quote_text).unwrap_or_default(),
            });
        }
        record.push(stamp.clone());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

fn quote_text(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        value.to_string()
    }
}
