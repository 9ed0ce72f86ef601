#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use retail_pipeline::ingestion::{Batch, TableSchema, TableSink, TypedColumn};
use retail_pipeline::{PipelineError, Result};

/// A loaded batch as the sink saw it
#[derive(Clone, Debug)]
pub struct LoadedBatch {
    pub columns: Vec<TypedColumn>,
    pub rows: usize,
    pub loaded_at: NaiveDateTime,
}

/// In-memory table sink: create-once tables, append-many batches.
#[derive(Default)]
pub struct MemorySink {
    pub schemas: Mutex<HashMap<String, TableSchema>>,
    pub provision_calls: Mutex<Vec<String>>,
    pub loads: Mutex<HashMap<String, Vec<LoadedBatch>>>,
    pub fail_loads_for: HashSet<String>,
}

impl MemorySink {
    pub fn failing_loads(tables: &[&str]) -> Self {
        Self {
            fail_loads_for: tables.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn schema(&self, table: &str) -> Option<TableSchema> {
        self.schemas.lock().unwrap().get(table).cloned()
    }

    pub fn batches(&self, table: &str) -> Vec<LoadedBatch> {
        self.loads
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn provision(&self, table: &str, schema: &TableSchema) -> Result<()> {
        self.provision_calls.lock().unwrap().push(table.to_string());
        self.schemas
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_insert_with(|| schema.clone());
        Ok(())
    }

    async fn load(&self, table: &str, batch: &Batch, loaded_at: NaiveDateTime) -> Result<u64> {
        if self.fail_loads_for.contains(table) {
            return Err(PipelineError::Validation(format!(
                "simulated load failure for {}",
                table
            )));
        }
        let loaded = LoadedBatch {
            columns: batch.typed_columns()?,
            rows: batch.height(),
            loaded_at,
        };
        self.loads
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(loaded);
        Ok(batch.height() as u64)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub fn write_csv(dir: &Path, entity: &str, contents: &str) {
    std::fs::write(dir.join(format!("{}.csv", entity)), contents).unwrap();
}
