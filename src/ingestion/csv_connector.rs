//! CSV Connector - Reads one entity's flat file into a batch

use async_trait::async_trait;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::entity::Entity;
use crate::error::{PipelineError, Result};
use crate::ingestion::batch::Batch;
use crate::ingestion::connector::{FetchOutcome, SourceConnector};
use crate::pagination::Pagination;

/// CSV Connector - `<data_dir>/<entity>.csv`, UTF-8, header row.
pub struct CsvConnector {
    data_dir: PathBuf,
}

impl CsvConnector {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn file_path(&self, entity: Entity) -> PathBuf {
        self.data_dir.join(format!("{}.csv", entity.table_name()))
    }

    /// Column dtypes are inferred over the whole file so a late fractional value
    /// still widens the column to float.
    pub fn read_file(path: &Path) -> Result<Batch> {
        if !path.is_file() {
            return Err(PipelineError::Fetch(format!(
                "flat file not found: {}",
                path.display()
            )));
        }

        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(None)
            .finish()?
            .collect()?;

        Ok(Batch::new(frame))
    }
}

#[async_trait]
impl SourceConnector for CsvConnector {
    async fn fetch(&self, entity: Entity, page: Option<Pagination>) -> Result<FetchOutcome> {
        let path = self.file_path(entity);
        debug!("Reading {}", path.display());

        let batch = tokio::task::spawn_blocking(move || Self::read_file(&path))
            .await
            .map_err(|e| PipelineError::Fetch(format!("file reader task failed: {}", e)))??;

        let batch = match page {
            Some(page) => batch.window(page.offset() as usize, page.limit() as usize),
            None => batch,
        };

        Ok(FetchOutcome::complete(batch))
    }

    fn source_type(&self) -> &str {
        "file"
    }

    fn source_uri(&self) -> String {
        self.data_dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::schema_inference::{ColumnKind, SchemaInference};
    use std::fs;

    fn write_products(dir: &Path) {
        fs::write(
            dir.join("products.csv"),
            "product_id,product_name,price,launch_date\n\
             1,Widget,9.99,2024-01-05\n\
             2,Gadget,19.99,2024-02-11\n\
             3,Doohickey,29.99,2024-03-20\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        write_products(dir.path());

        let connector = CsvConnector::new(dir.path());
        let outcome = connector.fetch(Entity::Products, None).await.unwrap();

        assert_eq!(outcome.batch.height(), 3);
        let schema = SchemaInference::new().infer_schema(&outcome.batch);
        let kinds: Vec<_> = schema.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Integer, ColumnKind::Text, ColumnKind::Float, ColumnKind::Text]
        );
    }

    #[tokio::test]
    async fn test_fetch_applies_window() {
        let dir = tempfile::tempdir().unwrap();
        write_products(dir.path());

        let connector = CsvConnector::new(dir.path());
        let page = Pagination::new(Some(2), Some(1)).unwrap();
        let outcome = connector.fetch(Entity::Products, Some(page)).await.unwrap();
        assert_eq!(outcome.batch.height(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let connector = CsvConnector::new(dir.path());
        let err = connector.fetch(Entity::Returns, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }
}
