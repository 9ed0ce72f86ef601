//! Schema Inference - Deterministic column typing from a batch's dtypes

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};

use crate::ingestion::batch::Batch;

/// Provenance column appended to every ingested table
pub const LOAD_TIMESTAMP_COLUMN: &str = "load_date_time";
pub const LOAD_TIMESTAMP_SQL_TYPE: &str = "TIMESTAMP";

pub fn is_provenance(column: &str) -> bool {
    column == LOAD_TIMESTAMP_COLUMN
}

/// The three SQL type buckets a column can land in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Integer dtypes win, then floating dtypes; everything else (strings, dates,
    /// booleans, all-null columns) is text. Width is not preserved.
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => ColumnKind::Integer,
            DataType::Float32 | DataType::Float64 => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "DOUBLE PRECISION",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// Inferred column definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

/// Inferred table shape. The provenance column is implicit and always trails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// `(name, sql type)` pairs in DDL order, provenance column last
    pub fn sql_columns(&self) -> Vec<(&str, &'static str)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.kind.sql_type()))
            .chain(std::iter::once((LOAD_TIMESTAMP_COLUMN, LOAD_TIMESTAMP_SQL_TYPE)))
            .collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Schema Inference Engine
#[derive(Clone, Debug, Default)]
pub struct SchemaInference;

impl SchemaInference {
    pub fn new() -> Self {
        Self
    }

    /// Pure function of the batch's column names and dtypes. A source column
    /// carrying the provenance name is dropped; every load re-stamps it.
    pub fn infer_schema(&self, batch: &Batch) -> TableSchema {
        let columns = batch
            .frame()
            .get_columns()
            .iter()
            .filter(|series| !is_provenance(series.name()))
            .map(|series| ColumnDef {
                name: series.name().to_string(),
                kind: ColumnKind::of(series.dtype()),
            })
            .collect();

        TableSchema { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_classifier_precedence() {
        assert_eq!(ColumnKind::of(&DataType::Int32), ColumnKind::Integer);
        assert_eq!(ColumnKind::of(&DataType::UInt64), ColumnKind::Integer);
        assert_eq!(ColumnKind::of(&DataType::Float32), ColumnKind::Float);
        assert_eq!(ColumnKind::of(&DataType::String), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&DataType::Boolean), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&DataType::Date), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&DataType::Null), ColumnKind::Text);
    }

    #[test]
    fn test_infer_schema_keeps_order_and_appends_provenance() {
        let frame = df![
            "id" => [1i64, 2, 3],
            "price" => [9.99, 19.99, 29.99],
            "name" => ["a", "b", "c"]
        ]
        .unwrap();
        let batch = Batch::new(frame);

        let schema = SchemaInference::new().infer_schema(&batch);
        assert_eq!(
            schema.sql_columns(),
            vec![
                ("id", "BIGINT"),
                ("price", "DOUBLE PRECISION"),
                ("name", "TEXT"),
                ("load_date_time", "TIMESTAMP"),
            ]
        );
    }

    #[test]
    fn test_inference_is_deterministic() {
        let frame = df!["a" => [1i32, 2], "b" => ["x", "y"]].unwrap();
        let batch = Batch::new(frame);
        let inference = SchemaInference::new();
        assert_eq!(inference.infer_schema(&batch), inference.infer_schema(&batch));
    }

    #[test]
    fn test_incoming_provenance_column_is_dropped() {
        let frame = df!["id" => [1i64], "load_date_time" => ["2024-01-01 00:00:00"]].unwrap();
        let schema = SchemaInference::new().infer_schema(&Batch::new(frame));
        assert_eq!(schema.column_names(), vec!["id"]);
        assert_eq!(schema.sql_columns().len(), 2);
    }

    #[test]
    fn test_all_null_column_is_text() {
        let empty: Vec<Option<&str>> = vec![None, None];
        let nulls: Vec<Option<i64>> = vec![None, None];
        let frame = DataFrame::new(vec![Series::new("empty", empty), Series::new("n", nulls)]).unwrap();
        let schema = SchemaInference::new().infer_schema(&Batch::new(frame));
        assert_eq!(schema.columns[0].kind, ColumnKind::Text);
        // typed nulls keep their dtype
        assert_eq!(schema.columns[1].kind, ColumnKind::Integer);
    }
}
