//! PgRow -> JSON object, decoded by column type

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::Result;

pub type JsonRow = Map<String, Value>;

/// Column order follows the result set. SQL NULL becomes `null`; a column type
/// with no JSON mapping here is an error, not a silent `null`.
pub fn row_to_json(row: &PgRow) -> Result<JsonRow> {
    let mut obj = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode(row, idx, column.type_info().name())?;
        obj.insert(column.name().to_string(), value);
    }
    Ok(obj)
}

fn decode(row: &PgRow, idx: usize, type_name: &str) -> std::result::Result<Value, sqlx::Error> {
    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .and_then(|f| Number::from_f64(f as f64))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|ts| Value::String(ts.to_rfc3339())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| Value::String(d.to_string())),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|u| Value::String(u.to_string())),
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}
