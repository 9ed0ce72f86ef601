//! Batch - one entity's columnar snapshot, ready to load

use polars::prelude::*;
use serde_json::Value;

use crate::error::Result;
use crate::ingestion::schema_inference::ColumnKind;

/// Ordered, named, homogeneously typed columns sharing one row count.
///
/// Backed by a polars `DataFrame`; column order is the order columns appear in
/// the source and becomes the column order of DDL and load statements.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    frame: DataFrame,
}

/// A column's values, resolved to the bucket its type infers to
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Integer(_) => ColumnKind::Integer,
            ColumnValues::Float(_) => ColumnKind::Float,
            ColumnValues::Text(_) => ColumnKind::Text,
        }
    }
}

impl Batch {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// No rows or no columns - nothing to provision or load
    pub fn is_empty(&self) -> bool {
        self.frame.width() == 0 || self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    /// Row window `[offset, offset + len)`, clipped to the batch.
    pub fn window(&self, offset: usize, len: usize) -> Self {
        let offset = offset.min(self.height());
        Self::new(self.frame.slice(offset as i64, len))
    }

    /// Build a batch from JSON row objects (the `data` array of an API page).
    ///
    /// Columns appear in first-seen key order. A column whose non-null values are
    /// all integers becomes Int64, all numeric with at least one fraction becomes
    /// Float64, anything else becomes String. Missing keys are nulls.
    pub fn from_json_records(records: &[Value]) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        for record in records {
            if let Value::Object(obj) = record {
                for key in obj.keys() {
                    if !names.iter().any(|n| n == key) {
                        names.push(key.clone());
                    }
                }
            }
        }
        if names.is_empty() {
            return Ok(Self::empty());
        }

        let mut series = Vec::with_capacity(names.len());
        for name in &names {
            let cells: Vec<Option<&Value>> = records
                .iter()
                .map(|r| r.get(name.as_str()).filter(|v| !v.is_null()))
                .collect();
            series.push(json_column(name, &cells));
        }

        Ok(Self::new(DataFrame::new(series)?))
    }

    /// Resolve every column to its typed values, preserving column order.
    pub fn typed_columns(&self) -> Result<Vec<TypedColumn>> {
        let mut out = Vec::with_capacity(self.width());
        for series in self.frame.get_columns() {
            let values = match ColumnKind::of(series.dtype()) {
                ColumnKind::Integer => {
                    let cast = series.strict_cast(&DataType::Int64)?;
                    ColumnValues::Integer(cast.i64()?.into_iter().collect())
                }
                ColumnKind::Float => {
                    let cast = series.strict_cast(&DataType::Float64)?;
                    ColumnValues::Float(cast.f64()?.into_iter().collect())
                }
                ColumnKind::Text => {
                    let cast = series.strict_cast(&DataType::String)?;
                    ColumnValues::Text(
                        cast.str()?
                            .into_iter()
                            .map(|v| v.map(str::to_string))
                            .collect(),
                    )
                }
            };
            out.push(TypedColumn {
                name: series.name().to_string(),
                values,
            });
        }
        Ok(out)
    }
}

fn json_column(name: &str, cells: &[Option<&Value>]) -> Series {
    let present = || cells.iter().flatten();

    if present().next().is_some() && present().all(|v| v.is_i64()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(Value::as_i64)).collect();
        return Series::new(name, values);
    }

    if present().next().is_some() && present().all(|v| v.is_number()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(Value::as_f64)).collect();
        return Series::new(name, values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| {
            c.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Series::new(name, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_records_keeps_key_order_and_types() {
        let records = vec![
            json!({"product_id": 1, "product_name": "Widget", "price": 9.99, "active": true}),
            json!({"product_id": 2, "product_name": "Gadget", "price": 20, "active": false}),
        ];
        let batch = Batch::from_json_records(&records).unwrap();

        assert_eq!(
            batch.column_names(),
            vec!["product_id", "product_name", "price", "active"]
        );
        assert_eq!(batch.height(), 2);

        let columns = batch.typed_columns().unwrap();
        assert_eq!(columns[0].values, ColumnValues::Integer(vec![Some(1), Some(2)]));
        assert_eq!(columns[2].values, ColumnValues::Float(vec![Some(9.99), Some(20.0)]));
        assert_eq!(
            columns[3].values,
            ColumnValues::Text(vec![Some("true".to_string()), Some("false".to_string())])
        );
    }

    #[test]
    fn test_missing_keys_and_nulls_become_nulls() {
        let records = vec![
            json!({"id": 1, "note": null}),
            json!({"id": 2}),
        ];
        let batch = Batch::from_json_records(&records).unwrap();
        let columns = batch.typed_columns().unwrap();

        // all-null column falls through to text
        assert_eq!(columns[1].values, ColumnValues::Text(vec![None, None]));
    }

    #[test]
    fn test_empty_records_give_empty_batch() {
        let batch = Batch::from_json_records(&[]).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_unsigned_overflow_is_an_error() {
        let frame = df!["big" => [1u64, u64::MAX]].unwrap();
        let batch = Batch::new(frame);
        assert!(batch.typed_columns().is_err());

        let frame = df!["small" => [1u64, 2]].unwrap();
        let columns = Batch::new(frame).typed_columns().unwrap();
        assert_eq!(columns[0].values, ColumnValues::Integer(vec![Some(1), Some(2)]));
    }

    #[test]
    fn test_window_clips() {
        let frame = df!["id" => [1i64, 2, 3, 4]].unwrap();
        let batch = Batch::new(frame);
        assert_eq!(batch.window(1, 2).height(), 2);
        assert_eq!(batch.window(3, 10).height(), 1);
        assert_eq!(batch.window(10, 10).height(), 0);
    }
}
