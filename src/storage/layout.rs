//! Compact column encodings for persisted tables.
//!
//! Integers are stored in the narrowest signed width that holds the column's
//! range. Floats drop to `Float32` when every finite value is in the normal
//! f32 range, which bounds the relative error at 2^-24. Dates become `Date32`
//! and text becomes dictionary-encoded UTF-8.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, DictionaryArray, Float32Array, Float64Array,
    Int64Array, StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Int32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};

use super::StorageError;

/// Schema metadata key holding the table name.
pub const TABLE_METADATA_KEY: &str = "ao3stats.table";
/// Schema metadata key holding comma-separated index columns.
pub const INDEX_METADATA_KEY: &str = "ao3stats.index";

/// Column values before layout optimization.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Date(Vec<Option<NaiveDate>>),
    Text(Vec<Option<Arc<str>>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Date(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_nulls(&self) -> bool {
        match self {
            Self::Int(v) => v.iter().any(Option::is_none),
            Self::Float(v) => v.iter().any(Option::is_none),
            Self::Date(v) => v.iter().any(Option::is_none),
            Self::Text(v) => v.iter().any(Option::is_none),
            Self::Bool(v) => v.iter().any(Option::is_none),
        }
    }

    fn into_array(self) -> Result<ArrayRef, StorageError> {
        let array: ArrayRef = match self {
            Self::Int(values) => {
                let (min, max) = values
                    .iter()
                    .flatten()
                    .fold((0i64, 0i64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
                let wide = Int64Array::from(values);
                cast(&wide, &downcast_int_type(min, max))?
            }
            Self::Float(values) => {
                if float_fits_f32(&values) {
                    let narrow: Vec<Option<f32>> =
                        values.iter().map(|v| v.map(|f| f as f32)).collect();
                    Arc::new(Float32Array::from(narrow))
                } else {
                    Arc::new(Float64Array::from(values))
                }
            }
            Self::Date(values) => {
                let days: Vec<Option<i32>> =
                    values.iter().map(|d| d.map(date_to_days)).collect();
                Arc::new(Date32Array::from(days))
            }
            Self::Text(values) => {
                let dict: DictionaryArray<Int32Type> =
                    values.iter().map(|v| v.as_deref()).collect();
                Arc::new(dict)
            }
            Self::Bool(values) => Arc::new(BooleanArray::from(values)),
        };
        Ok(array)
    }
}

/// Narrowest signed integer type holding `min..=max`.
pub fn downcast_int_type(min: i64, max: i64) -> DataType {
    let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
    if fits(i8::MIN.into(), i8::MAX.into()) {
        DataType::Int8
    } else if fits(i16::MIN.into(), i16::MAX.into()) {
        DataType::Int16
    } else if fits(i32::MIN.into(), i32::MAX.into()) {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Whether every finite value can be stored as f32 within a relative error
/// of 2^-24. Zero, NaN and infinities always fit.
pub fn float_fits_f32(values: &[Option<f64>]) -> bool {
    let normal = f64::from(f32::MIN_POSITIVE)..=f64::from(f32::MAX);
    values
        .iter()
        .flatten()
        .filter(|v| v.is_finite() && **v != 0.0)
        .all(|v| normal.contains(&v.abs()))
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(epoch()).num_days() as i32
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(Duration::days(days.into()))
}

/// Table name and index columns of one persisted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub table: &'static str,
    pub index: &'static [&'static str],
}

impl TableLayout {
    pub const fn new(table: &'static str, index: &'static [&'static str]) -> Self {
        Self { table, index }
    }

    /// Encode columns into a record batch carrying this layout's metadata.
    pub fn optimize(&self, columns: Vec<(&str, ColumnData)>) -> Result<RecordBatch, StorageError> {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if columns.iter().any(|(_, c)| c.len() != rows) {
            return Err(StorageError::RaggedColumns {
                table: self.table.to_string(),
            });
        }

        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());
        for (name, data) in columns {
            let nullable = data.has_nulls();
            let array = data.into_array()?;
            fields.push(Field::new(name, array.data_type().clone(), nullable));
            arrays.push(array);
        }

        let metadata = HashMap::from([
            (TABLE_METADATA_KEY.to_string(), self.table.to_string()),
            (INDEX_METADATA_KEY.to_string(), self.index.join(",")),
        ]);
        let schema = Schema::new(fields).with_metadata(metadata);
        Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
    }
}

/// Index columns recorded in a schema's metadata.
pub fn index_columns(schema: &SchemaRef) -> Vec<String> {
    schema
        .metadata()
        .get(INDEX_METADATA_KEY)
        .map(|s| s.split(',').filter(|c| !c.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

/// Typed, widened access to the columns of a loaded batch.
pub struct BatchReader<'a> {
    table: &'a str,
    batch: &'a RecordBatch,
}

impl<'a> BatchReader<'a> {
    pub fn new(table: &'a str, batch: &'a RecordBatch) -> Self {
        Self { table, batch }
    }

    fn column(&self, name: &str, target: &DataType) -> Result<ArrayRef, StorageError> {
        let column = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| StorageError::MissingColumn {
                table: self.table.to_string(),
                column: name.to_string(),
            })?;
        cast(column.as_ref(), target).map_err(|_| self.unexpected(name, target))
    }

    fn unexpected(&self, name: &str, target: &DataType) -> StorageError {
        StorageError::UnexpectedType {
            table: self.table.to_string(),
            column: name.to_string(),
            expected: match target {
                DataType::Int64 => "Int64",
                DataType::Float64 => "Float64",
                DataType::Date32 => "Date32",
                DataType::Utf8 => "Utf8",
                DataType::Boolean => "Boolean",
                _ => "a supported type",
            },
        }
    }

    pub fn ints(&self, name: &str) -> Result<Vec<Option<i64>>, StorageError> {
        let array = self.column(name, &DataType::Int64)?;
        let ints = array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| self.unexpected(name, &DataType::Int64))?;
        Ok(ints.iter().collect())
    }

    pub fn floats(&self, name: &str) -> Result<Vec<Option<f64>>, StorageError> {
        let array = self.column(name, &DataType::Float64)?;
        let floats = array
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| self.unexpected(name, &DataType::Float64))?;
        Ok(floats.iter().collect())
    }

    pub fn dates(&self, name: &str) -> Result<Vec<Option<NaiveDate>>, StorageError> {
        let array = self.column(name, &DataType::Date32)?;
        let dates = array
            .as_any()
            .downcast_ref::<Date32Array>()
            .ok_or_else(|| self.unexpected(name, &DataType::Date32))?;
        Ok(dates.iter().map(|d| d.and_then(days_to_date)).collect())
    }

    pub fn strings(&self, name: &str) -> Result<Vec<Option<Arc<str>>>, StorageError> {
        let array = self.column(name, &DataType::Utf8)?;
        let strings = array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| self.unexpected(name, &DataType::Utf8))?;
        // Repeated values share one allocation, as in the dictionary encoding.
        let mut interner = crate::utils::StringInterner::new();
        Ok(strings.iter().map(|s| s.map(|s| interner.intern(s))).collect())
    }

    pub fn bools(&self, name: &str) -> Result<Vec<Option<bool>>, StorageError> {
        let array = self.column(name, &DataType::Boolean)?;
        let bools = array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| self.unexpected(name, &DataType::Boolean))?;
        Ok(bools.iter().collect())
    }

    /// Unwrap a nullable column that must not contain nulls.
    pub fn required<T>(&self, name: &str, values: Vec<Option<T>>) -> Result<Vec<T>, StorageError> {
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| StorageError::UnexpectedNull {
                    table: self.table.to_string(),
                    column: name.to_string(),
                    row,
                })
            })
            .collect()
    }
}
