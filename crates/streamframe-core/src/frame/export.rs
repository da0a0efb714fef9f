//! Conversion of a frame snapshot into an Arrow `RecordBatch`.

use super::field::Field;
use super::value::Value;
use crate::schema::FieldType;
use crate::Result;
use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::HashMap;
use std::sync::Arc;

/// Arrow type a field is exported as.
pub fn arrow_type(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Time => DataType::Timestamp(TimeUnit::Millisecond, None),
        FieldType::Number => DataType::Float64,
        FieldType::Boolean => DataType::Boolean,
        FieldType::String | FieldType::Other => DataType::Utf8,
    }
}

/// Build a `RecordBatch` holding `length` rows of `fields`.
///
/// Labels are attached as Arrow field metadata. Cells that do not fit the
/// column type become null.
pub fn to_record_batch(fields: &[Field], length: usize) -> Result<RecordBatch> {
    let mut arrow_fields = Vec::with_capacity(fields.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let metadata: HashMap<String, String> = field
            .labels
            .as_ref()
            .map(|labels| labels.clone().into_iter().collect())
            .unwrap_or_default();
        arrow_fields.push(
            ArrowField::new(&field.name, arrow_type(field.field_type), true)
                .with_metadata(metadata),
        );
        columns.push(column(field));
    }

    let schema = Arc::new(ArrowSchema::new(arrow_fields));
    let options = RecordBatchOptions::new().with_row_count(Some(length));
    Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
}

fn column(field: &Field) -> ArrayRef {
    let cells = field.values.iter();
    match field.field_type {
        FieldType::Time => Arc::new(TimestampMillisecondArray::from(
            cells
                .map(|v| v.as_ref().and_then(Value::as_f64).map(|t| t as i64))
                .collect::<Vec<_>>(),
        )),
        FieldType::Number => Arc::new(Float64Array::from(
            cells
                .map(|v| v.as_ref().and_then(Value::as_f64))
                .collect::<Vec<_>>(),
        )),
        FieldType::Boolean => Arc::new(BooleanArray::from(
            cells
                .map(|v| v.as_ref().and_then(Value::as_bool))
                .collect::<Vec<_>>(),
        )),
        FieldType::String => Arc::new(StringArray::from(
            cells
                .map(|v| v.as_ref().and_then(Value::as_str))
                .collect::<Vec<_>>(),
        )),
        FieldType::Other => Arc::new(StringArray::from(
            cells
                .map(|v| v.as_ref().map(Value::to_string))
                .collect::<Vec<_>>(),
        )),
    }
}
