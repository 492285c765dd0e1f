//! Arrow schema inference and JSON <-> Arrow conversion
//!
//! Columns keep the order the caller supplies (the dataset's first-seen
//! order). Types are inferred per column across all rows.

use crate::error::{Error, Result};
use crate::types::JsonObject;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, LargeStringArray, ListArray, NullArray, StringArray, StructArray,
    UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Infer an Arrow schema for `rows`, one nullable field per entry of
/// `columns`, in that order.
///
/// A column with no non-null value anywhere becomes `Utf8` so it can still
/// be written to Parquet.
pub fn infer_schema(rows: &[JsonObject], columns: &[String]) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| {
            let dtype = rows
                .iter()
                .filter_map(|row| row.get(name))
                .map(infer_type)
                .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
            Field::new(name, resolve_nulls(dtype), true)
        })
        .collect();

    Schema::new(fields)
}

/// Convert rows to an Arrow RecordBatch with the given column order
pub fn json_to_arrow(rows: &[JsonObject], columns: &[String]) -> Result<RecordBatch> {
    let schema = Arc::new(infer_schema(rows, columns));

    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for field in schema.fields() {
        let values: Vec<Option<&Value>> = rows.iter().map(|row| row.get(field.name())).collect();
        arrays.push(build_array(&values, field.data_type())?);
    }

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        Value::String(_) => DataType::Utf8,
        Value::Array(items) => {
            let element_type = items
                .iter()
                .filter(|v| !v.is_null())
                .map(infer_type)
                .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
            DataType::List(Arc::new(Field::new("item", element_type, true)))
        }
        // Empty objects have no columns to carry; store them as text
        Value::Object(obj) if obj.is_empty() => DataType::Utf8,
        Value::Object(obj) => {
            let fields: Vec<Field> = obj
                .iter()
                .map(|(k, v)| Field::new(k, infer_type(v), true))
                .collect();
            DataType::Struct(Fields::from(fields))
        }
    }
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),

        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        (DataType::List(a), DataType::List(b)) => DataType::List(Arc::new(Field::new(
            a.name(),
            merge_types(a.data_type(), b.data_type()),
            true,
        ))),

        (DataType::Struct(a), DataType::Struct(b)) => DataType::Struct(merge_fields(a, b)),

        // Anything else falls back to its text form
        _ => DataType::Utf8,
    }
}

/// Union of two struct field sets, in first-seen order, merging shared fields
fn merge_fields(a: &Fields, b: &Fields) -> Fields {
    let mut merged: Vec<Field> = a
        .iter()
        .map(|field| {
            let dtype = match b.find(field.name()) {
                Some((_, other)) => merge_types(field.data_type(), other.data_type()),
                None => field.data_type().clone(),
            };
            Field::new(field.name(), dtype, true)
        })
        .collect();

    merged.extend(
        b.iter()
            .filter(|field| a.find(field.name()).is_none())
            .map(|field| Field::new(field.name(), field.data_type().clone(), true)),
    );

    Fields::from(merged)
}

/// Replace `Null` types, at any level, with `Utf8`
fn resolve_nulls(dtype: DataType) -> DataType {
    match dtype {
        DataType::Null => DataType::Utf8,
        DataType::List(item) => DataType::List(Arc::new(Field::new(
            item.name(),
            resolve_nulls(item.data_type().clone()),
            true,
        ))),
        DataType::Struct(fields) => DataType::Struct(
            fields
                .iter()
                .map(|f| Field::new(f.name(), resolve_nulls(f.data_type().clone()), true))
                .collect::<Vec<_>>()
                .into(),
        ),
        other => other,
    }
}

/// Build an Arrow array from JSON values
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Null => Ok(Arc::new(NullArray::new(values.len()))),

        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::List(field) => build_list_array(values, field),

        DataType::Struct(fields) => build_struct_array(values, fields),

        _ => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.and_then(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }
    }
}

/// Build a list array from JSON arrays
fn build_list_array(values: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];
    let mut valid: Vec<bool> = Vec::with_capacity(values.len());

    for value in values {
        if let Some(Value::Array(arr)) = value {
            items.extend(arr.iter().map(Some));
            valid.push(true);
        } else {
            valid.push(false);
        }
        let offset = i32::try_from(items.len())
            .map_err(|_| Error::output("Array too large for i32 offset"))?;
        offsets.push(offset);
    }

    let items_array = build_array(&items, field.data_type())?;
    let list = ListArray::new(
        Arc::clone(field),
        OffsetBuffer::new(offsets.into()),
        items_array,
        Some(NullBuffer::from(valid)),
    );
    Ok(Arc::new(list))
}

/// Build a struct array from JSON objects
fn build_struct_array(values: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let mut children: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let child_values: Vec<Option<&Value>> = values
            .iter()
            .map(|v| v.and_then(Value::as_object).and_then(|obj| obj.get(field.name())))
            .collect();
        children.push(build_array(&child_values, field.data_type())?);
    }

    let valid: Vec<bool> = values
        .iter()
        .map(|v| matches!(v, Some(Value::Object(_))))
        .collect();

    Ok(Arc::new(StructArray::new(
        fields.clone(),
        children,
        Some(NullBuffer::from(valid)),
    )))
}

/// Convert an Arrow RecordBatch to JSON records, one object per row
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    let schema = batch.schema();
    let mut records = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let mut record = JsonObject::new();
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let value = array_value_to_json(batch.column(col_idx).as_ref(), row)?;
            record.insert(field.name().clone(), value);
        }
        records.push(Value::Object(record));
    }

    Ok(records)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::output(format!("Failed to downcast to {name}")))
}

fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(array, "BooleanArray")?.value(row)),
        DataType::Int8 => downcast::<Int8Array>(array, "Int8Array")?.value(row).into(),
        DataType::Int16 => downcast::<Int16Array>(array, "Int16Array")?.value(row).into(),
        DataType::Int32 => downcast::<Int32Array>(array, "Int32Array")?.value(row).into(),
        DataType::Int64 => downcast::<Int64Array>(array, "Int64Array")?.value(row).into(),
        DataType::UInt8 => downcast::<UInt8Array>(array, "UInt8Array")?.value(row).into(),
        DataType::UInt16 => downcast::<UInt16Array>(array, "UInt16Array")?.value(row).into(),
        DataType::UInt32 => downcast::<UInt32Array>(array, "UInt32Array")?.value(row).into(),
        DataType::UInt64 => downcast::<UInt64Array>(array, "UInt64Array")?.value(row).into(),
        DataType::Float32 => {
            float_to_json(f64::from(downcast::<Float32Array>(array, "Float32Array")?.value(row)))
        }
        DataType::Float64 => float_to_json(downcast::<Float64Array>(array, "Float64Array")?.value(row)),
        DataType::Utf8 => Value::String(downcast::<StringArray>(array, "StringArray")?.value(row).to_string()),
        DataType::LargeUtf8 => Value::String(
            downcast::<LargeStringArray>(array, "LargeStringArray")?
                .value(row)
                .to_string(),
        ),
        DataType::List(_) => {
            let values = downcast::<ListArray>(array, "ListArray")?.value(row);
            let items = (0..values.len())
                .map(|i| array_value_to_json(values.as_ref(), i))
                .collect::<Result<Vec<_>>>()?;
            Value::Array(items)
        }
        DataType::Struct(_) => {
            let arr = downcast::<StructArray>(array, "StructArray")?;
            let mut obj = JsonObject::new();
            for (i, field) in arr.fields().iter().enumerate() {
                obj.insert(field.name().clone(), array_value_to_json(arr.column(i).as_ref(), row)?);
            }
            Value::Object(obj)
        }
        // Types the writer never produces are passed through as their type name
        other => Value::String(format!("{other:?}")),
    };

    Ok(value)
}
