//! Row-like views of Arrow cells.
//!
//! Nested Arrow values (structs, maps, lists) become JSON objects and
//! arrays so the field parsers can work on one representation regardless of
//! how the table was physically encoded.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type};
use arrow::util::display::array_value_to_string;
use serde_json::{Map, Number, Value};

fn display_value(array: &dyn Array, row: usize) -> Value {
    array_value_to_string(array, row)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map_or_else(|| Value::String(v.to_string()), Value::Number)
}

fn elements(values: &dyn Array) -> Value {
    Value::Array((0..values.len()).map(|i| cell_value(values, i)).collect())
}

fn map_key(array: &dyn Array, row: usize) -> String {
    match cell_value(array, row) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// JSON view of `array[row]`.
///
/// Types without a direct JSON counterpart fall back to Arrow's display
/// formatting, as a string.
pub fn cell_value(array: &dyn Array, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }

    match array.data_type() {
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::String(array.as_string_view().value(row).to_string()),
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Float32 => float_value(array.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => float_value(array.as_primitive::<Float64Type>().value(row)),
        dt if dt.is_integer() => {
            let text = display_value(array, row);
            match text.as_str().map(|t| t.parse::<Number>()) {
                Some(Ok(number)) => Value::Number(number),
                _ => text,
            }
        }
        DataType::Struct(_) => {
            let s = array.as_struct();
            let obj: Map<String, Value> = s
                .fields()
                .iter()
                .zip(s.columns())
                .map(|(field, column)| (field.name().clone(), cell_value(column.as_ref(), row)))
                .collect();
            Value::Object(obj)
        }
        DataType::Map(_, _) => {
            let entries = array.as_map().value(row);
            let keys = entries.column(0);
            let values = entries.column(1);
            let obj: Map<String, Value> = (0..entries.len())
                .map(|i| (map_key(keys.as_ref(), i), cell_value(values.as_ref(), i)))
                .collect();
            Value::Object(obj)
        }
        DataType::List(_) => elements(array.as_list::<i32>().value(row).as_ref()),
        DataType::LargeList(_) => elements(array.as_list::<i64>().value(row).as_ref()),
        DataType::FixedSizeList(_, _) => {
            elements(array.as_fixed_size_list().value(row).as_ref())
        }
        _ => display_value(array, row),
    }
}
