//! Writer-to-reader schema resolution.
//!
//! Resolution is validated once, at construction time: a reader field the
//! writer never encoded must carry a declared default, writer-only fields
//! must be skippable, and primitive pairs must be identical or connected by
//! a permitted promotion. Decode-time code can then assume every pair it
//! encounters resolves.

use crate::schema::{Field, Schema};
use serde_json::Value as Json;
use siftline_core::error::{ConfigError, DecodeError};
use siftline_core::record::Value;

/// Check whether a writer primitive may be promoted to a reader primitive.
///
/// Permitted promotions: integer widening (`int→long`), integer-to-float
/// widening (`int/long → float/double`), `float→double`, and
/// `string↔bytes`.
pub fn promotable(writer: &Schema, reader: &Schema) -> bool {
    matches!(
        (writer, reader),
        (Schema::Int, Schema::Long)
            | (Schema::Int, Schema::Float)
            | (Schema::Int, Schema::Double)
            | (Schema::Long, Schema::Float)
            | (Schema::Long, Schema::Double)
            | (Schema::Float, Schema::Double)
            | (Schema::String, Schema::Bytes)
            | (Schema::Bytes, Schema::String)
    )
}

/// Verify that data written with `writer` can be read as `reader`.
pub fn check_resolvable(writer: &Schema, reader: &Schema) -> Result<(), ConfigError> {
    match (writer, reader) {
        (Schema::Array(wi), Schema::Array(ri)) => check_resolvable(wi, ri),
        (Schema::Map(wv), Schema::Map(rv)) => check_resolvable(wv, rv),
        (Schema::Record(w), Schema::Record(r)) => {
            for reader_field in &r.fields {
                match w.field(&reader_field.name) {
                    Some(writer_field) => {
                        check_resolvable(&writer_field.schema, &reader_field.schema)?
                    }
                    None => {
                        if reader_field.default.is_none() {
                            return Err(ConfigError::invalid_schema(format!(
                                "reader field {}.{} is absent from the writer schema \
                                 and declares no default",
                                r.name, reader_field.name
                            )));
                        }
                        // Defaults are materialized eagerly so a bad default
                        // fails here, not mid-decode.
                        default_value(reader_field)?;
                    }
                }
            }
            Ok(())
        }
        (w, r) if w == r => Ok(()),
        (w, r) if promotable(w, r) => Ok(()),
        (w, r) => Err(ConfigError::invalid_schema(format!(
            "writer type {} cannot be read as reader type {}",
            w.type_name(),
            r.type_name()
        ))),
    }
}

/// Materialize a field's declared default as a typed value.
pub fn default_value(field: &Field) -> Result<Value, ConfigError> {
    let json = field.default.as_ref().ok_or_else(|| {
        ConfigError::invalid_schema(format!("field {} has no default", field.name))
    })?;
    json_to_value(json, &field.schema).map_err(|message| {
        ConfigError::invalid_schema(format!(
            "default for field {} does not match its type: {message}",
            field.name
        ))
    })
}

fn json_to_value(json: &Json, schema: &Schema) -> Result<Value, String> {
    match (schema, json) {
        (Schema::Null, Json::Null) => Ok(Value::Null),
        (Schema::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
        (Schema::Int, Json::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(|| format!("{n} is not a 32-bit integer")),
        (Schema::Long, Json::Number(n)) => n
            .as_i64()
            .map(Value::Long)
            .ok_or_else(|| format!("{n} is not a 64-bit integer")),
        (Schema::Float, Json::Number(n)) => n
            .as_f64()
            .map(|v| Value::Float(v as f32))
            .ok_or_else(|| format!("{n} is not a float")),
        (Schema::Double, Json::Number(n)) => n
            .as_f64()
            .map(Value::Double)
            .ok_or_else(|| format!("{n} is not a double")),
        (Schema::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (Schema::Bytes, Json::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| format!("{item} is not a byte"))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Value::Bytes),
        (Schema::Array(items), Json::Array(values)) => values
            .iter()
            .map(|v| json_to_value(v, items))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Schema::Map(values), Json::Object(map)) => map
            .iter()
            .map(|(k, v)| json_to_value(v, values).map(|v| (k.clone(), v)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Map),
        (Schema::Record(record), Json::Object(map)) => record
            .fields
            .iter()
            .map(|field| {
                let value = match map.get(&field.name) {
                    Some(v) => json_to_value(v, &field.schema)?,
                    None => default_value(field).map_err(|e| e.to_string())?,
                };
                Ok((field.name.clone(), value))
            })
            .collect::<Result<Vec<_>, String>>()
            .map(Value::Map),
        (schema, json) => Err(format!("{json} does not fit type {}", schema.type_name())),
    }
}

/// Promote a value decoded under a writer primitive to the reader primitive.
pub fn promote(value: Value, writer: &Schema, reader: &Schema) -> Result<Value, DecodeError> {
    if writer == reader {
        return Ok(value);
    }
    match (value, reader) {
        (Value::Int(v), Schema::Long) => Ok(Value::Long(i64::from(v))),
        (Value::Int(v), Schema::Float) => Ok(Value::Float(v as f32)),
        (Value::Int(v), Schema::Double) => Ok(Value::Double(f64::from(v))),
        (Value::Long(v), Schema::Float) => Ok(Value::Float(v as f32)),
        (Value::Long(v), Schema::Double) => Ok(Value::Double(v as f64)),
        (Value::Float(v), Schema::Double) => Ok(Value::Double(f64::from(v))),
        (Value::String(s), Schema::Bytes) => Ok(Value::Bytes(s.into_bytes())),
        (Value::Bytes(b), Schema::String) => String::from_utf8(b)
            .map(Value::String)
            .map_err(|_| DecodeError::corrupt("bytes promoted to string are not valid UTF-8")),
        (_, reader) => Err(DecodeError::SchemaMismatch {
            writer: writer.type_name().to_string(),
            reader: reader.type_name().to_string(),
        }),
    }
}
