//! JSON datum codec.
//!
//! The structured textual framing: one JSON value per datum. Resolution
//! semantics are identical to the binary codec — reader-only fields take
//! their defaults, writer-only fields are ignored, promotions apply — so
//! the framing is transparent to the data model. `bytes` are represented
//! as arrays of byte-valued numbers.

use crate::resolve;
use crate::schema::Schema;
use serde_json::{Map, Number, Value as Json};
use siftline_core::error::{DecodeError, Error, Result};
use siftline_core::record::Value;

fn corrupt(schema: &Schema, json: &Json) -> Error {
    DecodeError::corrupt(format!(
        "JSON value {json} does not fit writer type {}",
        schema.type_name()
    ))
    .into()
}

fn from_json_primitive(json: &Json, writer: &Schema) -> Result<Value> {
    match (writer, json) {
        (Schema::Null, Json::Null) => Ok(Value::Null),
        (Schema::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
        (Schema::Int, Json::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(|| corrupt(writer, json)),
        (Schema::Long, Json::Number(n)) => {
            n.as_i64().map(Value::Long).ok_or_else(|| corrupt(writer, json))
        }
        (Schema::Float, Json::Number(n)) => n
            .as_f64()
            .map(|v| Value::Float(v as f32))
            .ok_or_else(|| corrupt(writer, json)),
        (Schema::Double, Json::Number(n)) => {
            n.as_f64().map(Value::Double).ok_or_else(|| corrupt(writer, json))
        }
        (Schema::String, Json::String(s)) => Ok(Value::String(s.clone())),
        (Schema::Bytes, Json::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| corrupt(writer, json))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Value::Bytes),
        _ => Err(corrupt(writer, json)),
    }
}

/// Convert one JSON datum written under `writer` to the shape of `reader`.
pub fn datum_from_json(json: &Json, writer: &Schema, reader: &Schema) -> Result<Value> {
    match (writer, reader) {
        (Schema::Array(wi), Schema::Array(ri)) => {
            let items = json.as_array().ok_or_else(|| corrupt(writer, json))?;
            items
                .iter()
                .map(|item| datum_from_json(item, wi, ri))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        (Schema::Map(wv), Schema::Map(rv)) => {
            let entries = json.as_object().ok_or_else(|| corrupt(writer, json))?;
            entries
                .iter()
                .map(|(key, value)| {
                    datum_from_json(value, wv, rv).map(|v| (key.clone(), v))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Map)
        }
        (Schema::Record(w), Schema::Record(r)) => {
            let object = json.as_object().ok_or_else(|| corrupt(writer, json))?;
            let mut fields = Vec::with_capacity(r.fields.len());
            for reader_field in &r.fields {
                let value = match w.field(&reader_field.name) {
                    Some(writer_field) => {
                        let field_json = object.get(&reader_field.name).ok_or_else(|| {
                            Error::from(DecodeError::corrupt(format!(
                                "JSON datum is missing writer field {}.{}",
                                w.name, reader_field.name
                            )))
                        })?;
                        datum_from_json(field_json, &writer_field.schema, &reader_field.schema)?
                    }
                    None => resolve::default_value(reader_field)?,
                };
                fields.push((reader_field.name.clone(), value));
            }
            Ok(Value::Map(fields))
        }
        (w, r) if w.is_primitive() && r.is_primitive() => {
            let raw = from_json_primitive(json, w)?;
            resolve::promote(raw, w, r).map_err(Error::from)
        }
        (w, r) => Err(Error::Decode(DecodeError::SchemaMismatch {
            writer: w.type_name().to_string(),
            reader: r.type_name().to_string(),
        })),
    }
}

fn number(v: f64, schema: &Schema, value: &Value) -> Result<Json> {
    Number::from_f64(v).map(Json::Number).ok_or_else(|| {
        Error::Decode(DecodeError::ValueMismatch {
            schema: schema.type_name().to_string(),
            value: format!("{value:?}"),
        })
    })
}

/// Render one datum as JSON under `schema`. Counterpart of
/// [`datum_from_json`], used to produce textual wire data.
pub fn datum_to_json(schema: &Schema, value: &Value) -> Result<Json> {
    let mismatch = || {
        Error::Decode(DecodeError::ValueMismatch {
            schema: schema.type_name().to_string(),
            value: format!("{value:?}"),
        })
    };
    match (schema, value) {
        (Schema::Null, Value::Null) => Ok(Json::Null),
        (Schema::Boolean, Value::Boolean(b)) => Ok(Json::Bool(*b)),
        (Schema::Int, Value::Int(v)) => Ok(Json::from(*v)),
        (Schema::Long, Value::Long(v)) => Ok(Json::from(*v)),
        (Schema::Long, Value::Int(v)) => Ok(Json::from(i64::from(*v))),
        (Schema::Float, Value::Float(v)) => number(f64::from(*v), schema, value),
        (Schema::Double, Value::Double(v)) => number(*v, schema, value),
        (Schema::String, Value::String(s)) => Ok(Json::String(s.clone())),
        (Schema::Bytes, Value::Bytes(b)) => {
            Ok(Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()))
        }
        (Schema::Array(items), Value::Array(values)) => values
            .iter()
            .map(|item| datum_to_json(items, item))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array),
        (Schema::Map(value_schema), Value::Map(entries)) => {
            let mut object = Map::new();
            for (key, entry) in entries {
                object.insert(key.clone(), datum_to_json(value_schema, entry)?);
            }
            Ok(Json::Object(object))
        }
        (Schema::Record(record), value @ Value::Map(_)) => {
            let mut object = Map::new();
            for field in &record.fields {
                let field_value = value.field(&field.name).ok_or_else(mismatch)?;
                object.insert(field.name.clone(), datum_to_json(&field.schema, field_value)?);
            }
            Ok(Json::Object(object))
        }
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_schema() -> Schema {
        Schema::parse_str(
            r#"{"type":"record","name":"Event","fields":[
                {"name":"id","type":"long"},
                {"name":"payload","type":"bytes"}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = event_schema();
        let datum = Value::Map(vec![
            ("id".into(), Value::Long(9)),
            ("payload".into(), Value::Bytes(vec![0, 255, 7])),
        ]);
        let json = datum_to_json(&schema, &datum).unwrap();
        assert_eq!(json, json!({"id": 9, "payload": [0, 255, 7]}));
        assert_eq!(datum_from_json(&json, &schema, &schema).unwrap(), datum);
    }

    #[test]
    fn test_reader_default_applied() {
        let writer = event_schema();
        let reader = Schema::parse_str(
            r#"{"type":"record","name":"Event","fields":[
                {"name":"id","type":"long"},
                {"name":"payload","type":"bytes"},
                {"name":"source","type":"string","default":"unknown"}]}"#,
        )
        .unwrap();
        let value =
            datum_from_json(&json!({"id": 1, "payload": []}), &writer, &reader).unwrap();
        assert_eq!(value.field("source"), Some(&Value::String("unknown".into())));
    }

    #[test]
    fn test_writer_only_json_field_ignored() {
        let writer = event_schema();
        let reader = Schema::parse_str(
            r#"{"type":"record","name":"Event","fields":[{"name":"id","type":"long"}]}"#,
        )
        .unwrap();
        let value = datum_from_json(&json!({"id": 4, "payload": [1]}), &writer, &reader).unwrap();
        assert_eq!(value, Value::Map(vec![("id".into(), Value::Long(4))]));
    }

    #[test]
    fn test_promotion_from_json() {
        let value = datum_from_json(&json!(5), &Schema::Int, &Schema::Double).unwrap();
        assert_eq!(value, Value::Double(5.0));
    }

    #[test]
    fn test_type_mismatch_is_corrupt() {
        let err = datum_from_json(&json!("text"), &Schema::Long, &Schema::Long).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_missing_writer_field_is_corrupt() {
        let schema = event_schema();
        let err = datum_from_json(&json!({"id": 1}), &schema, &schema).unwrap_err();
        assert!(err.to_string().contains("payload"));
    }
}
