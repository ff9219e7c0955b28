//! The schema model: an immutable, parsed description of a container's shape.
//!
//! Schemas are declared as JSON text: primitive type names as strings
//! (`"long"`), composites as objects (`{"type":"array","items":…}`,
//! `{"type":"map","values":…}`, `{"type":"record","name":…,"fields":[…]}`).
//! Record fields may carry a `default`, used when a reader schema adds a
//! field the writer never encoded. Parse failures are configuration errors:
//! a schema must be resolvable before any decode attempt.

use serde_json::Value as Json;
use siftline_core::error::ConfigError;

/// A parsed schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// No value.
    Null,
    /// Boolean.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Homogeneous sequence.
    Array(Box<Schema>),
    /// String-keyed homogeneous mapping.
    Map(Box<Schema>),
    /// Named, ordered collection of typed fields.
    Record(RecordSchema),
}

/// The shape of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Record type name.
    pub name: String,
    /// Fields in declared order.
    pub fields: Vec<Field>,
}

impl RecordSchema {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, unique within the record.
    pub name: String,
    /// Field shape.
    pub schema: Schema,
    /// Declared default, used during resolution when the writer schema
    /// lacks this field.
    pub default: Option<Json>,
}

impl Schema {
    /// Parse a schema from its JSON text declaration.
    pub fn parse_str(text: &str) -> Result<Schema, ConfigError> {
        let json: Json = serde_json::from_str(text)
            .map_err(|e| ConfigError::invalid_schema(format!("schema is not valid JSON: {e}")))?;
        Schema::parse_value(&json)
    }

    /// Parse a schema from an already-parsed JSON declaration.
    pub fn parse_value(json: &Json) -> Result<Schema, ConfigError> {
        match json {
            Json::String(name) => Schema::primitive_by_name(name),
            Json::Object(map) => {
                let type_name = map
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| ConfigError::invalid_schema("schema object has no \"type\""))?;
                match type_name {
                    "array" => {
                        let items = map.get("items").ok_or_else(|| {
                            ConfigError::invalid_schema("array schema has no \"items\"")
                        })?;
                        Ok(Schema::Array(Box::new(Schema::parse_value(items)?)))
                    }
                    "map" => {
                        let values = map.get("values").ok_or_else(|| {
                            ConfigError::invalid_schema("map schema has no \"values\"")
                        })?;
                        Ok(Schema::Map(Box::new(Schema::parse_value(values)?)))
                    }
                    "record" => Schema::parse_record(map),
                    other => Schema::primitive_by_name(other),
                }
            }
            other => Err(ConfigError::invalid_schema(format!(
                "schema declaration must be a string or object, got {other}"
            ))),
        }
    }

    fn primitive_by_name(name: &str) -> Result<Schema, ConfigError> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "float" => Ok(Schema::Float),
            "double" => Ok(Schema::Double),
            "string" => Ok(Schema::String),
            "bytes" => Ok(Schema::Bytes),
            other => Err(ConfigError::invalid_schema(format!(
                "unknown type name: {other}"
            ))),
        }
    }

    fn parse_record(map: &serde_json::Map<String, Json>) -> Result<Schema, ConfigError> {
        let name = map
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| ConfigError::invalid_schema("record schema has no \"name\""))?
            .to_string();
        let fields_json = map
            .get("fields")
            .and_then(Json::as_array)
            .ok_or_else(|| ConfigError::invalid_schema("record schema has no \"fields\" array"))?;

        let mut fields = Vec::with_capacity(fields_json.len());
        for field_json in fields_json {
            let field_map = field_json.as_object().ok_or_else(|| {
                ConfigError::invalid_schema("record field declaration must be an object")
            })?;
            let field_name = field_map
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| ConfigError::invalid_schema("record field has no \"name\""))?
                .to_string();
            if fields.iter().any(|f: &Field| f.name == field_name) {
                return Err(ConfigError::invalid_schema(format!(
                    "duplicate field name: {field_name}"
                )));
            }
            let field_type = field_map
                .get("type")
                .ok_or_else(|| ConfigError::invalid_schema("record field has no \"type\""))?;
            fields.push(Field {
                name: field_name,
                schema: Schema::parse_value(field_type)?,
                default: field_map.get("default").cloned(),
            });
        }

        Ok(Schema::Record(RecordSchema { name, fields }))
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::String => "string",
            Schema::Bytes => "bytes",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Record(r) => &r.name,
        }
    }

    /// Check whether this is a primitive (non-composite) type.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Schema::Array(_) | Schema::Map(_) | Schema::Record(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitive() {
        assert_eq!(Schema::parse_str("\"long\"").unwrap(), Schema::Long);
        assert_eq!(
            Schema::parse_str("{\"type\": \"string\"}").unwrap(),
            Schema::String
        );
    }

    #[test]
    fn test_parse_record() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Event",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "tags", "type": {"type": "array", "items": "string"}},
                    {"name": "level", "type": "int", "default": 3}
                ]
            }"#,
        )
        .unwrap();

        let Schema::Record(record) = schema else {
            panic!("expected a record schema");
        };
        assert_eq!(record.name, "Event");
        assert_eq!(record.fields.len(), 3);
        assert_eq!(record.fields[0].schema, Schema::Long);
        assert_eq!(
            record.fields[1].schema,
            Schema::Array(Box::new(Schema::String))
        );
        assert_eq!(record.fields[2].default, Some(serde_json::json!(3)));
    }

    #[test]
    fn test_parse_nested_record() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Outer",
                "fields": [
                    {"name": "inner", "type": {
                        "type": "record",
                        "name": "Inner",
                        "fields": [{"name": "x", "type": "double"}]
                    }}
                ]
            }"#,
        )
        .unwrap();
        let Schema::Record(outer) = &schema else {
            panic!("expected a record schema");
        };
        assert!(matches!(outer.fields[0].schema, Schema::Record(_)));
    }

    #[test]
    fn test_unknown_type_name_rejected() {
        let err = Schema::parse_str("\"uuid\"").unwrap_err();
        assert!(err.to_string().contains("uuid"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[
                {"name":"a","type":"int"},{"name":"a","type":"long"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(Schema::parse_str("{not json").is_err());
    }
}
