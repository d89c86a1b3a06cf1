//! Parameter schemas.
//!
//! Catalog sources hand us JSON-schema-like fragments. They are parsed once,
//! when the catalog is built, into a tagged [`SchemaKind`] so the dispatcher
//! can check argument shapes structurally without touching raw JSON again.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Shape of a parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    Boolean,
    Array { items: Option<Box<ParamSchema>> },
    Object { properties: IndexMap<String, ParamSchema> },
}

impl SchemaKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object { .. } => "object",
        }
    }
}

/// A parsed parameter schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct ParamSchema {
    pub kind: SchemaKind,
    pub description: String,
    pub nullable: bool,
    pub default: Option<Value>,
    /// Allowed values (`enum` in JSON schema).
    pub allowed: Option<Vec<Value>>,
}

impl ParamSchema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: String::new(),
            nullable: false,
            default: None,
            allowed: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// A parameter is required when it is neither nullable nor defaulted.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }

    /// Check `value` against this schema. `Err` carries a human readable reason.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("null is not allowed".to_string())
            };
        }

        let matches = match (&self.kind, value) {
            (SchemaKind::String, Value::String(_)) => true,
            (SchemaKind::Number, Value::Number(_)) => true,
            (SchemaKind::Boolean, Value::Bool(_)) => true,
            (SchemaKind::Array { items }, Value::Array(values)) => {
                if let Some(items) = items {
                    for (idx, item) in values.iter().enumerate() {
                        items.check(item).map_err(|e| format!("item {}: {}", idx, e))?;
                    }
                }
                true
            }
            (SchemaKind::Object { properties }, Value::Object(fields)) => {
                // Undeclared nested keys are passed through untouched.
                for (key, field) in fields {
                    if let Some(schema) = properties.get(key) {
                        schema.check(field).map_err(|e| format!("{}: {}", key, e))?;
                    }
                }
                true
            }
            _ => false,
        };

        if !matches {
            return Err(format!(
                "expected {}, got {}",
                self.kind.type_name(),
                json_type_name(value)
            ));
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                return Err(format!("{} is not one of the allowed values", value));
            }
        }

        Ok(())
    }

    /// Render back to a JSON-schema fragment (used for tool definitions).
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!(self.kind.type_name()));
        if !self.description.is_empty() {
            out.insert("description".into(), json!(self.description));
        }
        if self.nullable {
            out.insert("nullable".into(), json!(true));
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        if let Some(allowed) = &self.allowed {
            out.insert("enum".into(), Value::Array(allowed.clone()));
        }
        match &self.kind {
            SchemaKind::Array { items: Some(items) } => {
                out.insert("items".into(), items.to_json_schema());
            }
            SchemaKind::Object { properties } if !properties.is_empty() => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
            }
            _ => {}
        }
        Value::Object(out)
    }
}

impl serde::Serialize for ParamSchema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `type` may be a single name or a list such as `["string", "null"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawType {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(rename = "type")]
    kind: Option<RawType>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    nullable: Option<bool>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(rename = "enum", default)]
    allowed: Option<Vec<Value>>,
    #[serde(default)]
    items: Option<Box<RawSchema>>,
    #[serde(default)]
    properties: Option<IndexMap<String, RawSchema>>,
}

impl TryFrom<RawSchema> for ParamSchema {
    type Error = String;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let mut nullable = raw.nullable.unwrap_or(false);

        let type_name = match raw.kind {
            Some(RawType::One(name)) => Some(name),
            Some(RawType::Many(names)) => {
                let mut concrete = None;
                for name in names {
                    if name == "null" {
                        nullable = true;
                    } else if concrete.is_none() {
                        concrete = Some(name);
                    }
                }
                concrete
            }
            None => None,
        };

        let kind = match type_name.as_deref() {
            Some("string") => SchemaKind::String,
            Some("number") | Some("integer") => SchemaKind::Number,
            Some("boolean") => SchemaKind::Boolean,
            Some("array") => SchemaKind::Array {
                items: raw
                    .items
                    .map(|items| ParamSchema::try_from(*items).map(Box::new))
                    .transpose()?,
            },
            Some("object") => SchemaKind::Object {
                properties: convert_properties(raw.properties)?,
            },
            Some(other) => return Err(format!("unsupported parameter type '{}'", other)),
            // Untyped fragments are inferred from their structure.
            None if raw.properties.is_some() => SchemaKind::Object {
                properties: convert_properties(raw.properties)?,
            },
            None if raw.items.is_some() => SchemaKind::Array {
                items: raw
                    .items
                    .map(|items| ParamSchema::try_from(*items).map(Box::new))
                    .transpose()?,
            },
            None => SchemaKind::String,
        };

        Ok(ParamSchema {
            kind,
            description: raw.description.unwrap_or_default(),
            nullable,
            default: raw.default.filter(|v| !v.is_null()),
            allowed: raw.allowed,
        })
    }
}

fn convert_properties(
    properties: Option<IndexMap<String, RawSchema>>,
) -> Result<IndexMap<String, ParamSchema>, String> {
    properties
        .unwrap_or_default()
        .into_iter()
        .map(|(name, raw)| {
            ParamSchema::try_from(raw)
                .map(|schema| (name.clone(), schema))
                .map_err(|e| format!("{}: {}", name, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> ParamSchema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_integer_maps_to_number() {
        let schema = parse(json!({ "type": "integer" }));
        assert_eq!(schema.kind, SchemaKind::Number);
        assert!(schema.is_required());
    }

    #[test]
    fn test_null_in_type_list_marks_nullable() {
        let schema = parse(json!({ "type": ["string", "null"] }));
        assert_eq!(schema.kind, SchemaKind::String);
        assert!(schema.nullable);
        assert!(!schema.is_required());
    }

    #[test]
    fn test_default_makes_parameter_optional() {
        let schema = parse(json!({ "type": "number", "default": 25 }));
        assert!(!schema.is_required());
        assert_eq!(schema.default, Some(json!(25)));
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let result: std::result::Result<ParamSchema, _> =
            serde_json::from_value(json!({ "type": "binary" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_untyped_with_properties_is_object() {
        let schema = parse(json!({ "properties": { "page": { "type": "number" } } }));
        match schema.kind {
            SchemaKind::Object { properties } => assert!(properties.contains_key("page")),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_check_nested_array_items() {
        let schema = parse(json!({ "type": "array", "items": { "type": "string" } }));
        assert!(schema.check(&json!(["a", "b"])).is_ok());

        let err = schema.check(&json!(["a", 3])).unwrap_err();
        assert!(err.contains("item 1"));
    }

    #[test]
    fn test_check_enum() {
        let schema = parse(json!({ "type": "string", "enum": ["active", "inactive"] }));
        assert!(schema.check(&json!("active")).is_ok());
        assert!(schema.check(&json!("deleted")).is_err());
    }

    #[test]
    fn test_check_null_requires_nullable() {
        assert!(ParamSchema::string().check(&Value::Null).is_err());
        assert!(ParamSchema::string().nullable().check(&Value::Null).is_ok());
    }

    #[test]
    fn test_object_properties_keep_source_order() {
        let schema: ParamSchema = serde_json::from_str(
            r#"{"type": "object", "properties": {"zeta": {"type": "string"}, "alpha": {"type": "boolean"}}}"#,
        )
        .unwrap();

        let SchemaKind::Object { properties } = &schema.kind else {
            panic!("expected object schema");
        };
        let names: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        let rendered = schema.to_json_schema();
        assert_eq!(rendered["properties"]["alpha"]["type"], "boolean");
    }
}
