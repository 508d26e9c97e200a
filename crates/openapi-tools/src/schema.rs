//! `openapiv3` schemas -> JSON Schema values for MCP tool definitions.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::{ReferenceOr, Schema, SchemaKind, Type};
use rmcp::model::JsonObject;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// One tool argument as it appears in the generated input schema.
#[derive(Debug, Clone)]
pub struct ArgSchema<'a> {
    pub name: &'a str,
    pub required: bool,
    pub schema: &'a Value,
}

fn ref_or_json(r: &ReferenceOr<Schema>) -> Value {
    match r {
        ReferenceOr::Item(s) => schema_to_json(s),
        ReferenceOr::Reference { reference } => json!({ "$ref": reference }),
    }
}

fn boxed_ref_or_json(r: &ReferenceOr<Box<Schema>>) -> Value {
    match r {
        ReferenceOr::Item(s) => schema_to_json(s),
        ReferenceOr::Reference { reference } => json!({ "$ref": reference }),
    }
}

#[must_use]
pub fn schema_to_json(schema: &Schema) -> Value {
    let mut out = Map::new();
    let data = &schema.schema_data;
    if let Some(desc) = &data.description {
        out.insert("description".into(), json!(desc));
    }
    if let Some(default) = &data.default {
        out.insert("default".into(), default.clone());
    }

    match &schema.schema_kind {
        SchemaKind::Type(Type::String(s)) => {
            out.insert("type".into(), json!("string"));
            let values: Vec<&String> = s.enumeration.iter().flatten().collect();
            if !values.is_empty() {
                out.insert("enum".into(), json!(values));
            }
            if let Some(max) = s.max_length {
                out.insert("maxLength".into(), json!(max));
            }
        }
        SchemaKind::Type(Type::Integer(i)) => {
            out.insert("type".into(), json!("integer"));
            if let Some(min) = i.minimum {
                out.insert("minimum".into(), json!(min));
            }
            if let Some(max) = i.maximum {
                out.insert("maximum".into(), json!(max));
            }
            let values: Vec<i64> = i.enumeration.iter().flatten().copied().collect();
            if !values.is_empty() {
                out.insert("enum".into(), json!(values));
            }
        }
        SchemaKind::Type(Type::Number(n)) => {
            out.insert("type".into(), json!("number"));
            if let Some(min) = n.minimum {
                out.insert("minimum".into(), json!(min));
            }
            if let Some(max) = n.maximum {
                out.insert("maximum".into(), json!(max));
            }
        }
        SchemaKind::Type(Type::Boolean(_)) => {
            out.insert("type".into(), json!("boolean"));
        }
        SchemaKind::Type(Type::Array(a)) => {
            out.insert("type".into(), json!("array"));
            if let Some(items) = &a.items {
                out.insert("items".into(), boxed_ref_or_json(items));
            }
            if let Some(max) = a.max_items {
                out.insert("maxItems".into(), json!(max));
            }
        }
        SchemaKind::Type(Type::Object(o)) => {
            out.insert("type".into(), json!("object"));
            if !o.properties.is_empty() {
                let props: Map<String, Value> = o
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), boxed_ref_or_json(v)))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
            }
            if !o.required.is_empty() {
                out.insert("required".into(), json!(o.required));
            }
        }
        SchemaKind::OneOf { one_of } => {
            out.insert("oneOf".into(), one_of.iter().map(ref_or_json).collect());
        }
        SchemaKind::AnyOf { any_of } => {
            out.insert("anyOf".into(), any_of.iter().map(ref_or_json).collect());
        }
        SchemaKind::AllOf { all_of } => {
            out.insert("allOf".into(), all_of.iter().map(ref_or_json).collect());
        }
        SchemaKind::Not { .. } | SchemaKind::Any(_) => {}
    }

    Value::Object(out)
}

/// `{"type":"object","properties":{...},"required":[...]}` for a tool's arguments.
#[must_use]
pub fn build_input_schema(args: &[ArgSchema<'_>]) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<&str> = Vec::new();

    for arg in args {
        properties.insert(arg.name.to_string(), arg.schema.clone());
        if arg.required {
            required.push(arg.name);
        }
    }

    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// MCP output schemas must be objects; the response body is exposed as `body`.
///
/// # Errors
///
/// Returns an error if `body_schema` is not a JSON object.
pub fn wrap_body_output_schema(body_schema: &Value) -> Result<Arc<JsonObject>> {
    if !body_schema.is_object() {
        return Err(OpenApiToolsError::Config(
            "output schema must be a JSON object".to_string(),
        ));
    }
    let mut obj = JsonObject::new();
    obj.insert("type".into(), json!("object"));
    obj.insert("required".into(), json!(["body"]));
    obj.insert("properties".into(), json!({ "body": body_schema }));
    Ok(Arc::new(obj))
}

/// The JSON Schema `type` of a property, if it declares a single one.
#[must_use]
pub fn json_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// Render a scalar for a URL or header. Non-scalars render as compact JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
