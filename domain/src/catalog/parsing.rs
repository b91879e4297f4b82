//! Tool listing parsing
//!
//! Services publish their tools as `{"tools": [...]}`. Parameter lists come in
//! several shapes in practice:
//!
//! - a list of names: `["query", "top_k"]`
//! - a list of objects: `[{"name": "query", "type": "string", "required": true}]`
//! - a schema map: `{"query": {"type": "string", "required": true}}`
//! - an MCP style `inputSchema: {properties: {...}, required: [...]}`
//!
//! A single malformed entry rejects the whole listing so that a broken
//! response never half-replaces a good cache.

use super::entities::{ParameterType, ToolDescriptor, ToolParameter};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolListingError {
    #[error("tool listing must be a JSON object with a 'tools' array")]
    MissingToolsArray,

    #[error("tool entry #{index} is not an object with a string 'name'")]
    InvalidEntry { index: usize },

    #[error("tool '{tool}' has malformed parameters: {reason}")]
    InvalidParameters { tool: String, reason: String },
}

/// Parse a discovery response body into tool descriptors
pub fn parse_tool_listing(body: &Value) -> Result<Vec<ToolDescriptor>, ToolListingError> {
    let entries = body
        .get("tools")
        .and_then(Value::as_array)
        .ok_or(ToolListingError::MissingToolsArray)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_tool_entry(index, entry))
        .collect()
}

fn parse_tool_entry(index: usize, entry: &Value) -> Result<ToolDescriptor, ToolListingError> {
    let obj = entry
        .as_object()
        .ok_or(ToolListingError::InvalidEntry { index })?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .ok_or(ToolListingError::InvalidEntry { index })?;
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let parameters = if let Some(schema) = obj.get("inputSchema") {
        parse_input_schema(name, schema)?
    } else {
        match obj.get("parameters") {
            None | Some(Value::Null) => Vec::new(),
            Some(params) => parse_parameters(name, params)?,
        }
    };

    Ok(ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    })
}

/// Parse a `parameters` value in any of the accepted shapes
pub fn parse_parameters(tool: &str, params: &Value) -> Result<Vec<ToolParameter>, ToolListingError> {
    match params {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(ToolParameter::new(name.clone())),
                Value::Object(obj) => {
                    let name = obj.get("name").and_then(Value::as_str).ok_or_else(|| {
                        invalid(tool, "parameter object without a string 'name'")
                    })?;
                    Ok(parameter_from_spec(name, obj, false))
                }
                _ => Err(invalid(tool, "parameter list entries must be strings or objects")),
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(name, spec)| match spec {
                Value::Object(obj) => Ok(parameter_from_spec(name, obj, false)),
                // `{"query": "string"}` shorthand
                Value::String(type_name) => {
                    let mut param = ToolParameter::new(name.clone());
                    param.param_type = ParameterType::parse(type_name);
                    Ok(param)
                }
                _ => Err(invalid(tool, "schema map values must be objects")),
            })
            .collect(),
        _ => Err(invalid(tool, "'parameters' must be a list or a map")),
    }
}

fn parse_input_schema(tool: &str, schema: &Value) -> Result<Vec<ToolParameter>, ToolListingError> {
    let obj = schema
        .as_object()
        .ok_or_else(|| invalid(tool, "'inputSchema' must be an object"))?;
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = obj.get("properties") else {
        return Ok(Vec::new());
    };
    let properties = properties
        .as_object()
        .ok_or_else(|| invalid(tool, "'inputSchema.properties' must be an object"))?;

    properties
        .iter()
        .map(|(name, spec)| {
            let spec = spec
                .as_object()
                .ok_or_else(|| invalid(tool, "schema properties must be objects"))?;
            Ok(parameter_from_spec(
                name,
                spec,
                required.contains(&name.as_str()),
            ))
        })
        .collect()
}

fn parameter_from_spec(name: &str, spec: &Map<String, Value>, required: bool) -> ToolParameter {
    let param_type = spec
        .get("type")
        .and_then(Value::as_str)
        .and_then(ParameterType::parse);
    let required = required
        || spec
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
    let description = spec
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    ToolParameter {
        name: name.to_string(),
        param_type,
        required,
        description: description.to_string(),
    }
}

fn invalid(tool: &str, reason: &str) -> ToolListingError {
    ToolListingError::InvalidParameters {
        tool: tool.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_name_list() {
        let body = json!({
            "tools": [{
                "name": "search_livelabs_workshops",
                "description": "Search workshops",
                "parameters": ["query", "top_k"]
            }]
        });
        let tools = parse_tool_listing(&body).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].parameter_names(), vec!["query", "top_k"]);
        assert!(tools[0].parameters[0].param_type.is_none());
    }

    #[test]
    fn test_parse_schema_map() {
        let body = json!({
            "tools": [{
                "name": "search_livelabs_workshops",
                "parameters": {
                    "query": {"type": "string", "required": true, "description": "Search text"},
                    "top_k": {"type": "integer"}
                }
            }]
        });
        let tools = parse_tool_listing(&body).unwrap();
        let query = tools[0].parameter("query").unwrap();
        assert!(query.required);
        assert_eq!(query.param_type, Some(ParameterType::String));
        assert_eq!(
            tools[0].parameter("top_k").unwrap().param_type,
            Some(ParameterType::Integer)
        );
    }

    #[test]
    fn test_parse_object_list_and_input_schema() {
        let body = json!({
            "tools": [
                {
                    "name": "update_skills",
                    "parameters": [{"name": "user_id", "type": "int", "required": true}]
                },
                {
                    "name": "get_progress",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"user_id": {"type": "integer"}},
                        "required": ["user_id"]
                    }
                }
            ]
        });
        let tools = parse_tool_listing(&body).unwrap();
        assert_eq!(
            tools[0].parameters[0].param_type,
            Some(ParameterType::Integer)
        );
        assert!(tools[1].parameters[0].required);
    }

    #[test]
    fn test_missing_parameters_is_empty_schema() {
        let body = json!({"tools": [{"name": "ping"}]});
        let tools = parse_tool_listing(&body).unwrap();
        assert!(!tools[0].has_schema());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            parse_tool_listing(&json!({"items": []})),
            Err(ToolListingError::MissingToolsArray)
        );
        assert_eq!(
            parse_tool_listing(&json!({"tools": [{"description": "no name"}]})),
            Err(ToolListingError::InvalidEntry { index: 0 })
        );
        assert!(matches!(
            parse_tool_listing(&json!({"tools": [{"name": "x", "parameters": 3}]})),
            Err(ToolListingError::InvalidParameters { .. })
        ));
    }
}
