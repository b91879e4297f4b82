//! Parameter validation and coercion against a tool's declared schema
//!
//! Coercion is lightweight: values that have an obvious lossless reading as the
//! declared type are converted (`"5"` → `5`, `"a, b"` → `["a", "b"]`); anything
//! else is rejected so it is never forwarded to the service.

use super::entities::{ParameterType, ToolDescriptor};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingRequired { tool: String, parameter: String },

    #[error("Parameter '{parameter}' of tool '{tool}' expects {expected}, got {actual}")]
    TypeMismatch {
        tool: String,
        parameter: String,
        expected: ParameterType,
        actual: String,
    },
}

/// Validator for outgoing tool parameters
///
/// Pure domain logic, no I/O.
pub trait ParameterValidator {
    fn validate(&self, params: &Map<String, Value>, tool: &ToolDescriptor)
    -> Result<(), ParameterError>;
}

/// Checks required parameters and declared types.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl ParameterValidator for SchemaValidator {
    fn validate(
        &self,
        params: &Map<String, Value>,
        tool: &ToolDescriptor,
    ) -> Result<(), ParameterError> {
        for param in &tool.parameters {
            match params.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ParameterError::MissingRequired {
                        tool: tool.name.clone(),
                        parameter: param.name.clone(),
                    });
                }
                Some(value) if !value.is_null() => {
                    if let Some(expected) = param.param_type
                        && !matches_type(value, expected)
                    {
                        return Err(ParameterError::TypeMismatch {
                            tool: tool.name.clone(),
                            parameter: param.name.clone(),
                            expected,
                            actual: json_type_name(value).to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Coerce `params` to the tool's declared names and types.
///
/// `aliases` maps canonical names to service field names; a declared parameter
/// is looked up under its own name first, then under any canonical name that
/// aliases to it. Null values are dropped, undeclared keys pass through, and
/// the result is validated with [`SchemaValidator`].
pub fn coerce_parameters(
    params: &Map<String, Value>,
    tool: &ToolDescriptor,
    aliases: &BTreeMap<String, String>,
) -> Result<Map<String, Value>, ParameterError> {
    let mut out: Map<String, Value> = params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for param in &tool.parameters {
        // Rename a canonical key onto the declared name when the service uses an alias
        if !out.contains_key(&param.name)
            && let Some((canonical, _)) = aliases.iter().find(|(_, field)| **field == param.name)
            && let Some(value) = out.remove(canonical)
        {
            out.insert(param.name.clone(), value);
        }

        let Some(expected) = param.param_type else {
            continue;
        };
        if let Some(value) = out.get_mut(&param.name) {
            match coerce_value(value, expected) {
                Some(coerced) => *value = coerced,
                None => {
                    return Err(ParameterError::TypeMismatch {
                        tool: tool.name.clone(),
                        parameter: param.name.clone(),
                        expected,
                        actual: json_type_name(value).to_string(),
                    });
                }
            }
        }
    }

    SchemaValidator.validate(&out, tool)?;
    Ok(out)
}

/// Convert a single value to `expected`, or `None` when there is no sensible reading.
pub fn coerce_value(value: &Value, expected: ParameterType) -> Option<Value> {
    if matches_type(value, expected) {
        return Some(value.clone());
    }
    match (expected, value) {
        (ParameterType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParameterType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (ParameterType::String, Value::Array(items)) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar_to_string).collect();
            parts.map(|p| Value::String(p.join(", ")))
        }

        (ParameterType::Integer, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64))),
        (ParameterType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(|i| Value::Number(i.into()))
        }

        (ParameterType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParameterType::Boolean, Value::String(s)) => {
            match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            }
        }
        (ParameterType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },

        (ParameterType::Array, Value::String(s)) => Some(Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )),
        (ParameterType::Array, Value::Number(_) | Value::Bool(_)) => {
            Some(Value::Array(vec![value.clone()]))
        }

        _ => None,
    }
}

fn matches_type(value: &Value, expected: ParameterType) -> bool {
    match expected {
        ParameterType::String => value.is_string(),
        ParameterType::Integer => value.is_i64() || value.is_u64(),
        ParameterType::Number => value.is_number(),
        ParameterType::Boolean => value.is_boolean(),
        ParameterType::Array => value.is_array(),
        ParameterType::Object => value.is_object(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
