use serde_json::Value as JsonValue;

use crate::{
    wire::{self, NamedArg, RawQuery},
    EngineError, Params, Sql, Value,
};

pub(crate) fn build_raw_query(sql: Sql) -> Result<RawQuery, EngineError> {
    match sql.params {
        Params::Positional(values) => {
            let parameters = values
                .into_iter()
                .map(encode_value)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(RawQuery {
                query: sql.text,
                parameters: (!parameters.is_empty()).then_some(parameters),
                named_parameters: None,
            })
        }
        Params::Named(values) => {
            let named_parameters = values
                .into_iter()
                .map(|(name, value)| {
                    let name = normalize_named_parameter_name(&name)?;
                    let value = encode_value(value)?;
                    Ok(NamedArg { name, value })
                })
                .collect::<Result<Vec<_>, EngineError>>()?;

            Ok(RawQuery {
                query: sql.text,
                parameters: None,
                named_parameters: (!named_parameters.is_empty()).then_some(named_parameters),
            })
        }
    }
}

/// Reads the affected-row count returned by `executeRaw`.
pub(crate) fn decode_row_count(data: JsonValue) -> Result<u64, EngineError> {
    let count = match &data {
        JsonValue::Number(number) => number.as_u64(),
        // Some engine builds report counts as decimal strings.
        JsonValue::String(text) => text.parse::<u64>().ok(),
        _ => None,
    };
    count.ok_or_else(|| EngineError::Decode(format!("invalid affected row count: {data}")))
}

pub(crate) fn decode_response(response: wire::EngineResponse) -> Result<JsonValue, EngineError> {
    let Some(entry) = response.errors.into_iter().next() else {
        return Ok(response.data);
    };

    Err(match entry.user_facing_error {
        Some(user_facing) => EngineError::Engine {
            code: user_facing.error_code,
            message: if user_facing.message.is_empty() {
                entry.error
            } else {
                user_facing.message
            },
            meta: user_facing.meta,
        },
        None => EngineError::Engine {
            code: None,
            message: entry.error,
            meta: JsonValue::Null,
        },
    })
}

fn encode_value(value: Value) -> Result<wire::Value, EngineError> {
    match value {
        Value::Null => Ok(wire::Value::Null {}),
        Value::Bool(value) => Ok(wire::Value::Bool { value }),
        Value::Integer(value) => Ok(wire::Value::Integer {
            value: value.to_string(),
        }),
        Value::Float(value) => {
            if !value.is_finite() {
                return Err(EngineError::Decode(format!(
                    "non-finite float value '{value}' is unsupported"
                )));
            }
            Ok(wire::Value::Float {
                value: value.to_string(),
            })
        }
        Value::Text(value) => Ok(wire::Value::Text { value }),
        Value::Json(value) => Ok(wire::Value::Json { value }),
        Value::BlobBase64(base64) => Ok(wire::Value::Blob { base64 }),
    }
}

fn normalize_named_parameter_name(name: &str) -> Result<String, EngineError> {
    let normalized = name.trim_start_matches([':', '@', '$']);
    if normalized.is_empty() {
        return Err(EngineError::Decode(
            "named parameter name cannot be empty".to_owned(),
        ));
    }
    Ok(normalized.to_owned())
}
