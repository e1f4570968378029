use serde_json::{json, Map, Value as JsonValue};

use crate::{client::CLIENT_VERSION, Failure};

/// Error type returned by the native [`EngineClient`](crate::EngineClient) API.
///
/// The `*_effect` entry points never return this type: it is normalized into a
/// [`DbError`](crate::DbError) first.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Error envelope returned by the query engine.
    #[error("engine error {}: {message}", .code.as_deref().unwrap_or("<no code>"))]
    Engine {
        /// Engine-specific error code, e.g. `P2002`.
        code: Option<String>,
        /// Human readable message from the engine.
        message: String,
        /// Structured diagnostics attached by the engine.
        meta: JsonValue,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl EngineError {
    /// JSON view of the fields the normalizer knows how to read.
    pub fn fields(&self) -> JsonValue {
        let mut fields = match self {
            EngineError::Transport(err) => transport_fields(err),
            EngineError::Http { body, .. } => match serde_json::from_str::<JsonValue>(body) {
                Ok(JsonValue::Object(map)) => map,
                _ => Map::new(),
            },
            EngineError::Engine {
                code,
                message,
                meta,
            } => {
                let mut map = Map::new();
                if let Some(code) = code {
                    map.insert("code".to_owned(), json!(code));
                }
                map.insert("message".to_owned(), json!(message));
                map.insert("meta".to_owned(), meta.clone());
                map
            }
            EngineError::Decode(message) => {
                let mut map = Map::new();
                map.insert("message".to_owned(), json!(message));
                map
            }
        };
        fields
            .entry("clientVersion")
            .or_insert_with(|| json!(CLIENT_VERSION));
        JsonValue::Object(fields)
    }
}

// Mirrors the codes the engine itself reports when it cannot reach or
// finish talking to the database.
fn transport_fields(err: &reqwest::Error) -> Map<String, JsonValue> {
    let mut map = Map::new();
    let code = if err.is_timeout() {
        Some("P1008")
    } else if is_connect(err) {
        Some("P1001")
    } else {
        None
    };
    if let Some(code) = code {
        map.insert("code".to_owned(), json!(code));
    }
    map.insert("message".to_owned(), json!(err.to_string()));
    map
}

fn is_connect(err: &reqwest::Error) -> bool {
    // is_connect() is not available on wasm32 targets (no TCP)
    #[cfg(not(target_arch = "wasm32"))]
    {
        err.is_connect()
    }
    #[cfg(target_arch = "wasm32")]
    {
        let _ = err;
        false
    }
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        let fields = err.fields();
        Failure::error(err, fields)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{DbError, EngineError, ErrorCode, CLIENT_VERSION};

    #[test]
    fn engine_error_fields_carry_code_meta_and_version() {
        let err = EngineError::Engine {
            code: Some("P2002".to_owned()),
            message: "Unique constraint failed on the fields: (`email`)".to_owned(),
            meta: json!({ "target": ["email"] }),
        };

        let fields = err.fields();
        assert_eq!(fields["code"], "P2002");
        assert_eq!(fields["meta"]["target"][0], "email");
        assert_eq!(fields["clientVersion"], CLIENT_VERSION);
    }

    #[test]
    fn http_error_with_json_body_exposes_body_fields() {
        let err = EngineError::Http {
            status: 401,
            body: json!({ "errorCode": "P1010", "clientVersion": "5.0.0" }).to_string(),
        };

        let normalized = DbError::from(err);
        assert_eq!(normalized.code(), ErrorCode::AccessDenied);
        assert_eq!(normalized.vendor_code(), Some("P1010"));
        assert_eq!(normalized.client_version(), Some("5.0.0"));
    }

    #[test]
    fn http_error_with_text_body_is_unknown() {
        let err = EngineError::Http {
            status: 502,
            body: "bad gateway".to_owned(),
        };

        let normalized = DbError::from(err);
        assert_eq!(normalized.code(), ErrorCode::Unknown);
        assert_eq!(normalized.vendor_code(), None);
        assert_eq!(normalized.client_version(), Some(CLIENT_VERSION));
    }

    #[test]
    fn decode_error_keeps_typed_source() {
        let normalized = DbError::from(EngineError::Decode("bad json".to_owned()));
        let source = std::error::Error::source(&normalized).expect("must expose source");
        assert_eq!(source.to_string(), "decode error: bad json");
    }
}
