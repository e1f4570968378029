use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRequest<'a, Q: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<&'a str>,
    pub action: &'a str,
    pub query: &'a Q,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_parameters: Option<Vec<NamedArg>>,
}

#[derive(Debug, Serialize)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Null {},
    Bool { value: bool },
    // 64-bit integers travel as strings so JSON number precision does not
    // truncate them.
    Integer { value: String },
    Float { value: String },
    Text { value: String },
    Json { value: JsonValue },
    Blob { base64: String },
}

#[derive(Debug, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub data: JsonValue,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub user_facing_error: Option<UserFacingError>,
}

#[derive(Debug, Deserialize)]
pub struct UserFacingError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: JsonValue,
    #[serde(default)]
    pub error_code: Option<String>,
}
