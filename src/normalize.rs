//! Closed error taxonomy and the normalizer that maps client failures onto it.
//!
//! Any failure produced by a database client is turned into exactly one
//! [`DbError`]. Vendor codes the table below does not know about become
//! [`ErrorCode::Unknown`]; nothing is left unclassified.

use std::{error::Error as StdError, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

/// The ten causes every database failure is classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Unknown,
    InvalidState,
    DatabaseUnreachable,
    Timeout,
    AccessDenied,
    InvalidArguments,
    DbFnUnimplemented,
    UniqueConstraintViolation,
    ForeignKeyConstraintViolation,
}

impl ErrorCode {
    /// Every taxonomy member, in declaration order.
    pub const ALL: [ErrorCode; 10] = [
        ErrorCode::NotFound,
        ErrorCode::Unknown,
        ErrorCode::InvalidState,
        ErrorCode::DatabaseUnreachable,
        ErrorCode::Timeout,
        ErrorCode::AccessDenied,
        ErrorCode::InvalidArguments,
        ErrorCode::DbFnUnimplemented,
        ErrorCode::UniqueConstraintViolation,
        ErrorCode::ForeignKeyConstraintViolation,
    ];

    /// Maps an engine vendor code (`P2002`, ...) onto the taxonomy.
    ///
    /// The table is specific to the query engine this crate talks to. A
    /// different engine needs its own table.
    pub fn classify(vendor_code: &str) -> Self {
        match vendor_code {
            "P1001" | "P1011" | "P1013" => ErrorCode::DatabaseUnreachable,
            "P1008" | "P2024" => ErrorCode::Timeout,
            "P1010" => ErrorCode::AccessDenied,
            "P2000" | "P2009" | "P2012" | "P2013" => ErrorCode::InvalidArguments,
            "P2002" => ErrorCode::UniqueConstraintViolation,
            "P2003" => ErrorCode::ForeignKeyConstraintViolation,
            "P2001" | "P2015" | "P2018" | "P2025" => ErrorCode::NotFound,
            "P2005" => ErrorCode::InvalidState,
            "P2026" => ErrorCode::DbFnUnimplemented,
            _ => ErrorCode::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::DatabaseUnreachable => "DATABASE_UNREACHABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::DbFnUnimplemented => "DB_FN_UNIMPLEMENTED",
            ErrorCode::UniqueConstraintViolation => "UNIQUE_CONSTRAINT_VIOLATION",
            ErrorCode::ForeignKeyConstraintViolation => "FOREIGN_KEY_CONSTRAINT_VIOLATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that is not a taxonomy name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code '{0}'")]
pub struct ParseErrorCodeError(pub String);

impl FromStr for ErrorCode {
    type Err = ParseErrorCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| ParseErrorCodeError(s.to_owned()))
    }
}

/// The original failure a [`DbError`] was built from.
#[derive(Clone, Debug)]
pub enum Cause {
    /// Failure that arrived as plain data (a string, an error document, ...).
    Value(JsonValue),
    /// Failure raised by the client as a typed error.
    Error(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Cause {
    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            Cause::Value(value) => Some(value),
            Cause::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Cause::Value(_) => None,
            Cause::Error(err) => Some(err.as_ref()),
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            Cause::Value(JsonValue::String(message)) => Some(message.clone()),
            Cause::Value(JsonValue::Object(map)) => map
                .get("message")
                .and_then(JsonValue::as_str)
                .map(str::to_owned),
            Cause::Value(_) => None,
            Cause::Error(err) => Some(err.to_string()),
        }
    }
}

// Typed errors compare by identity: two causes are equal only when they share
// the same allocation.
impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cause::Value(a), Cause::Value(b)) => a == b,
            (Cause::Error(a), Cause::Error(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

/// Input to the normalizer: whatever a client call failed with.
#[derive(Clone, Debug)]
pub enum Failure {
    /// Already normalized; passes through untouched.
    Normalized(DbError),
    /// A failure value of unknown shape.
    Value(JsonValue),
    /// A typed client error together with the JSON view of its fields.
    Error {
        source: Arc<dyn StdError + Send + Sync + 'static>,
        fields: JsonValue,
    },
}

impl Failure {
    /// Wraps a typed error whose diagnostic fields are exposed as `fields`.
    pub fn error<E>(error: E, fields: JsonValue) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure::Error {
            source: Arc::new(error),
            fields,
        }
    }

    /// Wraps a typed error that carries no decodable fields.
    pub fn opaque<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure::error(error, JsonValue::Null)
    }
}

impl From<DbError> for Failure {
    fn from(err: DbError) -> Self {
        Failure::Normalized(err)
    }
}

impl From<JsonValue> for Failure {
    fn from(value: JsonValue) -> Self {
        Failure::Value(value)
    }
}

impl From<String> for Failure {
    fn from(value: String) -> Self {
        Failure::Value(JsonValue::String(value))
    }
}

impl From<&str> for Failure {
    fn from(value: &str) -> Self {
        Failure::Value(JsonValue::String(value.to_owned()))
    }
}

/// Permissive view of a client failure. Every field may be missing and a
/// malformed `meta` decodes as empty; the string fields reject `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeErrorShape {
    #[serde(default, deserialize_with = "string_if_present")]
    client_version: Option<String>,
    #[serde(default, deserialize_with = "string_if_present")]
    code: Option<String>,
    #[serde(default, deserialize_with = "string_if_present")]
    error_code: Option<String>,
    #[serde(default, deserialize_with = "meta_or_empty")]
    meta: Map<String, JsonValue>,
}

impl NativeErrorShape {
    fn decode(value: &JsonValue) -> Option<Self> {
        // serde_json would happily read a struct out of an array positionally.
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }
}

// Only called when the key exists, so an explicit `null` fails the decode.
fn string_if_present<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

fn meta_or_empty<'de, D>(deserializer: D) -> Result<Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// A database failure classified into the closed [`ErrorCode`] taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub struct DbError {
    code: ErrorCode,
    cause: Cause,
    vendor_code: Option<String>,
    client_version: Option<String>,
    meta: Map<String, JsonValue>,
}

impl DbError {
    /// Builds an error directly, without a vendor code.
    pub fn new(code: ErrorCode, cause: impl Into<JsonValue>) -> Self {
        Self {
            code,
            cause: Cause::Value(cause.into()),
            vendor_code: None,
            client_version: None,
            meta: Map::new(),
        }
    }

    /// Normalizes any client failure.
    ///
    /// Already-normalized errors are returned unchanged, so this is safe to
    /// apply more than once.
    pub fn from_unknown(failure: impl Into<Failure>) -> Self {
        match failure.into() {
            Failure::Normalized(err) => err,
            Failure::Value(value) => {
                let shape = NativeErrorShape::decode(&value);
                Self::from_shape(shape, Cause::Value(value))
            }
            Failure::Error { source, fields } => {
                Self::from_shape(NativeErrorShape::decode(&fields), Cause::Error(source))
            }
        }
    }

    fn from_shape(shape: Option<NativeErrorShape>, cause: Cause) -> Self {
        let Some(shape) = shape else {
            return Self {
                code: ErrorCode::Unknown,
                cause,
                vendor_code: None,
                client_version: None,
                meta: Map::new(),
            };
        };

        let vendor_code = shape.code.or(shape.error_code);
        let code = vendor_code
            .as_deref()
            .map_or(ErrorCode::Unknown, ErrorCode::classify);

        Self {
            code,
            cause,
            vendor_code,
            client_version: shape.client_version,
            meta: shape.meta,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn vendor_code(&self) -> Option<&str> {
        self.vendor_code.as_deref()
    }

    pub fn client_version(&self) -> Option<&str> {
        self.client_version.as_deref()
    }

    pub fn meta(&self) -> &Map<String, JsonValue> {
        &self.meta
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UniqueConstraintViolation | ErrorCode::ForeignKeyConstraintViolation
        )
    }

    pub fn is_connection_error(&self) -> bool {
        self.code == ErrorCode::DatabaseUnreachable
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::DatabaseUnreachable | ErrorCode::Timeout
        )
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(vendor_code) = &self.vendor_code {
            write!(f, " ({vendor_code})")?;
        }
        if let Some(message) = self.cause.message() {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl StdError for DbError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Cause::Error(err) => Some(err.as_ref()),
            Cause::Value(_) => None,
        }
    }
}

impl From<Failure> for DbError {
    fn from(failure: Failure) -> Self {
        DbError::from_unknown(failure)
    }
}

impl From<crate::EngineError> for DbError {
    fn from(err: crate::EngineError) -> Self {
        DbError::from_unknown(err)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Cause, DbError, ErrorCode, Failure};

    const TABLE: &[(&str, ErrorCode)] = &[
        ("P1001", ErrorCode::DatabaseUnreachable),
        ("P1011", ErrorCode::DatabaseUnreachable),
        ("P1013", ErrorCode::DatabaseUnreachable),
        ("P1008", ErrorCode::Timeout),
        ("P2024", ErrorCode::Timeout),
        ("P1010", ErrorCode::AccessDenied),
        ("P2000", ErrorCode::InvalidArguments),
        ("P2009", ErrorCode::InvalidArguments),
        ("P2012", ErrorCode::InvalidArguments),
        ("P2013", ErrorCode::InvalidArguments),
        ("P2002", ErrorCode::UniqueConstraintViolation),
        ("P2003", ErrorCode::ForeignKeyConstraintViolation),
        ("P2001", ErrorCode::NotFound),
        ("P2015", ErrorCode::NotFound),
        ("P2018", ErrorCode::NotFound),
        ("P2025", ErrorCode::NotFound),
        ("P2005", ErrorCode::InvalidState),
        ("P2026", ErrorCode::DbFnUnimplemented),
    ];

    #[test]
    fn known_vendor_codes_map_to_their_cause() {
        for (vendor, expected) in TABLE {
            let err = DbError::from_unknown(json!({ "code": vendor }));
            assert_eq!(err.code(), *expected, "vendor code {vendor}");
            assert_eq!(err.vendor_code(), Some(*vendor));
        }
    }

    #[test]
    fn unlisted_vendor_codes_are_unknown() {
        for vendor in ["P2004", "P3000", "23505", "", "p2002", "P2002 "] {
            assert_eq!(ErrorCode::classify(vendor), ErrorCode::Unknown, "{vendor:?}");
        }
    }

    #[test]
    fn error_code_field_is_used_when_code_is_absent() {
        let err = DbError::from_unknown(json!({ "errorCode": "P1001", "clientVersion": "6.1.0" }));
        assert_eq!(err.code(), ErrorCode::DatabaseUnreachable);
        assert_eq!(err.vendor_code(), Some("P1001"));
        assert_eq!(err.client_version(), Some("6.1.0"));
    }

    #[test]
    fn code_field_wins_over_error_code() {
        let err = DbError::from_unknown(json!({ "code": "P2002", "errorCode": "P1001" }));
        assert_eq!(err.code(), ErrorCode::UniqueConstraintViolation);
        assert_eq!(err.vendor_code(), Some("P2002"));
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let inputs = [
            Failure::from(json!({ "code": "P2025", "meta": { "cause": "Record to delete does not exist." } })),
            Failure::from("boom"),
            Failure::from(json!(42)),
            Failure::opaque(std::io::Error::other("socket closed")),
        ];

        for input in inputs {
            let once = DbError::from_unknown(input);
            let twice = DbError::from_unknown(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn missing_meta_decodes_as_empty() {
        let err = DbError::from_unknown(json!({ "code": "P2002" }));
        assert!(err.meta().is_empty());
    }

    #[test]
    fn malformed_meta_falls_back_to_empty() {
        let err = DbError::from_unknown(json!({ "code": "P2003", "meta": "not a map" }));
        assert_eq!(err.code(), ErrorCode::ForeignKeyConstraintViolation);
        assert!(err.meta().is_empty());
    }

    #[test]
    fn meta_is_preserved() {
        let err = DbError::from_unknown(json!({
            "code": "P2002",
            "meta": { "target": ["email"], "modelName": "User" }
        }));
        assert_eq!(err.meta()["modelName"], "User");
        assert_eq!(err.meta()["target"], json!(["email"]));
    }

    #[test]
    fn plain_string_is_unknown_with_string_cause() {
        let err = DbError::from_unknown("connection reset");
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.vendor_code(), None);
        assert_eq!(err.cause(), &Cause::Value(json!("connection reset")));
        assert_eq!(err.to_string(), "UNKNOWN: connection reset");
    }

    #[test]
    fn non_string_code_does_not_match() {
        let input = json!({ "code": 2002, "clientVersion": "6.1.0" });
        let err = DbError::from_unknown(input.clone());
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.vendor_code(), None);
        assert_eq!(err.client_version(), None);
        assert_eq!(err.cause().as_value(), Some(&input));
    }

    #[test]
    fn null_code_fails_the_whole_decode() {
        let input = json!({ "code": null, "errorCode": "P2002", "clientVersion": "1" });
        let err = DbError::from_unknown(input.clone());
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.vendor_code(), None);
        assert_eq!(err.client_version(), None);
        assert_eq!(err.cause().as_value(), Some(&input));
    }

    #[test]
    fn null_client_version_fails_the_whole_decode() {
        let err = DbError::from_unknown(json!({ "code": "P2025", "clientVersion": null }));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.vendor_code(), None);
    }

    #[test]
    fn null_meta_still_falls_back_to_empty() {
        let err = DbError::from_unknown(json!({ "code": "P2025", "meta": null }));
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.meta().is_empty());
    }

    #[test]
    fn arrays_do_not_decode_positionally() {
        let err = DbError::from_unknown(json!(["6.1.0", "P2002"]));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.client_version(), None);
    }

    #[test]
    fn object_without_codes_keeps_version_and_meta() {
        let err = DbError::from_unknown(json!({
            "message": "engine panicked",
            "clientVersion": "6.1.0",
            "meta": { "backtrace": "..." }
        }));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.vendor_code(), None);
        assert_eq!(err.client_version(), Some("6.1.0"));
        assert_eq!(err.meta()["backtrace"], "...");
        assert_eq!(err.to_string(), "UNKNOWN: engine panicked");
    }

    #[test]
    fn display_includes_vendor_code() {
        let err = DbError::from_unknown(json!({ "code": "P2002", "message": "duplicate email" }));
        assert_eq!(
            err.to_string(),
            "UNIQUE_CONSTRAINT_VIOLATION (P2002): duplicate email"
        );
    }

    #[test]
    fn error_code_names_round_trip() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
            assert_eq!(
                serde_json::to_value(code).expect("must serialize"),
                json!(code.as_str())
            );
        }
        assert!("NOPE".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn predicates_follow_code() {
        assert!(DbError::new(ErrorCode::NotFound, "x").is_not_found());
        assert!(DbError::new(ErrorCode::ForeignKeyConstraintViolation, "x").is_constraint_violation());
        assert!(DbError::new(ErrorCode::DatabaseUnreachable, "x").is_connection_error());
        assert!(DbError::new(ErrorCode::Timeout, "x").is_retryable());
        assert!(!DbError::new(ErrorCode::UniqueConstraintViolation, "x").is_retryable());
    }
}
