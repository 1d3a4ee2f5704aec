use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

pub const INVALID_USER_ID: &str = "Invalid user ID";
pub const MISSING_REQUIRED_FIELDS: &str = "Missing required fields";
pub const INVALID_USER_DATA: &str = "Invalid user data";
pub const INVALID_JSON: &str = "Invalid JSON";
pub const USER_NOT_FOUND: &str = "User not found";
pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// An external call into a front-end.
///
/// `payload` is `{"id": ...}` for `get` and `delete`, the user fields for
/// `create`, and `{"id": ..., "data": {...}}` for `update`. A body given as a
/// JSON string is parsed as raw JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl GatewayRequest {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }
}

/// Status code plus JSON body, mirroring an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl GatewayResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: STATUS_CREATED,
            body,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            body: Value::Null,
        }
    }

    pub fn message(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::message(STATUS_BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::message(STATUS_NOT_FOUND, USER_NOT_FOUND)
    }

    pub fn internal_error() -> Self {
        Self::message(STATUS_INTERNAL_ERROR, INTERNAL_SERVER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `body.message` for error responses.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}
