//! Relay messages.
//!
//! Requests are `{"action": ..., "payload": ...}` and responses
//! `{"action": ..., "result": ...}`, with actions spelled `getAll`, `get`,
//! `create`, `update` and `delete`. Correlation does not rely on the action:
//! it rides in the frame's request id.

use serde::{Deserialize, Serialize};
use slotstore_core::{NewUser, User, UserPatch};

/// A request sent by a front-end to its store owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum RelayRequest {
    GetAll,
    Get { id: String },
    Create(NewUser),
    Update { id: String, data: UserPatch },
    Delete { id: String },
}

/// The owner's answer to a [`RelayRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "result", rename_all = "camelCase")]
pub enum RelayResponse {
    GetAll(Vec<User>),
    Get(Option<User>),
    Create(User),
    Update(Option<User>),
    Delete(bool),
    /// The owner could not carry out the request.
    Error { message: String },
}

impl RelayRequest {
    pub fn action(&self) -> &'static str {
        match self {
            RelayRequest::GetAll => "getAll",
            RelayRequest::Get { .. } => "get",
            RelayRequest::Create(_) => "create",
            RelayRequest::Update { .. } => "update",
            RelayRequest::Delete { .. } => "delete",
        }
    }
}

impl RelayResponse {
    pub fn action(&self) -> &'static str {
        match self {
            RelayResponse::GetAll(_) => "getAll",
            RelayResponse::Get(_) => "get",
            RelayResponse::Create(_) => "create",
            RelayResponse::Update(_) => "update",
            RelayResponse::Delete(_) => "delete",
            RelayResponse::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RelayResponse::Error {
            message: message.into(),
        }
    }
}
