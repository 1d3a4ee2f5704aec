use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use slotstore_core::{NewUser, UserPatch};
use tracing::{debug, error};

use crate::gateway::error::{GatewayError, Result};
use crate::gateway::message::{
    GatewayRequest, GatewayResponse, INVALID_JSON, INVALID_USER_DATA, INVALID_USER_ID,
    METHOD_NOT_ALLOWED, MISSING_REQUIRED_FIELDS, STATUS_METHOD_NOT_ALLOWED,
};
use crate::gateway::service::UserService;
use crate::gateway::validate::{is_valid_user_id, PayloadRejection, PayloadValidator};

type Outcome = std::result::Result<GatewayResponse, GatewayResponse>;

/// Turns external calls into store operations and store results into
/// status-coded responses.
pub struct Gateway<S> {
    service: S,
    validator: PayloadValidator,
}

impl<S: UserService> Gateway<S> {
    pub fn new(service: S) -> Result<Self> {
        Ok(Self {
            service,
            validator: PayloadValidator::new()?,
        })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Handle a raw request envelope.
    pub fn handle_bytes(&self, raw: &[u8]) -> GatewayResponse {
        match serde_json::from_slice::<GatewayRequest>(raw) {
            Ok(request) => self.handle(request),
            Err(err) => {
                debug!(error = %err, "unparseable gateway request");
                GatewayResponse::bad_request(INVALID_JSON)
            }
        }
    }

    pub fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let outcome = match request.action.as_str() {
            "getAll" => self.get_all(),
            "get" => self.get(&request.payload),
            "create" => self.create(request.payload),
            "update" => self.update(request.payload),
            "delete" => self.delete(&request.payload),
            other => {
                debug!(action = other, "unknown gateway action");
                Err(GatewayResponse::message(
                    STATUS_METHOD_NOT_ALLOWED,
                    METHOD_NOT_ALLOWED,
                ))
            }
        };
        outcome.unwrap_or_else(|response| response)
    }

    fn get_all(&self) -> Outcome {
        let users = self.service.get_all().map_err(internal)?;
        Ok(GatewayResponse::ok(to_body(&users)?))
    }

    fn get(&self, payload: &Value) -> Outcome {
        let id = user_id(payload)?;
        match self.service.get(id).map_err(internal)? {
            Some(user) => Ok(GatewayResponse::ok(to_body(&user)?)),
            None => Err(GatewayResponse::not_found()),
        }
    }

    fn create(&self, payload: Value) -> Outcome {
        let body = raw_body(payload)?;
        self.validator
            .check_create(&body)
            .map_err(rejection_response)?;
        let fields: NewUser = typed(body)?;

        let user = self.service.create(fields).map_err(internal)?;
        Ok(GatewayResponse::created(to_body(&user)?))
    }

    fn update(&self, payload: Value) -> Outcome {
        let id = user_id(&payload)?.to_string();
        let data = match payload {
            Value::Object(mut object) => object.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        let body = raw_body(data)?;
        self.validator
            .check_update(&body)
            .map_err(rejection_response)?;
        let patch: UserPatch = typed(body)?;

        match self.service.update(&id, patch).map_err(internal)? {
            Some(user) => Ok(GatewayResponse::ok(to_body(&user)?)),
            None => Err(GatewayResponse::not_found()),
        }
    }

    fn delete(&self, payload: &Value) -> Outcome {
        let id = user_id(payload)?;
        if self.service.delete(id).map_err(internal)? {
            Ok(GatewayResponse::no_content())
        } else {
            Err(GatewayResponse::not_found())
        }
    }
}

fn user_id(payload: &Value) -> std::result::Result<&str, GatewayResponse> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| is_valid_user_id(id))
        .ok_or_else(|| GatewayResponse::bad_request(INVALID_USER_ID))
}

/// A body given as a string is raw JSON text.
fn raw_body(payload: Value) -> std::result::Result<Value, GatewayResponse> {
    match payload {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|_| GatewayResponse::bad_request(INVALID_JSON))
        }
        other => Ok(other),
    }
}

fn typed<T: DeserializeOwned>(body: Value) -> std::result::Result<T, GatewayResponse> {
    serde_json::from_value(body).map_err(|err| {
        debug!(error = %err, "user payload does not fit the record");
        GatewayResponse::bad_request(INVALID_USER_DATA)
    })
}

fn rejection_response(rejection: PayloadRejection) -> GatewayResponse {
    match rejection {
        PayloadRejection::MissingFields => GatewayResponse::bad_request(MISSING_REQUIRED_FIELDS),
        PayloadRejection::InvalidData => GatewayResponse::bad_request(INVALID_USER_DATA),
    }
}

fn to_body<T: Serialize>(value: &T) -> std::result::Result<Value, GatewayResponse> {
    serde_json::to_value(value).map_err(|err| internal(GatewayError::Json(err)))
}

fn internal(err: GatewayError) -> GatewayResponse {
    error!(error = %err, "user operation failed");
    GatewayResponse::internal_error()
}
