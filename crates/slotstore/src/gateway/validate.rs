use jsonschema::Validator;
use serde_json::{json, Map, Value};
use uuid::{Uuid, Variant, Version};

use crate::gateway::error::{GatewayError, Result};

const USER_FIELDS: [&str; 3] = ["username", "age", "hobbies"];

/// True when `id` is a hyphenated RFC 4122 version 4 UUID.
pub fn is_valid_user_id(id: &str) -> bool {
    if id.len() != 36 {
        return false;
    }
    match Uuid::try_parse(id) {
        Ok(uuid) => {
            uuid.get_version() == Some(Version::Random) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}

/// Why a create or update body was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRejection {
    /// A required field is absent (or nothing to update).
    MissingFields,
    /// Fields are present but of the wrong type.
    InvalidData,
}

/// Compiled JSON Schemas for user bodies.
///
/// Field presence is checked first so that a missing field and a mistyped
/// one produce different rejections.
pub struct PayloadValidator {
    fields: Validator,
}

impl PayloadValidator {
    pub fn new() -> Result<Self> {
        let fields = jsonschema::validator_for(&user_fields_schema())
            .map_err(|err| GatewayError::Schema(err.to_string()))?;
        Ok(Self { fields })
    }

    /// Check a create body: all three fields present and well typed.
    pub fn check_create(&self, body: &Value) -> std::result::Result<(), PayloadRejection> {
        let object = body.as_object().ok_or(PayloadRejection::MissingFields)?;
        if USER_FIELDS.iter().any(|field| !has_field(object, field)) {
            return Err(PayloadRejection::MissingFields);
        }
        self.check_types(body)
    }

    /// Check an update body: at least one field present, all well typed.
    pub fn check_update(&self, body: &Value) -> std::result::Result<(), PayloadRejection> {
        let object = body.as_object().ok_or(PayloadRejection::MissingFields)?;
        if !USER_FIELDS.iter().any(|field| has_field(object, field)) {
            return Err(PayloadRejection::MissingFields);
        }
        self.check_types(body)
    }

    fn check_types(&self, body: &Value) -> std::result::Result<(), PayloadRejection> {
        let mut errors = self.fields.iter_errors(body);
        if let Some(first) = errors.next() {
            tracing::debug!(error = %first, "user payload rejected");
            return Err(PayloadRejection::InvalidData);
        }
        Ok(())
    }
}

fn has_field(object: &Map<String, Value>, field: &str) -> bool {
    object.get(field).is_some_and(|value| !value.is_null())
}

fn user_fields_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "username": { "type": "string" },
            "age": { "type": "integer" },
            "hobbies": {
                "type": "array",
                "items": { "type": "string" }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_v4_uuids() {
        assert!(is_valid_user_id(&Uuid::new_v4().to_string()));
        assert!(is_valid_user_id("0f8fad5b-d9cb-469f-a165-70867728950e"));
        // Version 1.
        assert!(!is_valid_user_id("c232ab00-9414-11ec-b3c8-9e6bdeced846"));
        // Simple form without hyphens.
        assert!(!is_valid_user_id("0f8fad5bd9cb469fa16570867728950e"));
        assert!(!is_valid_user_id("not-a-uuid"));
        assert!(!is_valid_user_id(""));
    }

    #[test]
    fn create_requires_every_field() {
        let validator = PayloadValidator::new().unwrap();
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": 1, "hobbies": []})),
            Ok(())
        );
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": 1})),
            Err(PayloadRejection::MissingFields)
        );
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": null, "hobbies": []})),
            Err(PayloadRejection::MissingFields)
        );
        assert_eq!(
            validator.check_create(&json!([1, 2])),
            Err(PayloadRejection::MissingFields)
        );
    }

    #[test]
    fn create_rejects_wrong_types() {
        let validator = PayloadValidator::new().unwrap();
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": "old", "hobbies": []})),
            Err(PayloadRejection::InvalidData)
        );
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": 3, "hobbies": [1]})),
            Err(PayloadRejection::InvalidData)
        );
        assert_eq!(
            validator.check_create(&json!({"username": "a", "age": 3.5, "hobbies": []})),
            Err(PayloadRejection::InvalidData)
        );
    }

    #[test]
    fn update_needs_one_field() {
        let validator = PayloadValidator::new().unwrap();
        assert_eq!(validator.check_update(&json!({"age": 31})), Ok(()));
        assert_eq!(
            validator.check_update(&json!({})),
            Err(PayloadRejection::MissingFields)
        );
        assert_eq!(
            validator.check_update(&json!({"id": "x"})),
            Err(PayloadRejection::MissingFields)
        );
        assert_eq!(
            validator.check_update(&json!({"username": 5})),
            Err(PayloadRejection::InvalidData)
        );
    }
}
