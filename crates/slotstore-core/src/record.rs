use serde::{Deserialize, Serialize};

/// A stored user. `id` is assigned at creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub age: i64,
    pub hobbies: Vec<String>,
}

/// Fields supplied when creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub age: i64,
    pub hobbies: Vec<String>,
}

/// Partial update. Absent fields keep their stored value.
///
/// An `id` key in the incoming JSON is ignored, so an update can never move
/// a record to another id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<Vec<String>>,
}

impl User {
    pub fn from_new(id: impl Into<String>, fields: NewUser) -> Self {
        Self {
            id: id.into(),
            username: fields.username,
            age: fields.age,
            hobbies: fields.hobbies,
        }
    }

    /// Merge `patch` over this record.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(hobbies) = patch.hobbies {
            self.hobbies = hobbies;
        }
    }
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.age.is_none() && self.hobbies.is_none()
    }
}

impl From<NewUser> for UserPatch {
    fn from(fields: NewUser) -> Self {
        Self {
            username: Some(fields.username),
            age: Some(fields.age),
            hobbies: Some(fields.hobbies),
        }
    }
}
