use serde::{Deserialize, Serialize};

use crate::{models::users::User, Role};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Hash, Eq, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(fmt, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse().map($name)
            }
        }
    };
}

entity_id!(ProjectId);
entity_id!(VersionId);
entity_id!(FileId);
entity_id!(UserId);

/// The `{success, data|error}` wrapper every API response comes in.
///
/// Framework-level failures (validation, missing auth) arrive without the
/// wrapper as `{"detail": ...}`, so every field is optional here.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub detail: Option<serde_json::Value>,
}

/// Outcome of an API call once the envelope is unwrapped.
#[derive(Debug, PartialEq)]
pub enum Reply<T> {
    Success(T),
    Failure(String),
}

impl<T> Envelope<T> {
    /// Unwraps the envelope. `ok` is the transport-level status; a failed
    /// status is a failure even when the body claims success.
    pub fn into_reply(self, ok: bool, fallback: &str) -> Reply<Option<T>> {
        if ok && self.success {
            return Reply::Success(self.data);
        }
        Reply::Failure(self.failure_message(fallback))
    }

    fn failure_message(&self, fallback: &str) -> String {
        if let Some(error) = self.error.as_ref().filter(|x| !x.is_empty()) {
            return error.clone();
        }
        match &self.detail {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(serde_json::Value::Array(entries)) => {
                let messages = entries
                    .iter()
                    .filter_map(|x| x.get("msg").and_then(|msg| msg.as_str()))
                    .collect::<Vec<&str>>();
                if messages.is_empty() {
                    fallback.to_string()
                } else {
                    messages.join("; ")
                }
            }
            _ => fallback.to_string(),
        }
    }
}

// Auth
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// Projects
#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectCreateBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ProjectUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Versions
#[derive(Serialize, Deserialize, Debug)]
pub struct VersionCreateBody {
    pub version_string: String,
}

// Users
#[derive(Serialize, Deserialize, Debug)]
pub struct PasswordUpdateBody {
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectAssignBody {
    pub project_ids: Vec<ProjectId>,
}
