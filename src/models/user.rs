use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_USER_ID_LENGTH: usize = 128;

/// A person talking to the assistant, identified by the front-end's opaque id
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub user_id: String,
    pub name: Option<String>,
    pub handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields sent when a user first contacts the assistant
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
}

impl NewUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            handle: None,
        }
    }
}

/// Checks an opaque user id coming from the transport layer
pub fn validate_user_id(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("User id cannot be empty".to_string()));
    }
    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "User id must be at most {} bytes",
            MAX_USER_ID_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("42").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_new_user_deserialization() {
        let user: NewUser = serde_json::from_str(r#"{"user_id": "1001", "name": "Ada"}"#).unwrap();
        assert_eq!(user.user_id, "1001");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.handle, None);
    }
}
