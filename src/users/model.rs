use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid email regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub status: bool,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of create and update requests. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    #[serde(default = "active")]
    pub status: bool,
    #[serde(default)]
    pub phone: Option<String>,
}

fn active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUser {
    #[error("name must not be empty")]
    EmptyName,

    #[error("'{0}' is not a valid email address")]
    Email(String),
}

impl UserInput {
    pub fn validate(&self) -> Result<(), InvalidUser> {
        if self.name.trim().is_empty() {
            return Err(InvalidUser::EmptyName);
        }
        if !EMAIL.is_match(self.email.trim()) {
            return Err(InvalidUser::Email(self.email.clone()));
        }
        Ok(())
    }
}
