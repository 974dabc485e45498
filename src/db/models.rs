/// Directory and audit records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Opaque caller identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employee row from the directory
///
/// `level` is carried through untouched; dispatch only reads `name` and `email`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
    pub name: String,
    pub email: String,
    pub pillar: String,
    pub level: Option<String>,
}

impl Employee {
    pub fn new(name: impl Into<String>, email: impl Into<String>, pillar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            pillar: pillar.into(),
            level: None,
        }
    }
}

/// Append-only audit record, already truncated for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub admin_user_id: String,
    pub action: String,
    /// Serialized JSON details, possibly truncated
    pub details: String,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}
