/// Best-effort audit trail
///
/// Every decision point of a broadcast request leaves an entry here. Writes
/// never fail the caller; a broken audit store only shows up in the logs.
use crate::db::{AuditEntry, AuditStore, UserId};
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub const ACTION_MAX_CHARS: usize = 100;
pub const DETAILS_MAX_CHARS: usize = 1000;
pub const USER_AGENT_MAX_CHARS: usize = 500;
pub const IP_MAX_CHARS: usize = 45;

/// Audited decision points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UnauthorizedAttempt,
    RateLimitExceeded,
    InvalidRequest,
    ValidationFailed,
    NoRecipientsFound,
    TooManyRecipients,
    DatabaseError,
    BulkEmailInitiated,
    BulkEmailCompleted,
    BulkEmailTimedOut,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UnauthorizedAttempt => "unauthorized_attempt",
            AuditAction::RateLimitExceeded => "rate_limit_exceeded",
            AuditAction::InvalidRequest => "invalid_request",
            AuditAction::ValidationFailed => "validation_failed",
            AuditAction::NoRecipientsFound => "no_recipients_found",
            AuditAction::TooManyRecipients => "too_many_recipients",
            AuditAction::DatabaseError => "database_error",
            AuditAction::BulkEmailInitiated => "bulk_email_initiated",
            AuditAction::BulkEmailCompleted => "bulk_email_completed",
            AuditAction::BulkEmailTimedOut => "bulk_email_timed_out",
        }
    }
}

/// Client details captured from the inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        }

        let ip_address = header(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header(headers, "x-real-ip"))
            .unwrap_or("Unknown");

        let user_agent = header(headers, "user-agent").unwrap_or("Unknown");

        Self {
            ip_address: truncate(ip_address, IP_MAX_CHARS),
            user_agent: truncate(user_agent, USER_AGENT_MAX_CHARS),
        }
    }
}

/// Truncate to at most `max` characters, on a char boundary
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Build the stored form of an entry
    pub fn entry(
        user_id: Option<&UserId>,
        action: &str,
        details: &Value,
        meta: &RequestMeta,
    ) -> AuditEntry {
        let details = serde_json::to_string(details).unwrap_or_else(|_| "{}".to_string());
        let action: String = action
            .chars()
            .filter(|c| !c.is_control())
            .take(ACTION_MAX_CHARS)
            .collect();

        AuditEntry {
            admin_user_id: user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            action,
            details: truncate(&details, DETAILS_MAX_CHARS),
            ip_address: truncate(&meta.ip_address, IP_MAX_CHARS),
            user_agent: truncate(&meta.user_agent, USER_AGENT_MAX_CHARS),
            created_at: Utc::now(),
        }
    }

    /// Append an entry; failures are logged and swallowed
    pub async fn record(
        &self,
        user_id: Option<&UserId>,
        action: AuditAction,
        details: Value,
        meta: &RequestMeta,
    ) {
        let entry = Self::entry(user_id, action.as_str(), &details, meta);

        if let Err(e) = self.store.append(entry).await {
            tracing::error!(action = action.as_str(), error = %e, "Failed to write audit log entry");
        }
    }
}
