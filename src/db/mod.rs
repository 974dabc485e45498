/// Storage collaborators
///
/// The directory, the admin allow-list and the audit log are owned by an
/// external database. The core only talks to them through these traits, so the
/// PostgreSQL backend and the in-memory backend are interchangeable.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{AuditEntry, Employee, UserId};
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Employee directory, queryable by pillar
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Employees whose pillar equals `pillar` exactly, at most `limit` rows
    async fn employees_by_pillar(&self, pillar: &str, limit: usize) -> StoreResult<Vec<Employee>>;
}

/// Admin allow-list
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn is_admin(&self, user_id: &UserId) -> StoreResult<bool>;
}

/// Append-only audit log
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()>;
}
