/// PostgreSQL storage backend
///
/// Expected tables (owned and migrated outside this service):
///
/// - `employees (name text, email text, pillar text, level text null)`
/// - `admins (user_id uuid primary key)`
/// - `audit_logs (admin_user_id text, action text, details text,
///   ip_address text, user_agent text, created_at timestamptz)`
///
/// The pool is opened with the elevated service credential from
/// `DATABASE_URL`. Row-level security is enforced by the database itself.
use super::{
    AdminStore, AuditEntry, AuditStore, DirectoryStore, Employee, StoreError, StoreResult, UserId,
};
use crate::config::StorageConfig;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Create a PostgreSQL connection pool
pub async fn create_pool(config: &StorageConfig) -> StoreResult<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

    info!("Connecting to PostgreSQL database...");
    info!("  Max connections: {}", config.max_connections);
    info!("  Min connections: {}", config.min_connections);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            StoreError::Sqlx(e)
        })?;

    info!("PostgreSQL connection established");

    Ok(pool)
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &StorageConfig) -> StoreResult<Self> {
        Ok(Self::new(create_pool(config).await?))
    }

    /// Test database connection
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PostgresStore {
    async fn employees_by_pillar(&self, pillar: &str, limit: usize) -> StoreResult<Vec<Employee>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT name, email, pillar, level
            FROM employees
            WHERE pillar = $1
            LIMIT $2
            "#,
        )
        .bind(pillar)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }
}

#[async_trait]
impl AdminStore for PostgresStore {
    async fn is_admin(&self, user_id: &UserId) -> StoreResult<bool> {
        // Ids that are not UUIDs can never be in the allow-list
        let Ok(id) = Uuid::parse_str(user_id.as_str()) else {
            return Ok(false);
        };

        let row = sqlx::query("SELECT 1 FROM admins WHERE user_id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (admin_user_id, action, details, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.admin_user_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
