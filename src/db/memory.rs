/// In-memory implementation of the storage collaborators
///
/// Backs the test suite and local development through
/// `AppContext::from_parts`. Nothing is durable; all state is lost on restart.
use super::{AdminStore, AuditEntry, AuditStore, DirectoryStore, Employee, StoreResult, UserId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    employees: RwLock<Vec<Employee>>,
    admins: RwLock<HashSet<UserId>>,
    audit_log: RwLock<Vec<AuditEntry>>,
    directory_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_employee(&self, employee: Employee) {
        self.employees.write().await.push(employee);
    }

    pub async fn add_admin(&self, user_id: UserId) {
        self.admins.write().await.insert(user_id);
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit_log.read().await.clone()
    }

    /// Number of directory lookups served so far
    pub fn directory_queries(&self) -> usize {
        self.directory_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn employees_by_pillar(&self, pillar: &str, limit: usize) -> StoreResult<Vec<Employee>> {
        self.directory_queries.fetch_add(1, Ordering::SeqCst);
        let employees = self.employees.read().await;
        Ok(employees
            .iter()
            .filter(|e| e.pillar == pillar)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn is_admin(&self, user_id: &UserId) -> StoreResult<bool> {
        Ok(self.admins.read().await.contains(user_id))
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()> {
        self.audit_log.write().await.push(entry);
        Ok(())
    }
}
