/// Recipient resolution
///
/// Two limits apply: `fetch_limit` bounds what is read from the directory,
/// `send_limit` bounds what is dispatched. A pillar between the two is
/// rejected outright instead of being silently truncated.
use crate::{
    config::BroadcastConfig,
    db::{DirectoryStore, Employee, StoreError},
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no employees in pillar")]
    NoRecipients,
    #[error("{count} recipients exceeds send limit of {limit}")]
    TooMany { count: usize, limit: usize },
    #[error("directory query failed: {0}")]
    Database(#[from] StoreError),
}

#[derive(Clone)]
pub struct RecipientResolver {
    directory: Arc<dyn DirectoryStore>,
    fetch_limit: usize,
    send_limit: usize,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn DirectoryStore>, fetch_limit: usize, send_limit: usize) -> Self {
        Self {
            directory,
            fetch_limit,
            send_limit,
        }
    }

    pub fn from_config(directory: Arc<dyn DirectoryStore>, config: &BroadcastConfig) -> Self {
        Self::new(directory, config.fetch_limit, config.send_limit)
    }

    /// Employees of `pillar`, which must already be validated
    pub async fn resolve(&self, pillar: &str) -> Result<Vec<Employee>, ResolveError> {
        let employees = self
            .directory
            .employees_by_pillar(pillar, self.fetch_limit)
            .await?;

        if employees.is_empty() {
            return Err(ResolveError::NoRecipients);
        }

        if employees.len() > self.send_limit {
            return Err(ResolveError::TooMany {
                count: employees.len(),
                limit: self.send_limit,
            });
        }

        Ok(employees)
    }
}
