//! In-memory credential storage implementation.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::RwLock;

use super::{CredentialStore, StoreError};
use crate::model::Credential;

/// In-memory credential store for testing and snapshot-driven runs.
///
/// Only credential identities are kept; values are never needed to decide
/// authorization or cleanup.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryCredentialStore {
    data: RwLock<BTreeSet<Credential>>,
}

impl MemoryCredentialStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeSet::new()),
        }
    }

    /// Create a memory store with initial data.
    pub fn with_data(data: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            data: RwLock::new(data.into_iter().collect()),
        }
    }

    /// Store a credential. Existing entries are left as-is.
    pub fn insert(&self, context: &str, name: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::BackendError {
            message: format!("lock poisoned: {}", e),
        })?;
        data.insert(Credential::new(context, name));
        Ok(())
    }

    /// Every stored credential, ordered by context then name.
    pub fn snapshot(&self) -> Result<Vec<Credential>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::BackendError {
            message: format!("lock poisoned: {}", e),
        })?;
        Ok(data.iter().cloned().collect())
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.data.read().map(|d| d.len()).unwrap_or(0);
        f.debug_struct("MemoryCredentialStore")
            .field("credentials_count", &count)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn list(&self, contexts: &[String]) -> Result<Vec<Credential>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::BackendError {
            message: format!("lock poisoned: {}", e),
        })?;
        Ok(data
            .iter()
            .filter(|c| contexts.contains(&c.context))
            .cloned()
            .collect())
    }

    async fn delete(&self, context: &str, name: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::BackendError {
            message: format!("lock poisoned: {}", e),
        })?;
        if data.remove(&Credential::new(context, name)) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                context: context.to_string(),
                name: name.to_string(),
            })
        }
    }
}
