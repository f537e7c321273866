//! Credential storage abstraction.
//!
//! This module provides:
//! - [`CredentialStore`] - Trait for scoped credential storage backends
//! - [`MemoryCredentialStore`] - In-memory implementation for tests and snapshots
//!
//! # Contexts
//!
//! Every credential lives under a context. A tool user owns the context named
//! after itself; its namespace is a second, shared context that is consulted
//! when checking authorization but never swept.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolcred_core::store::{CredentialStore, MemoryCredentialStore};
//!
//! let store = MemoryCredentialStore::new();
//! store.insert("agent1", "search-api-key");
//!
//! let creds = store.list(&["agent1".to_string()]).await.unwrap();
//! assert_eq!(creds.len(), 1);
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Credential;

mod memory;

pub use memory::MemoryCredentialStore;

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The credential does not exist.
    #[error("credential not found: {context}/{name}")]
    NotFound { context: String, name: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },
}

impl StoreError {
    /// Whether this error only reports a missing credential.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Abstraction over credential storage backends.
///
/// Implementations must tolerate concurrent callers working on different
/// contexts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// List every credential stored under any of the given contexts.
    ///
    /// Returns an empty vec if nothing matches.
    async fn list(&self, contexts: &[String]) -> Result<Vec<Credential>, StoreError>;

    /// Delete a single credential.
    ///
    /// Returns [`StoreError::NotFound`] if the credential doesn't exist.
    async fn delete(&self, context: &str, name: &str) -> Result<(), StoreError>;

    /// Names of the credentials stored under the given contexts.
    async fn list_names(&self, contexts: &[String]) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list(contexts)
            .await?
            .into_iter()
            .map(|cred| cred.name)
            .collect())
    }
}
