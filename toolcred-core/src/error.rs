//! Top-level error types for toolcred.

use thiserror::Error;

use crate::external::ExternalError;
use crate::graph::GraphError;
use crate::store::StoreError;

/// Top-level error type encompassing all toolcred errors.
///
/// Every variant aborts the current pass; the caller is expected to retry the
/// whole pass later.
#[derive(Debug, Error)]
pub enum ToolcredError {
    /// Error from credential store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error reading the resource graph.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Error loading or walking an external tool.
    #[error("external tool error: {0}")]
    External(#[from] ExternalError),

    /// An internal tool exists but has not been resolved yet.
    #[error("cannot determine credential status for tool {tool}: no tool status found")]
    MissingToolStatus { tool: String },
}
