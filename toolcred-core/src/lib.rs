//! # toolcred core
//!
//! Credential lifecycle logic for tool users (agents and workflows).
//!
//! This crate provides:
//! - Domain types for tool users, tool references, knowledge entities and credentials
//! - Traits for the credential store, the resource graph and external tool loading
//! - In-memory implementations of those traits
//! - The requirement resolver, authorization evaluator and credential collector
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolcred_core::{Agent, MemoryCredentialStore, MemoryGraph, StaticToolResolver, ToolInfoHandler};
//!
//! async fn reconcile(agent: &mut Agent) -> Result<(), toolcred_core::ToolcredError> {
//!     let handler = ToolInfoHandler::new(
//!         Arc::new(MemoryCredentialStore::new()),
//!         Arc::new(MemoryGraph::new()),
//!         Arc::new(StaticToolResolver::new()),
//!     );
//!     handler.set_tool_info_status(agent).await?;
//!     handler.remove_unneeded_credentials(agent).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod evaluator;
pub mod external;
pub mod gc;
pub mod graph;
pub mod handler;
pub mod model;
pub mod resolver;
pub mod store;

// Re-export commonly used types at crate root
pub use model::{
    Agent,
    Credential,
    KnowledgeSet,
    KnowledgeSource,
    ToolInfo,
    ToolInfos,
    ToolRef,
    ToolReference,
    ToolUser,
    Workflow,
};

pub use store::{
    CredentialStore,
    MemoryCredentialStore,
    StoreError,
};

pub use graph::{
    FieldSelector,
    GraphError,
    GraphObjects,
    MemoryGraph,
    ResourceGraph,
};

pub use external::{
    ExternalError,
    ExternalToolResolver,
    Program,
    StaticToolResolver,
    ToolDefinition,
};

pub use resolver::{ToolRequirement, ToolRequirementResolver};
pub use evaluator::AuthorizationEvaluator;
pub use gc::{CredentialCollector, SweepPlan, SweepReport};
pub use handler::ToolInfoHandler;
pub use error::ToolcredError;
