//! Per-tool credential requirement resolution.
//!
//! Each tool a [`ToolUser`] references is resolved independently to the list
//! of credential names it needs:
//! - external tools are loaded through an [`ExternalToolResolver`]
//! - internal tools are read from the [`ResourceGraph`]; a tool that doesn't
//!   exist yet is skipped, while one that exists without a resolved status
//!   aborts the pass

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolcredError;
use crate::external::{ExternalToolResolver, credential_names_for_external};
use crate::graph::ResourceGraph;
use crate::model::{ToolRef, ToolUser};

/// Credential names required by one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub tool: String,
    pub credential_names: Vec<String>,
}

/// Resolves which credentials each referenced tool requires.
#[derive(Clone)]
pub struct ToolRequirementResolver {
    graph: Arc<dyn ResourceGraph>,
    external: Arc<dyn ExternalToolResolver>,
}

impl ToolRequirementResolver {
    pub fn new(graph: Arc<dyn ResourceGraph>, external: Arc<dyn ExternalToolResolver>) -> Self {
        Self { graph, external }
    }

    /// Credential names required by a single tool.
    ///
    /// Returns `Ok(None)` when `tool` is an internal reference that isn't in
    /// the graph. Names are returned in source order without deduplication.
    pub async fn requirement_for(
        &self,
        namespace: &str,
        tool: &str,
    ) -> Result<Option<Vec<String>>, ToolcredError> {
        match ToolRef::parse(tool) {
            ToolRef::External(locator) => {
                let names = credential_names_for_external(self.external.as_ref(), locator).await?;
                Ok(Some(names))
            }
            ToolRef::Internal(name) => {
                let Some(reference) = self.graph.get_tool_reference(namespace, name).await? else {
                    warn!(namespace, tool = name, "referenced tool not found, skipping");
                    return Ok(None);
                };
                let resolved = reference
                    .status
                    .tool
                    .ok_or_else(|| ToolcredError::MissingToolStatus {
                        tool: name.to_string(),
                    })?;
                Ok(Some(resolved.credential_names))
            }
        }
    }

    /// Resolve every tool of `user`, in the user's tool order.
    ///
    /// Skipped tools are absent from the result. The first error aborts.
    pub async fn resolve_all(
        &self,
        user: &dyn ToolUser,
    ) -> Result<Vec<ToolRequirement>, ToolcredError> {
        let mut requirements = Vec::with_capacity(user.tools().len());
        for tool in user.tools() {
            if let Some(credential_names) = self.requirement_for(user.namespace(), tool).await? {
                debug!(user = user.name(), tool = %tool, ?credential_names, "resolved tool requirement");
                requirements.push(ToolRequirement {
                    tool: tool.clone(),
                    credential_names,
                });
            }
        }
        Ok(requirements)
    }
}

impl std::fmt::Debug for ToolRequirementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRequirementResolver").finish_non_exhaustive()
    }
}
