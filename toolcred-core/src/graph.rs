//! Read-only access to the resource graph.
//!
//! This module provides:
//! - [`ResourceGraph`] - Trait for looking up tools and knowledge entities
//! - [`FieldSelector`] - Owner-name filter used for list calls
//! - [`MemoryGraph`] - In-memory implementation for tests and snapshots

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

use crate::model::{
    AGENT_NAME_FIELD, KNOWLEDGE_SET_NAME_FIELD, KnowledgeSet, KnowledgeSource, ToolReference,
    WORKFLOW_NAME_FIELD,
};

/// Error type for resource graph reads.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The field cannot be used to filter this kind of object.
    #[error("field {field} is not indexed for {kind}")]
    UnsupportedField { kind: &'static str, field: String },

    /// The graph backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },
}

/// Exact-match filter on a single indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub field: String,
    pub value: String,
}

impl FieldSelector {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Read access to the managed resource graph.
///
/// Every call is an I/O boundary. Callers cancel in-flight reads by dropping
/// the returned future.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    /// Look up an internal tool by name.
    ///
    /// Returns `Ok(None)` if the tool doesn't exist.
    async fn get_tool_reference(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ToolReference>, GraphError>;

    /// List knowledge sets in a namespace matching the selector.
    async fn list_knowledge_sets(
        &self,
        namespace: &str,
        selector: &FieldSelector,
    ) -> Result<Vec<KnowledgeSet>, GraphError>;

    /// List knowledge sources in a namespace matching the selector.
    async fn list_knowledge_sources(
        &self,
        namespace: &str,
        selector: &FieldSelector,
    ) -> Result<Vec<KnowledgeSource>, GraphError>;
}

/// Plain collection of graph objects, as loaded from a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphObjects {
    #[serde(default)]
    pub tool_references: Vec<ToolReference>,
    #[serde(default)]
    pub knowledge_sets: Vec<KnowledgeSet>,
    #[serde(default)]
    pub knowledge_sources: Vec<KnowledgeSource>,
}

/// In-memory resource graph.
///
/// # Thread Safety
///
/// Uses an `RwLock` so tests can mutate the graph between passes while
/// handlers hold a shared reference.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    objects: RwLock<GraphObjects>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: GraphObjects) -> Self {
        Self {
            objects: RwLock::new(objects),
        }
    }

    /// Insert or replace a tool reference.
    pub fn put_tool_reference(&self, tool: ToolReference) -> Result<(), GraphError> {
        let mut objects = self.write()?;
        objects
            .tool_references
            .retain(|t| !(t.namespace == tool.namespace && t.name == tool.name));
        objects.tool_references.push(tool);
        Ok(())
    }

    /// Remove a tool reference. Missing tools are ignored.
    pub fn remove_tool_reference(&self, namespace: &str, name: &str) -> Result<(), GraphError> {
        self.write()?
            .tool_references
            .retain(|t| !(t.namespace == namespace && t.name == name));
        Ok(())
    }

    pub fn put_knowledge_set(&self, set: KnowledgeSet) -> Result<(), GraphError> {
        let mut objects = self.write()?;
        objects
            .knowledge_sets
            .retain(|s| !(s.namespace == set.namespace && s.name == set.name));
        objects.knowledge_sets.push(set);
        Ok(())
    }

    pub fn put_knowledge_source(&self, source: KnowledgeSource) -> Result<(), GraphError> {
        let mut objects = self.write()?;
        objects
            .knowledge_sources
            .retain(|s| !(s.namespace == source.namespace && s.name == source.name));
        objects.knowledge_sources.push(source);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, GraphObjects>, GraphError> {
        self.objects.read().map_err(|e| GraphError::BackendError {
            message: format!("lock poisoned: {}", e),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, GraphObjects>, GraphError> {
        self.objects.write().map_err(|e| GraphError::BackendError {
            message: format!("lock poisoned: {}", e),
        })
    }
}

#[async_trait]
impl ResourceGraph for MemoryGraph {
    async fn get_tool_reference(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ToolReference>, GraphError> {
        Ok(self
            .read()?
            .tool_references
            .iter()
            .find(|t| t.namespace == namespace && t.name == name)
            .cloned())
    }

    async fn list_knowledge_sets(
        &self,
        namespace: &str,
        selector: &FieldSelector,
    ) -> Result<Vec<KnowledgeSet>, GraphError> {
        if !is_owner_field(&selector.field) {
            return Err(GraphError::UnsupportedField {
                kind: "KnowledgeSet",
                field: selector.field.clone(),
            });
        }
        Ok(self
            .read()?
            .knowledge_sets
            .iter()
            .filter(|s| s.namespace == namespace)
            .filter(|s| s.field(&selector.field) == Some(selector.value.as_str()))
            .cloned()
            .collect())
    }

    async fn list_knowledge_sources(
        &self,
        namespace: &str,
        selector: &FieldSelector,
    ) -> Result<Vec<KnowledgeSource>, GraphError> {
        if selector.field != KNOWLEDGE_SET_NAME_FIELD {
            return Err(GraphError::UnsupportedField {
                kind: "KnowledgeSource",
                field: selector.field.clone(),
            });
        }
        Ok(self
            .read()?
            .knowledge_sources
            .iter()
            .filter(|s| s.namespace == namespace && s.knowledge_set_name == selector.value)
            .cloned()
            .collect())
    }
}

fn is_owner_field(field: &str) -> bool {
    matches!(field, AGENT_NAME_FIELD | WORKFLOW_NAME_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge_set(name: &str, agent: Option<&str>, workflow: Option<&str>) -> KnowledgeSet {
        KnowledgeSet {
            namespace: "default".into(),
            name: name.into(),
            agent_name: agent.map(String::from),
            workflow_name: workflow.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_get_tool_reference() {
        let graph = MemoryGraph::new();
        graph
            .put_tool_reference(ToolReference::new("default", "search").resolved(["key"]))
            .unwrap();

        let found = graph.get_tool_reference("default", "search").await.unwrap();
        assert!(found.is_some());

        let other_ns = graph.get_tool_reference("other", "search").await.unwrap();
        assert!(other_ns.is_none());

        graph.remove_tool_reference("default", "search").unwrap();
        let gone = graph.get_tool_reference("default", "search").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_list_knowledge_sets_by_owner() {
        let graph = MemoryGraph::new();
        graph.put_knowledge_set(knowledge_set("ks1", Some("agent1"), None)).unwrap();
        graph.put_knowledge_set(knowledge_set("ks2", None, Some("wf1"))).unwrap();
        graph.put_knowledge_set(knowledge_set("ks3", Some("agent2"), None)).unwrap();

        let sets = graph
            .list_knowledge_sets("default", &FieldSelector::new(AGENT_NAME_FIELD, "agent1"))
            .await
            .unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "ks1");

        let sets = graph
            .list_knowledge_sets("default", &FieldSelector::new(WORKFLOW_NAME_FIELD, "wf1"))
            .await
            .unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "ks2");
    }

    #[tokio::test]
    async fn test_unsupported_field() {
        let graph = MemoryGraph::new();
        graph.put_knowledge_set(knowledge_set("ks1", Some("agent1"), None)).unwrap();

        let result = graph
            .list_knowledge_sets("default", &FieldSelector::new("spec.bogus", "x"))
            .await;
        assert!(matches!(result, Err(GraphError::UnsupportedField { .. })));

        let result = graph
            .list_knowledge_sources("default", &FieldSelector::new(AGENT_NAME_FIELD, "x"))
            .await;
        assert!(matches!(result, Err(GraphError::UnsupportedField { .. })));
    }
}
