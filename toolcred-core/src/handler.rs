//! Entry points invoked by the reconciliation scheduler.
//!
//! [`ToolInfoHandler`] owns the collaborators and exposes the two passes run
//! for every tool user:
//! - [`set_tool_info_status`](ToolInfoHandler::set_tool_info_status) records
//!   which credentials each tool needs and whether they exist
//! - [`remove_unneeded_credentials`](ToolInfoHandler::remove_unneeded_credentials)
//!   deletes credentials nothing references anymore
//!
//! The scheduler runs at most one pass per tool user at a time and retries a
//! failed pass from scratch.

use std::sync::Arc;
use tracing::debug;

use crate::error::ToolcredError;
use crate::evaluator::AuthorizationEvaluator;
use crate::external::ExternalToolResolver;
use crate::gc::{CredentialCollector, SweepPlan, SweepReport};
use crate::graph::ResourceGraph;
use crate::model::ToolUser;
use crate::resolver::ToolRequirementResolver;
use crate::store::CredentialStore;

/// Handler bundling requirement resolution, authorization and cleanup.
#[derive(Debug, Clone)]
pub struct ToolInfoHandler {
    resolver: ToolRequirementResolver,
    evaluator: AuthorizationEvaluator,
    collector: CredentialCollector,
}

impl ToolInfoHandler {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        graph: Arc<dyn ResourceGraph>,
        external: Arc<dyn ExternalToolResolver>,
    ) -> Self {
        Self {
            resolver: ToolRequirementResolver::new(graph.clone(), external),
            evaluator: AuthorizationEvaluator::new(store.clone()),
            collector: CredentialCollector::new(store, graph),
        }
    }

    /// Recompute and record the tool infos of `user`.
    ///
    /// All tools are resolved before any verdict is computed. On error the
    /// status of `user` is left untouched.
    pub async fn set_tool_info_status(&self, user: &mut dyn ToolUser) -> Result<(), ToolcredError> {
        let requirements = self.resolver.resolve_all(&*user).await?;
        let infos = self.evaluator.evaluate(&*user, requirements).await?;

        debug!(user = user.name(), tools = infos.len(), "recorded tool infos");
        user.set_tool_infos(infos);
        Ok(())
    }

    /// Delete credentials in `user`'s own context that nothing references.
    ///
    /// Relies on tool infos recorded by a previous
    /// [`set_tool_info_status`](Self::set_tool_info_status).
    pub async fn remove_unneeded_credentials(
        &self,
        user: &dyn ToolUser,
    ) -> Result<SweepReport, ToolcredError> {
        self.collector.remove_unneeded_credentials(user).await
    }

    /// Preview of [`remove_unneeded_credentials`](Self::remove_unneeded_credentials).
    pub async fn plan_sweep(&self, user: &dyn ToolUser) -> Result<SweepPlan, ToolcredError> {
        self.collector.plan(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::StaticToolResolver;
    use crate::graph::MemoryGraph;
    use crate::model::{Agent, Credential, ToolInfo, ToolInfos, ToolReference};
    use crate::store::{MemoryCredentialStore, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store that records the context sets it was listed with.
    struct CountingStore {
        inner: MemoryCredentialStore,
        listings: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn list(&self, contexts: &[String]) -> Result<Vec<Credential>, StoreError> {
            self.listings.lock().unwrap().push(contexts.to_vec());
            self.inner.list(contexts).await
        }

        async fn delete(&self, context: &str, name: &str) -> Result<(), StoreError> {
            self.inner.delete(context, name).await
        }
    }

    #[tokio::test]
    async fn test_failure_leaves_status_untouched() {
        let graph = MemoryGraph::new();
        graph
            .put_tool_reference(ToolReference::new("default", "search").resolved(["key"]))
            .unwrap();
        graph
            .put_tool_reference(ToolReference::new("default", "pending"))
            .unwrap();

        let handler = ToolInfoHandler::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(graph),
            Arc::new(StaticToolResolver::new()),
        );

        let previous = ToolInfos::from([("old".to_string(), ToolInfo::default())]);
        let mut agent = Agent::new("default", "agent1", ["search", "pending"])
            .with_tool_infos(previous.clone());

        let err = handler.set_tool_info_status(&mut agent).await.unwrap_err();
        assert!(matches!(err, ToolcredError::MissingToolStatus { .. }));
        assert_eq!(agent.tool_infos(), &previous);
    }

    #[tokio::test]
    async fn test_store_listed_once_for_all_tools() {
        let graph = MemoryGraph::new();
        graph
            .put_tool_reference(ToolReference::new("default", "a").resolved(["key-a"]))
            .unwrap();
        graph
            .put_tool_reference(ToolReference::new("default", "b").resolved(["key-b"]))
            .unwrap();
        graph
            .put_tool_reference(ToolReference::new("default", "c").resolved(["key-a", "key-c"]))
            .unwrap();

        let inner = MemoryCredentialStore::new();
        inner.insert("agent1", "key-a").unwrap();
        let store = Arc::new(CountingStore {
            inner,
            listings: Mutex::new(Vec::new()),
        });

        let handler = ToolInfoHandler::new(
            store.clone(),
            Arc::new(graph),
            Arc::new(StaticToolResolver::new()),
        );
        let mut agent = Agent::new("default", "agent1", ["a", "b", "c", "a"]);

        handler.set_tool_info_status(&mut agent).await.unwrap();

        let listings = store.listings.lock().unwrap();
        assert_eq!(
            *listings,
            vec![vec!["agent1".to_string(), "default".to_string()]]
        );
        let infos = agent.tool_infos();
        assert_eq!(infos.len(), 3);
        assert!(infos["a"].authorized);
        assert!(!infos["b"].authorized);
        assert!(!infos["c"].authorized);
    }
}
