//! File-backed snapshot of tool users, graph objects and stored credentials.
//!
//! The snapshot is a single JSON document. It is loaded into the in-memory
//! collaborators of `toolcred-core`, and written back after a pass so the
//! recorded tool infos and surviving credentials are kept.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use toolcred_core::{
    Agent, Credential, CredentialStore, GraphObjects, MemoryCredentialStore, MemoryGraph, Program,
    StaticToolResolver, SweepPlan, SweepReport, ToolInfoHandler, ToolInfos, ToolUser, Workflow,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub agents: Vec<Agent>,

    #[serde(default)]
    pub workflows: Vec<Workflow>,

    #[serde(flatten)]
    pub graph: GraphObjects,

    /// External tool programs keyed by locator.
    #[serde(default)]
    pub programs: HashMap<String, Program>,

    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot from {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot from {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write snapshot to {:?}", path))
    }

    fn user_mut(&mut self, user: &UserRef, namespace: &str) -> Option<&mut dyn ToolUser> {
        match user.kind {
            UserKind::Agent => self
                .agents
                .iter_mut()
                .find(|a| a.namespace == namespace && a.name == user.name)
                .map(|a| a as &mut dyn ToolUser),
            UserKind::Workflow => self
                .workflows
                .iter_mut()
                .find(|w| w.namespace == namespace && w.name == user.name)
                .map(|w| w as &mut dyn ToolUser),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    Agent,
    Workflow,
}

/// A tool user named on the command line as `agent/<name>` or
/// `workflow/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub kind: UserKind,
    pub name: String,
}

impl FromStr for UserRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((kind, name)) = s.split_once('/') else {
            bail!("expected <agent|workflow>/<name>, got {:?}", s);
        };
        let kind = match kind {
            "agent" => UserKind::Agent,
            "workflow" => UserKind::Workflow,
            other => bail!("unknown tool user kind {:?}", other),
        };
        if name.is_empty() {
            bail!("tool user name must not be empty");
        }
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            UserKind::Agent => "agent",
            UserKind::Workflow => "workflow",
        };
        write!(f, "{}/{}", kind, self.name)
    }
}

/// Result of a sweep command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SweepOutcome {
    Planned(SweepPlan),
    Swept(SweepReport),
}

/// In-memory collaborators built from a snapshot.
struct Session {
    store: Arc<MemoryCredentialStore>,
    handler: ToolInfoHandler,
}

impl Session {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let store = Arc::new(MemoryCredentialStore::with_data(
            snapshot.credentials.iter().cloned(),
        ));
        Self::with_backend(snapshot, store.clone(), store)
    }

    /// Route store calls through `backend`, which must act on `store`.
    fn with_backend(
        snapshot: &Snapshot,
        store: Arc<MemoryCredentialStore>,
        backend: Arc<dyn CredentialStore>,
    ) -> Self {
        let graph = Arc::new(MemoryGraph::with_objects(snapshot.graph.clone()));
        let external = Arc::new(StaticToolResolver::with_programs(snapshot.programs.clone()));
        let handler = ToolInfoHandler::new(backend, graph, external);
        Self { store, handler }
    }
}

/// Recompute the tool infos of `user` and record them in the snapshot.
pub async fn run_status(snapshot: &mut Snapshot, user: &UserRef, namespace: &str) -> Result<ToolInfos> {
    let session = Session::from_snapshot(snapshot);
    let target = snapshot
        .user_mut(user, namespace)
        .with_context(|| format!("{} not found in namespace {}", user, namespace))?;

    session.handler.set_tool_info_status(target).await?;
    Ok(target.tool_infos().clone())
}

/// Recompute tool infos, then sweep unneeded credentials of `user`.
///
/// With `dry_run` the credentials in the snapshot are left unchanged.
pub async fn run_sweep(
    snapshot: &mut Snapshot,
    user: &UserRef,
    namespace: &str,
    dry_run: bool,
) -> Result<SweepOutcome> {
    let session = Session::from_snapshot(snapshot);
    sweep(snapshot, &session, user, namespace, dry_run).await
}

async fn sweep(
    snapshot: &mut Snapshot,
    session: &Session,
    user: &UserRef,
    namespace: &str,
    dry_run: bool,
) -> Result<SweepOutcome> {
    let target = snapshot
        .user_mut(user, namespace)
        .with_context(|| format!("{} not found in namespace {}", user, namespace))?;

    session.handler.set_tool_info_status(&mut *target).await?;

    if dry_run {
        let plan = session.handler.plan_sweep(&*target).await?;
        return Ok(SweepOutcome::Planned(plan));
    }

    let result = session.handler.remove_unneeded_credentials(&*target).await;
    // Deletions made before a failure stay in effect.
    snapshot.credentials = session.store.snapshot()?;
    Ok(SweepOutcome::Swept(result?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolcred_core::StoreError;

    /// Store that fails deletes of one name and forwards everything else.
    struct FailingDeletes {
        inner: Arc<MemoryCredentialStore>,
        fail_on: &'static str,
    }

    #[async_trait]
    impl CredentialStore for FailingDeletes {
        async fn list(&self, contexts: &[String]) -> Result<Vec<Credential>, StoreError> {
            self.inner.list(contexts).await
        }

        async fn delete(&self, context: &str, name: &str) -> Result<(), StoreError> {
            if name == self.fail_on {
                return Err(StoreError::BackendError {
                    message: "unavailable".into(),
                });
            }
            self.inner.delete(context, name).await
        }
    }

    #[tokio::test]
    async fn test_failed_sweep_persists_earlier_deletes() {
        let mut snapshot = Snapshot {
            workflows: vec![Workflow::new("default", "wf1", Vec::<String>::new())],
            credentials: vec![
                Credential::new("wf1", "a-stale"),
                Credential::new("wf1", "b-broken"),
                Credential::new("wf1", "c-stale"),
            ],
            ..Default::default()
        };
        let store = Arc::new(MemoryCredentialStore::with_data(
            snapshot.credentials.iter().cloned(),
        ));
        let backend = Arc::new(FailingDeletes {
            inner: store.clone(),
            fail_on: "b-broken",
        });
        let session = Session::with_backend(&snapshot, store, backend);
        let user: UserRef = "workflow/wf1".parse().unwrap();

        let result = sweep(&mut snapshot, &session, &user, "default", false).await;

        assert!(result.is_err());
        assert_eq!(
            snapshot.credentials,
            vec![Credential::new("wf1", "b-broken"), Credential::new("wf1", "c-stale")]
        );
    }

    #[test]
    fn test_parse_user_ref() {
        let user: UserRef = "agent/agent1".parse().unwrap();
        assert_eq!(user.kind, UserKind::Agent);
        assert_eq!(user.name, "agent1");
        assert_eq!(user.to_string(), "agent/agent1");

        let user: UserRef = "workflow/wf1".parse().unwrap();
        assert_eq!(user.kind, UserKind::Workflow);
    }

    #[test]
    fn test_parse_user_ref_errors() {
        assert!("agent1".parse::<UserRef>().is_err());
        assert!("tool/agent1".parse::<UserRef>().is_err());
        assert!("agent/".parse::<UserRef>().is_err());
    }

    #[test]
    fn test_snapshot_json_layout() {
        let json = r#"{
            "agents": [{"namespace": "default", "name": "agent1", "tools": ["search", "search"]}],
            "toolReferences": [{"namespace": "default", "name": "search",
                                "status": {"tool": {"credentialNames": ["key"]}}}],
            "knowledgeSources": [{"namespace": "default", "name": "s", "knowledgeSetName": "ks",
                                  "type": "s3"}],
            "credentials": [{"context": "agent1", "name": "key"}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.agents[0].tools(), ["search"]);
        assert_eq!(snapshot.graph.tool_references.len(), 1);
        assert_eq!(
            snapshot.graph.knowledge_sources[0].sync_credential_name().as_deref(),
            Some("s3.sync-file")
        );
        assert_eq!(snapshot.credentials, vec![Credential::new("agent1", "key")]);
    }
}
