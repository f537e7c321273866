//! Removal of credentials no longer reachable from a tool user.
//!
//! A sweep marks every credential name reachable from the tool user's recorded
//! tool infos and from the sync credentials of the knowledge sources it owns,
//! then deletes every credential in the tool user's own context that was not
//! marked.
//!
//! The reachable set is always recomputed right before deleting. Nothing is
//! carried between sweeps.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ToolcredError;
use crate::graph::{FieldSelector, ResourceGraph};
use crate::model::{KNOWLEDGE_SET_NAME_FIELD, ToolUser};
use crate::store::CredentialStore;

/// What a sweep would keep and delete in one context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepPlan {
    pub context: String,
    pub retained: Vec<String>,
    pub stale: Vec<String>,
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub context: String,

    /// Credentials this sweep deleted.
    pub deleted: Vec<String>,

    /// Stale credentials that were already gone when deleted.
    pub already_gone: Vec<String>,
}

/// Deletes credentials that no live reference needs.
#[derive(Clone)]
pub struct CredentialCollector {
    store: Arc<dyn CredentialStore>,
    graph: Arc<dyn ResourceGraph>,
}

impl CredentialCollector {
    pub fn new(store: Arc<dyn CredentialStore>, graph: Arc<dyn ResourceGraph>) -> Self {
        Self { store, graph }
    }

    /// Every credential name `user` currently needs.
    ///
    /// Reads the recorded tool infos as-is; they are not recomputed here.
    pub async fn reachable_credentials(
        &self,
        user: &dyn ToolUser,
    ) -> Result<BTreeSet<String>, ToolcredError> {
        let mut reachable: BTreeSet<String> = user
            .tool_infos()
            .values()
            .flat_map(|info| info.credential_names.iter().cloned())
            .collect();

        let Some(owner_field) = user.knowledge_set_owner_field() else {
            return Ok(reachable);
        };

        let namespace = user.namespace();
        let sets = self
            .graph
            .list_knowledge_sets(namespace, &FieldSelector::new(owner_field, user.name()))
            .await?;

        for set in sets {
            let sources = self
                .graph
                .list_knowledge_sources(
                    namespace,
                    &FieldSelector::new(KNOWLEDGE_SET_NAME_FIELD, &set.name),
                )
                .await?;
            reachable.extend(sources.iter().filter_map(|s| s.sync_credential_name()));
        }

        Ok(reachable)
    }

    /// Compute what a sweep of `user` would delete, without deleting.
    pub async fn plan(&self, user: &dyn ToolUser) -> Result<SweepPlan, ToolcredError> {
        let context = user.name().to_string();
        let stored = self.store.list_names(std::slice::from_ref(&context)).await?;
        if stored.is_empty() {
            return Ok(SweepPlan {
                context,
                ..Default::default()
            });
        }

        let reachable = self.reachable_credentials(user).await?;
        let (retained, stale): (Vec<String>, Vec<String>) = stored
            .into_iter()
            .partition(|name| reachable.contains(name));

        Ok(SweepPlan {
            context,
            retained,
            stale,
        })
    }

    /// Delete every credential in `user`'s context that isn't reachable.
    ///
    /// A credential that is already gone counts as deleted. Any other delete
    /// failure stops the sweep; deletions made before it stay in effect.
    pub async fn remove_unneeded_credentials(
        &self,
        user: &dyn ToolUser,
    ) -> Result<SweepReport, ToolcredError> {
        let plan = self.plan(user).await?;
        let mut report = SweepReport {
            context: plan.context,
            ..Default::default()
        };

        debug!(
            context = %report.context,
            retained = plan.retained.len(),
            stale = plan.stale.len(),
            "sweeping credentials"
        );

        for name in plan.stale {
            match self.store.delete(&report.context, &name).await {
                Ok(()) => {
                    info!(context = %report.context, credential = %name, "deleted unneeded credential");
                    report.deleted.push(name);
                }
                Err(e) if e.is_not_found() => {
                    warn!(context = %report.context, credential = %name, "credential already deleted");
                    report.already_gone.push(name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for CredentialCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCollector").finish_non_exhaustive()
    }
}
