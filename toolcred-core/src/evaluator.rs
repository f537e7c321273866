//! Authorization verdicts for resolved tool requirements.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ToolcredError;
use crate::model::{ToolInfo, ToolInfos, ToolUser};
use crate::resolver::ToolRequirement;
use crate::store::CredentialStore;

/// Build the tool info map for a batch of requirements.
///
/// A tool is authorized iff every name it requires is in `present`. Tools
/// that require nothing are always authorized.
pub fn authorize(requirements: Vec<ToolRequirement>, present: &HashSet<String>) -> ToolInfos {
    requirements
        .into_iter()
        .map(|req| {
            let authorized = req.credential_names.iter().all(|name| present.contains(name));
            (
                req.tool,
                ToolInfo {
                    credential_names: req.credential_names,
                    authorized,
                },
            )
        })
        .collect()
}

/// Checks tool requirements against the credentials a tool user can see.
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    store: Arc<dyn CredentialStore>,
}

impl AuthorizationEvaluator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Contexts whose credentials are visible to `user`: its own name and
    /// its namespace.
    pub fn contexts_for(user: &dyn ToolUser) -> Vec<String> {
        vec![user.name().to_string(), user.namespace().to_string()]
    }

    /// Names of every credential visible to `user`, in a single listing.
    pub async fn present_credentials(
        &self,
        user: &dyn ToolUser,
    ) -> Result<HashSet<String>, ToolcredError> {
        let names = self.store.list_names(&Self::contexts_for(user)).await?;
        Ok(names.into_iter().collect())
    }

    /// Evaluate all requirements against one listing of the store.
    pub async fn evaluate(
        &self,
        user: &dyn ToolUser,
        requirements: Vec<ToolRequirement>,
    ) -> Result<ToolInfos, ToolcredError> {
        let present = self.present_credentials(user).await?;
        Ok(authorize(requirements, &present))
    }
}

impl std::fmt::Debug for AuthorizationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEvaluator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agent;
    use crate::store::MemoryCredentialStore;

    fn requirement(tool: &str, names: &[&str]) -> ToolRequirement {
        ToolRequirement {
            tool: tool.into(),
            credential_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_authorize_subset() {
        let present: HashSet<String> = ["a".to_string(), "b".to_string()].into();
        let infos = authorize(
            vec![
                requirement("both", &["a", "b"]),
                requirement("partial", &["a", "c"]),
                requirement("none", &[]),
                requirement("dup", &["a", "a"]),
            ],
            &present,
        );

        assert!(infos["both"].authorized);
        assert!(!infos["partial"].authorized);
        assert!(infos["none"].authorized);
        assert!(infos["dup"].authorized);
        assert_eq!(infos["dup"].credential_names, vec!["a", "a"]);
    }

    #[tokio::test]
    async fn test_namespace_context_counts_as_present() {
        let store = MemoryCredentialStore::new();
        store.insert("default", "shared-key").unwrap();
        store.insert("agent2", "other-key").unwrap();
        let evaluator = AuthorizationEvaluator::new(Arc::new(store));
        let agent = Agent::new("default", "agent1", ["search"]);

        let infos = evaluator
            .evaluate(
                &agent,
                vec![
                    requirement("shared", &["shared-key"]),
                    requirement("other", &["other-key"]),
                ],
            )
            .await
            .unwrap();

        assert!(infos["shared"].authorized);
        assert!(!infos["other"].authorized);
    }
}
