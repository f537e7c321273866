//! Credential requirements of externally loaded tools.
//!
//! An external tool is named by a locator (file path or URL) rather than by a
//! graph object. Its requirements come from loading the tool's program and
//! walking the tools reachable from the entry point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use thiserror::Error;

/// Error type for external tool resolution.
#[derive(Debug, Error)]
pub enum ExternalError {
    /// The locator could not be loaded.
    #[error("failed to load {locator}: {message}")]
    LoadFailed { locator: String, message: String },

    /// The program's entry tool is not part of its tool set.
    #[error("program loaded from {locator} has no entry tool {entry_tool_id}")]
    MissingEntry {
        locator: String,
        entry_tool_id: String,
    },

    /// Walking the tool graph failed.
    #[error("cannot determine credentials for {locator}: {message}")]
    Credentials { locator: String, message: String },
}

/// A single tool inside a loaded program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,

    /// Credential providers this tool uses directly, as `provider` or
    /// `provider as alias`.
    #[serde(default)]
    pub credentials: Vec<String>,

    /// Ids of tools this tool can call.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A loaded tool program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub entry_tool_id: String,
    #[serde(default)]
    pub tool_set: HashMap<String, ToolDefinition>,
}

impl Program {
    /// The program's entry tool, if present.
    pub fn entry(&self) -> Option<&ToolDefinition> {
        self.tool_set.get(&self.entry_tool_id)
    }
}

/// Credential providers and names required by a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRequirements {
    pub providers: Vec<String>,
    pub credential_names: Vec<String>,
}

/// Loads external tools and derives their credential requirements.
#[async_trait]
pub trait ExternalToolResolver: Send + Sync {
    /// Load the program a locator points at.
    async fn load_definition(&self, locator: &str) -> Result<Program, ExternalError>;

    /// Walk `entry` and its transitive tools within `program`.
    async fn determine_credentials(
        &self,
        program: &Program,
        entry: &ToolDefinition,
        locator: &str,
    ) -> Result<CredentialRequirements, ExternalError>;
}

/// Load `locator` and return the credential names its entry tool requires.
pub async fn credential_names_for_external(
    resolver: &dyn ExternalToolResolver,
    locator: &str,
) -> Result<Vec<String>, ExternalError> {
    let program = resolver.load_definition(locator).await?;
    let entry = program.entry().ok_or_else(|| ExternalError::MissingEntry {
        locator: locator.to_string(),
        entry_tool_id: program.entry_tool_id.clone(),
    })?;

    let requirements = resolver.determine_credentials(&program, entry, locator).await?;
    Ok(requirements.credential_names)
}

/// Resolver backed by a fixed map of locator to program.
///
/// Credential entries of the form `provider as alias` contribute `alias` as the
/// credential name; plain entries use the provider id itself.
#[derive(Debug, Default)]
pub struct StaticToolResolver {
    programs: RwLock<HashMap<String, Program>>,
}

impl StaticToolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_programs(programs: HashMap<String, Program>) -> Self {
        Self {
            programs: RwLock::new(programs),
        }
    }

    /// Register or replace the program served for `locator`.
    pub fn insert(&self, locator: impl Into<String>, program: Program) -> Result<(), ExternalError> {
        let locator = locator.into();
        let mut programs = self.programs.write().map_err(|e| ExternalError::LoadFailed {
            locator: locator.clone(),
            message: format!("lock poisoned: {}", e),
        })?;
        programs.insert(locator, program);
        Ok(())
    }
}

fn split_credential(entry: &str) -> (&str, &str) {
    match entry.split_once(" as ") {
        Some((provider, alias)) => (provider.trim(), alias.trim()),
        None => (entry.trim(), entry.trim()),
    }
}

#[async_trait]
impl ExternalToolResolver for StaticToolResolver {
    async fn load_definition(&self, locator: &str) -> Result<Program, ExternalError> {
        let programs = self.programs.read().map_err(|e| ExternalError::LoadFailed {
            locator: locator.to_string(),
            message: format!("lock poisoned: {}", e),
        })?;
        programs
            .get(locator)
            .cloned()
            .ok_or_else(|| ExternalError::LoadFailed {
                locator: locator.to_string(),
                message: "no such program".to_string(),
            })
    }

    async fn determine_credentials(
        &self,
        program: &Program,
        entry: &ToolDefinition,
        locator: &str,
    ) -> Result<CredentialRequirements, ExternalError> {
        let mut requirements = CredentialRequirements::default();
        let mut visited = HashSet::new();
        let mut stack = vec![entry];

        while let Some(tool) = stack.pop() {
            if !visited.insert(tool.id.as_str()) {
                continue;
            }

            for credential in &tool.credentials {
                let (provider, name) = split_credential(credential);
                if provider.is_empty() {
                    return Err(ExternalError::Credentials {
                        locator: locator.to_string(),
                        message: format!("tool {} declares an empty credential", tool.id),
                    });
                }
                requirements.providers.push(provider.to_string());
                requirements.credential_names.push(name.to_string());
            }

            // Reverse so the first declared sub-tool is walked first.
            for id in tool.tools.iter().rev() {
                let sub = program
                    .tool_set
                    .get(id)
                    .ok_or_else(|| ExternalError::Credentials {
                        locator: locator.to_string(),
                        message: format!("tool {} references unknown tool {}", tool.id, id),
                    })?;
                stack.push(sub);
            }
        }

        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(id: &str, credentials: &[&str], tools: &[&str]) -> ToolDefinition {
        ToolDefinition {
            id: id.into(),
            name: id.into(),
            credentials: credentials.iter().map(|s| s.to_string()).collect(),
            tools: tools.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn program(entry: &str, tools: Vec<ToolDefinition>) -> Program {
        Program {
            entry_tool_id: entry.into(),
            tool_set: tools.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    #[tokio::test]
    async fn test_walks_transitive_tools_in_order() {
        let resolver = StaticToolResolver::new();
        resolver
            .insert(
                "github.com/acme/tools",
                program(
                    "main",
                    vec![
                        tool("main", &["github"], &["a", "b"]),
                        tool("a", &["slack as slack-token"], &["b"]),
                        tool("b", &["jira"], &["main"]),
                    ],
                ),
            )
            .unwrap();

        let names = credential_names_for_external(&resolver, "github.com/acme/tools")
            .await
            .unwrap();
        assert_eq!(names, vec!["github", "slack-token", "jira"]);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let resolver = StaticToolResolver::new();
        let err = credential_names_for_external(&resolver, "./missing.gpt")
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::LoadFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_entry_tool() {
        let resolver = StaticToolResolver::new();
        resolver
            .insert("./tool.gpt", program("main", vec![tool("other", &[], &[])]))
            .unwrap();

        let err = credential_names_for_external(&resolver, "./tool.gpt")
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::MissingEntry { .. }));
    }

    #[tokio::test]
    async fn test_unknown_sub_tool() {
        let resolver = StaticToolResolver::new();
        resolver
            .insert("./tool.gpt", program("main", vec![tool("main", &[], &["ghost"])]))
            .unwrap();

        let err = credential_names_for_external(&resolver, "./tool.gpt")
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::Credentials { .. }));
    }

    #[test]
    fn test_split_credential() {
        assert_eq!(split_credential("github"), ("github", "github"));
        assert_eq!(split_credential("sys.oauth as gh"), ("sys.oauth", "gh"));
    }
}
