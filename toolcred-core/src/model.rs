//! Domain model types for toolcred.
//!
//! This module defines the core types used throughout toolcred:
//! - [`ToolInfo`] - Credential requirement and verdict for one tool
//! - [`ToolUser`] - Trait implemented by entities that reference tools
//! - [`Agent`] / [`Workflow`] - The two tool user variants
//! - [`ToolRef`] - Internal vs external classification of a tool name
//! - [`ToolReference`] - An internal tool as stored in the resource graph
//! - [`KnowledgeSet`] / [`KnowledgeSource`] - Auxiliary graph entities
//! - [`Credential`] - A stored credential identified by context and name

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Field linking a [`KnowledgeSet`] to its owning [`Agent`].
pub const AGENT_NAME_FIELD: &str = "spec.agentName";

/// Field linking a [`KnowledgeSet`] to its owning [`Workflow`].
pub const WORKFLOW_NAME_FIELD: &str = "spec.workflowName";

/// Field linking a [`KnowledgeSource`] to its [`KnowledgeSet`].
pub const KNOWLEDGE_SET_NAME_FIELD: &str = "spec.knowledgeSetName";

/// Suffix of the credential implicitly required by a knowledge source.
pub const SYNC_FILE_SUFFIX: &str = ".sync-file";

/// Computed credential requirement and authorization verdict for one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Credential names the tool requires, in source order.
    #[serde(default)]
    pub credential_names: Vec<String>,

    /// Whether every required credential currently exists.
    #[serde(default)]
    pub authorized: bool,
}

/// Tool name to [`ToolInfo`] map attached to a tool user's status.
pub type ToolInfos = BTreeMap<String, ToolInfo>;

/// An entity that references a set of tools and accumulates authorization
/// status for them.
pub trait ToolUser: Send + Sync {
    /// Name of the tool user. Also the credential context it owns.
    fn name(&self) -> &str;

    /// Namespace the tool user lives in.
    fn namespace(&self) -> &str;

    /// Referenced tool names, ordered, without duplicates.
    fn tools(&self) -> &[String];

    /// The currently recorded tool information.
    fn tool_infos(&self) -> &ToolInfos;

    /// Replace the recorded tool information wholesale.
    fn set_tool_infos(&mut self, infos: ToolInfos);

    /// Field on [`KnowledgeSet`] that links knowledge sets to this kind of
    /// tool user, or `None` if this kind never owns knowledge sets.
    fn knowledge_set_owner_field(&self) -> Option<&'static str> {
        None
    }
}

/// Status block shared by both tool user variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUserStatus {
    #[serde(default)]
    pub tool_infos: ToolInfos,
}

fn dedup_tools<I, S>(tools: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .map(Into::into)
        .filter(|tool| seen.insert(tool.clone()))
        .collect()
}

fn deserialize_tools<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(dedup_tools)
}

/// A conversational agent. Knowledge sets link to it by `spec.agentName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub namespace: String,
    pub name: String,

    /// Referenced tool names, ordered, without duplicates.
    #[serde(default, deserialize_with = "deserialize_tools")]
    tools: Vec<String>,

    #[serde(default)]
    pub status: ToolUserStatus,
}

impl Agent {
    /// Create a new agent. Duplicate tool names are dropped, keeping the
    /// first occurrence.
    pub fn new<I, S>(namespace: impl Into<String>, name: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            tools: dedup_tools(tools),
            status: ToolUserStatus::default(),
        }
    }

    /// Set previously recorded tool information.
    pub fn with_tool_infos(mut self, infos: ToolInfos) -> Self {
        self.status.tool_infos = infos;
        self
    }
}

impl ToolUser for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn tools(&self) -> &[String] {
        &self.tools
    }

    fn tool_infos(&self) -> &ToolInfos {
        &self.status.tool_infos
    }

    fn set_tool_infos(&mut self, infos: ToolInfos) {
        self.status.tool_infos = infos;
    }

    fn knowledge_set_owner_field(&self) -> Option<&'static str> {
        Some(AGENT_NAME_FIELD)
    }
}

/// A workflow. Knowledge sets link to it by `spec.workflowName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub namespace: String,
    pub name: String,

    /// Referenced tool names, ordered, without duplicates.
    #[serde(default, deserialize_with = "deserialize_tools")]
    tools: Vec<String>,

    #[serde(default)]
    pub status: ToolUserStatus,
}

impl Workflow {
    /// Create a new workflow. Duplicate tool names are dropped, keeping the
    /// first occurrence.
    pub fn new<I, S>(namespace: impl Into<String>, name: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            tools: dedup_tools(tools),
            status: ToolUserStatus::default(),
        }
    }

    /// Set previously recorded tool information.
    pub fn with_tool_infos(mut self, infos: ToolInfos) -> Self {
        self.status.tool_infos = infos;
        self
    }
}

impl ToolUser for Workflow {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn tools(&self) -> &[String] {
        &self.tools
    }

    fn tool_infos(&self) -> &ToolInfos {
        &self.status.tool_infos
    }

    fn set_tool_infos(&mut self, infos: ToolInfos) {
        self.status.tool_infos = infos;
    }

    fn knowledge_set_owner_field(&self) -> Option<&'static str> {
        Some(WORKFLOW_NAME_FIELD)
    }
}

/// Classification of a tool name referenced by a tool user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRef<'a> {
    /// Resolved by name inside the resource graph.
    Internal(&'a str),

    /// Loaded on demand from a file path or URL.
    External(&'a str),
}

impl<'a> ToolRef<'a> {
    /// Classify a tool name.
    ///
    /// Names containing `.` or `/` are locators of external tools; anything
    /// else names a [`ToolReference`] in the graph.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolcred_core::ToolRef;
    ///
    /// assert_eq!(ToolRef::parse("search"), ToolRef::Internal("search"));
    /// assert_eq!(
    ///     ToolRef::parse("github.com/acme/tools"),
    ///     ToolRef::External("github.com/acme/tools"),
    /// );
    /// ```
    pub fn parse(tool: &'a str) -> Self {
        if tool.contains(['.', '/']) {
            Self::External(tool)
        } else {
            Self::Internal(tool)
        }
    }

    /// The raw tool name.
    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Internal(name) | Self::External(name) => name,
        }
    }
}

impl fmt::Display for ToolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved description of an internal tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTool {
    #[serde(default)]
    pub credential_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReferenceStatus {
    /// Filled in once the tool has been resolved upstream.
    #[serde(default)]
    pub tool: Option<ResolvedTool>,
}

/// An internal tool as stored in the resource graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReference {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub status: ToolReferenceStatus,
}

impl ToolReference {
    /// Create a tool reference that has not been resolved yet.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            status: ToolReferenceStatus::default(),
        }
    }

    /// Mark the reference resolved with the given credential names.
    pub fn resolved<I, S>(mut self, credential_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status.tool = Some(ResolvedTool {
            credential_names: credential_names.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// A group of knowledge sources owned by an agent or workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSet {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
}

impl KnowledgeSet {
    /// Value of an owner-link field, if set.
    pub fn field(&self, field: &str) -> Option<&str> {
        match field {
            AGENT_NAME_FIELD => self.agent_name.as_deref(),
            WORKFLOW_NAME_FIELD => self.workflow_name.as_deref(),
            _ => None,
        }
    }
}

/// A single source of files synced into a knowledge set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSource {
    pub namespace: String,
    pub name: String,
    pub knowledge_set_name: String,

    /// Declared source type, e.g. `s3` or `website`.
    #[serde(default, rename = "type")]
    pub source_type: Option<String>,
}

impl KnowledgeSource {
    /// Credential implicitly required to sync this source.
    ///
    /// Returns `None` when the source declares no type.
    pub fn sync_credential_name(&self) -> Option<String> {
        self.source_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!("{t}{SYNC_FILE_SUFFIX}"))
    }
}

/// A stored credential, unique by `(context, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Credential {
    /// Scope the credential is stored under.
    pub context: String,

    /// Credential name, matched against tool requirements.
    pub name: String,
}

impl Credential {
    pub fn new(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.context, self.name)
    }
}
