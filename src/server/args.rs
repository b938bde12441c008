//! Typed arguments for every tool. The JSON Schemas advertised by
//! `tools/list` are derived from these structs.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::model::project::TimeFrame;
use crate::ops::PageSpec;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectArgs {
    /// Project name or ID. Falls back to the project context.
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetProjectArgs {
    /// Project name or ID to use for subsequent calls.
    pub project: String,
}

// ── work items ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWorkItemArgs {
    #[serde(default)]
    pub project: Option<String>,
    /// Work item type, e.g. "Bug", "Task" or "User Story".
    pub work_item_type: String,
    pub title: String,
    /// HTML or plain-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Extra fields keyed by reference name, e.g. "Microsoft.VSTS.Common.Priority".
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// ID of a parent work item to link to.
    #[serde(default)]
    pub parent_id: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WorkItemIdArgs {
    pub work_item_id: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateWorkItemArgs {
    pub work_item_id: u64,
    /// Field values keyed by reference name.
    pub updates: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchWorkItemsArgs {
    #[serde(default)]
    pub project: Option<String>,
    /// WIQL query. Scoped to the project unless it already filters on one.
    pub wiql_query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectWorkItemArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub work_item_id: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddCommentArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub work_item_id: u64,
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LinkWorkItemsArgs {
    pub source_id: u64,
    pub target_id: u64,
    /// "parent", "child", "related", "predecessor", "successor" or a full relation type.
    pub link_type: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WorkItemTypeArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub work_item_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransitionsArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub work_item_type: String,
    /// State the transitions start from.
    pub from_state: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IterationsArgs {
    #[serde(default)]
    pub project: Option<String>,
    /// Team name. Defaults to the project's default team.
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub timeframe: Option<TimeFrame>,
}

// ── wikis ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WikiArgs {
    #[serde(default)]
    pub project: Option<String>,
    /// Wiki name or ID.
    pub wiki_identifier: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    /// Page path, e.g. "/Guides/Setup".
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageContentArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub path: String,
    /// Markdown content.
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SafeUpdateArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub path: String,
    pub content: String,
    /// Attempts before giving up on version conflicts. Defaults to 3.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MovePageArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub from_path: String,
    pub to_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPagesArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub query: String,
    /// Maximum number of hits. Defaults to 20.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageTitleArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestionsArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    /// Partial page path typed so far.
    pub partial_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchCreateArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub wiki_identifier: String,
    pub pages: Vec<PageSpec>,
}

// ── repositories ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    #[serde(default)]
    pub project: Option<String>,
    /// Repository name or ID.
    pub repository_id: String,
    /// Folder to list recursively. Defaults to the repository root.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileContentArgs {
    #[serde(default)]
    pub project: Option<String>,
    pub repository_id: String,
    pub path: String,
}
