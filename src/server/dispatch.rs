use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::args::*;
use crate::devops::DevOps;
use crate::ops::views::DEFAULT_SEARCH_LIMIT;
use crate::ops::{WikiOps, WorkItemOps, DEFAULT_MAX_ATTEMPTS};

/// Text returned to the client for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
}

/// Routes tool calls to the client and composite operations. Owns the
/// project context that tools fall back to when `project` is omitted.
pub struct Dispatcher {
    api: Arc<dyn DevOps>,
    project_context: Option<String>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn DevOps>, default_project: Option<String>) -> Self {
        Self {
            api,
            project_context: default_project.filter(|p| !p.trim().is_empty()),
        }
    }

    #[cfg(test)]
    pub fn project_context(&self) -> Option<&str> {
        self.project_context.as_deref()
    }

    pub async fn call(&mut self, name: &str, args: Value) -> ToolReply {
        tracing::debug!(tool = name, "tool call");
        match self.route(name, args).await {
            Ok(text) => ToolReply {
                text,
                is_error: false,
            },
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "tool call failed");
                let text = serde_json::to_string_pretty(&json!({ "error": err.to_string() }))
                    .unwrap_or_else(|_| err.to_string());
                ToolReply {
                    text,
                    is_error: true,
                }
            }
        }
    }

    async fn route(&mut self, name: &str, args: Value) -> Result<String> {
        match name {
            // projects and context
            "get_projects" => render(&self.api.list_projects().await?),
            "set_project_context" => {
                let a: SetProjectArgs = parse(name, args)?;
                let project = a.project.trim().to_string();
                if project.is_empty() {
                    bail!("project must not be empty");
                }
                tracing::info!(%project, "project context set");
                self.project_context = Some(project.clone());
                render(&json!({ "project": project }))
            }
            "get_project_context" => render(&json!({ "project": self.project_context })),
            "clear_project_context" => {
                let previous = self.project_context.take();
                render(&json!({ "cleared": previous }))
            }

            // work items
            "create_work_item" => {
                let a: CreateWorkItemArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let item = self
                    .work_items()
                    .create(
                        &project,
                        &a.work_item_type,
                        &a.title,
                        a.description.as_deref(),
                        &a.fields,
                        a.parent_id,
                    )
                    .await?;
                render(&item)
            }
            "get_work_item" => {
                let a: WorkItemIdArgs = parse(name, args)?;
                render(&self.api.get_work_item(a.work_item_id).await?)
            }
            "update_work_item" => {
                let a: UpdateWorkItemArgs = parse(name, args)?;
                render(&self.work_items().update(a.work_item_id, &a.updates).await?)
            }
            "delete_work_item" => {
                let a: WorkItemIdArgs = parse(name, args)?;
                self.api.delete_work_item(a.work_item_id).await?;
                render(&json!({ "deleted": a.work_item_id }))
            }
            "search_work_items" => {
                let a: SearchWorkItemsArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.work_items().search(&project, &a.wiql_query).await?)
            }
            "add_work_item_comment" => {
                let a: AddCommentArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.api.add_comment(&project, a.work_item_id, &a.text).await?)
            }
            "get_work_item_comments" => {
                let a: ProjectWorkItemArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.api.list_comments(&project, a.work_item_id).await?)
            }
            "get_work_item_history" => {
                let a: WorkItemIdArgs = parse(name, args)?;
                render(&self.api.list_updates(a.work_item_id).await?)
            }
            "link_work_items" => {
                let a: LinkWorkItemsArgs = parse(name, args)?;
                let item = self
                    .work_items()
                    .link(a.source_id, a.target_id, &a.link_type, a.comment.as_deref())
                    .await?;
                render(&item)
            }
            "get_work_item_states" => {
                let a: WorkItemTypeArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.work_items().states(&project, &a.work_item_type).await?)
            }
            "get_work_item_transitions" => {
                let a: TransitionsArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let report = self
                    .work_items()
                    .transitions(&project, &a.work_item_type, &a.from_state)
                    .await;
                render(&report)
            }
            "get_iterations" => {
                let a: IterationsArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let iterations = self
                    .api
                    .list_iterations(&project, a.team.as_deref(), a.timeframe)
                    .await?;
                render(&iterations)
            }

            // wikis
            "get_wikis" => {
                let a: ProjectArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.api.list_wikis(&project).await?)
            }
            "get_wiki_page" => {
                let a: PageArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let page = self
                    .api
                    .get_page(&project, &a.wiki_identifier, &a.path, true)
                    .await?;
                render(&page)
            }
            "create_wiki_page" => {
                let a: PageContentArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let page = self
                    .wiki(&project, &a.wiki_identifier)
                    .create_page(&a.path, &a.content)
                    .await?;
                render(&page)
            }
            "update_wiki_page" => {
                let a: PageContentArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let page = self
                    .wiki(&project, &a.wiki_identifier)
                    .update_page(&a.path, &a.content)
                    .await?;
                render(&page)
            }
            "safe_update_wiki_page" => {
                let a: SafeUpdateArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let attempts = a.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
                let page = self
                    .wiki(&project, &a.wiki_identifier)
                    .safe_update(&a.path, &a.content, attempts)
                    .await?;
                render(&page)
            }
            "create_or_update_wiki_page" => {
                let a: PageContentArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let result = self
                    .wiki(&project, &a.wiki_identifier)
                    .create_or_update(&a.path, &a.content)
                    .await?;
                render(&result)
            }
            "delete_wiki_page" => {
                let a: PageArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                self.api
                    .delete_page(&project, &a.wiki_identifier, &a.path)
                    .await?;
                render(&json!({ "deleted": a.path }))
            }
            "list_wiki_pages" => {
                let a: WikiArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.api.list_pages(&project, &a.wiki_identifier).await?)
            }
            "get_wiki_page_tree" => {
                let a: WikiArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.wiki(&project, &a.wiki_identifier).page_tree().await?)
            }
            "search_wiki_pages" => {
                let a: SearchPagesArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let limit = a.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
                let hits = self
                    .wiki(&project, &a.wiki_identifier)
                    .search(&a.query, limit)
                    .await?;
                render(&hits)
            }
            "get_wiki_page_by_title" => {
                let a: PageTitleArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let page = self
                    .wiki(&project, &a.wiki_identifier)
                    .find_by_title(&a.title)
                    .await?;
                render(&page)
            }
            "get_wiki_page_suggestions" => {
                let a: SuggestionsArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let suggestions = self
                    .wiki(&project, &a.wiki_identifier)
                    .suggestions(&a.partial_path)
                    .await?;
                render(&suggestions)
            }
            "move_wiki_page" => {
                let a: MovePageArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let outcome = self
                    .wiki(&project, &a.wiki_identifier)
                    .move_page(&a.from_path, &a.to_path)
                    .await?;
                render(&outcome)
            }
            "batch_create_wiki_pages" => {
                let a: BatchCreateArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let results = self
                    .wiki(&project, &a.wiki_identifier)
                    .batch_create(&a.pages)
                    .await;
                render(&results)
            }

            // repositories
            "list_repositories" => {
                let a: ProjectArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                render(&self.api.list_repositories(&project).await?)
            }
            "list_files" => {
                let a: ListFilesArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                let scope = a.path.as_deref().unwrap_or("/");
                render(&self.api.list_items(&project, &a.repository_id, scope).await?)
            }
            "get_file_content" => {
                let a: FileContentArgs = parse(name, args)?;
                let project = self.project(a.project)?;
                Ok(self
                    .api
                    .get_item_text(&project, &a.repository_id, &a.path)
                    .await?)
            }

            _ => bail!("tool '{name}' not found"),
        }
    }

    /// The explicit project if given, otherwise the stored context.
    fn project(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.project_context.clone())
            .ok_or_else(|| anyhow!("no project specified and no project context set"))
    }

    fn work_items(&self) -> WorkItemOps<'_, dyn DevOps> {
        WorkItemOps::new(self.api.as_ref())
    }

    fn wiki<'a>(&'a self, project: &'a str, wiki: &'a str) -> WikiOps<'a, dyn DevOps> {
        WikiOps::new(self.api.as_ref(), project, wiki)
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| anyhow!("invalid arguments for '{tool}': {e}"))
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize result")
}
