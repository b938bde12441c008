use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::views::{self, PageTree, SearchHit, Suggestion};
use crate::devops::{ApiResult, WikiApi};
use crate::error::DevOpsError;
use crate::model::wiki::WikiPage;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct Upsert {
    pub action: UpsertAction,
    pub page: WikiPage,
}

/// Result of a copy-then-delete move. A failed delete is still a result, not an error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveOutcome {
    Success {
        from_path: String,
        to_path: String,
        page_path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    PartialSuccess {
        from_path: String,
        to_path: String,
        warning: String,
        error: String,
    },
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PageSpec {
    /// Path of the page to create, e.g. "/Guides/Setup".
    pub path: String,
    /// Markdown content of the page.
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Success { path: String, page: WikiPage },
    Error { path: String, error: String },
}

/// Composite wiki operations for one wiki of one project.
pub struct WikiOps<'a, W: WikiApi + ?Sized> {
    api: &'a W,
    project: &'a str,
    wiki: &'a str,
}

impl<'a, W: WikiApi + ?Sized> WikiOps<'a, W> {
    pub fn new(api: &'a W, project: &'a str, wiki: &'a str) -> Self {
        Self { api, project, wiki }
    }

    pub async fn create_page(&self, path: &str, content: &str) -> ApiResult<WikiPage> {
        self.api
            .put_page(self.project, self.wiki, path, content, None)
            .await
    }

    /// Fetch the current token and write once with it.
    pub async fn update_page(&self, path: &str, content: &str) -> ApiResult<WikiPage> {
        let current = self
            .api
            .get_page(self.project, self.wiki, path, false)
            .await?;
        self.api
            .put_page(
                self.project,
                self.wiki,
                path,
                content,
                current.e_tag.as_deref(),
            )
            .await
    }

    /// Replace a page's content, re-reading the token after each version conflict.
    pub async fn safe_update(
        &self,
        path: &str,
        content: &str,
        max_attempts: u32,
    ) -> ApiResult<WikiPage> {
        if max_attempts == 0 {
            return Err(DevOpsError::InvalidArgument(
                "max_attempts must be at least 1".into(),
            ));
        }

        for attempt in 1..=max_attempts {
            match self.update_page(path, content).await {
                Ok(page) => {
                    if attempt > 1 {
                        tracing::info!(path, attempt, "page updated after version conflict");
                    }
                    return Ok(page);
                }
                Err(err) if err.is_conflict() => {
                    tracing::warn!(path, attempt, max_attempts, error = %err, "version conflict");
                }
                Err(err) => return Err(err),
            }
        }

        Err(DevOpsError::RetriesExhausted {
            path: path.to_string(),
            attempts: max_attempts,
        })
    }

    pub async fn create_or_update(&self, path: &str, content: &str) -> ApiResult<Upsert> {
        match self.safe_update(path, content, DEFAULT_MAX_ATTEMPTS).await {
            Ok(page) => Ok(Upsert {
                action: UpsertAction::Updated,
                page,
            }),
            Err(err) if err.is_not_found() => {
                tracing::debug!(path, "page missing, creating");
                let page = self.create_page(path, content).await?;
                Ok(Upsert {
                    action: UpsertAction::Created,
                    page,
                })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn move_page(&self, from_path: &str, to_path: &str) -> ApiResult<MoveOutcome> {
        let source = match self
            .api
            .get_page(self.project, self.wiki, from_path, true)
            .await
        {
            Ok(page) => page,
            Err(err) if err.is_not_found() => {
                return Err(DevOpsError::NotFound(format!(
                    "source page '{from_path}' not found"
                )));
            }
            Err(err) => return Err(err),
        };

        let content = source.content.unwrap_or_default();
        let created = self
            .create_page(to_path, &content)
            .await
            .map_err(|err| DevOpsError::MoveTarget {
                path: to_path.to_string(),
                source: Box::new(err),
            })?;

        if let Err(err) = self
            .api
            .delete_page(self.project, self.wiki, from_path)
            .await
        {
            tracing::warn!(from_path, to_path, error = %err, "page copied but source not deleted");
            return Ok(MoveOutcome::PartialSuccess {
                from_path: from_path.to_string(),
                to_path: to_path.to_string(),
                warning: format!(
                    "page was copied to '{to_path}' but '{from_path}' could not be deleted; remove it manually"
                ),
                error: err.to_string(),
            });
        }

        Ok(MoveOutcome::Success {
            from_path: from_path.to_string(),
            to_path: to_path.to_string(),
            page_path: created.path,
            url: created.url,
        })
    }

    /// Create each page independently; failures are recorded, never raised.
    pub async fn batch_create(&self, pages: &[PageSpec]) -> Vec<BatchEntry> {
        let mut results = Vec::with_capacity(pages.len());
        for spec in pages {
            let entry = match self.create_page(&spec.path, &spec.content).await {
                Ok(page) => BatchEntry::Success {
                    path: spec.path.clone(),
                    page,
                },
                Err(err) => {
                    tracing::warn!(path = %spec.path, error = %err, "batch page create failed");
                    BatchEntry::Error {
                        path: spec.path.clone(),
                        error: err.to_string(),
                    }
                }
            };
            results.push(entry);
        }
        results
    }

    pub async fn page_tree(&self) -> ApiResult<PageTree> {
        let pages = self.api.list_pages(self.project, self.wiki).await?;
        Ok(views::build_tree(&pages))
    }

    pub async fn suggestions(&self, partial_path: &str) -> ApiResult<Vec<Suggestion>> {
        let pages = self.api.list_pages(self.project, self.wiki).await?;
        Ok(views::rank_suggestions(&pages, partial_path))
    }

    pub async fn search(&self, query: &str, limit: usize) -> ApiResult<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(DevOpsError::InvalidArgument("search query is empty".into()));
        }
        let pages = self.api.list_pages(self.project, self.wiki).await?;
        Ok(views::rank_search(&pages, query.trim(), limit))
    }

    /// The first page whose title matches, with its content, or `None`.
    pub async fn find_by_title(&self, title: &str) -> ApiResult<Option<WikiPage>> {
        if title.trim().is_empty() {
            return Err(DevOpsError::InvalidArgument("title is empty".into()));
        }
        let pages = self.api.list_pages(self.project, self.wiki).await?;
        match views::match_title(&pages, title) {
            Some(found) => {
                let page = self
                    .api
                    .get_page(self.project, self.wiki, &found.path, true)
                    .await?;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }
}
