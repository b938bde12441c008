//! Remote Resource Client: typed access to the Azure DevOps REST endpoints.
//!
//! The composite operations in `crate::ops` only ever see these traits, so
//! they can be exercised against in-memory fakes.

pub mod client;
pub mod git;
pub mod projects;
pub mod wiki;
pub mod work_items;

use async_trait::async_trait;

use crate::error::DevOpsError;
use crate::model::project::{GitItem, Iteration, Project, Repository, TimeFrame};
use crate::model::wiki::{PageSummary, Wiki, WikiPage};
use crate::model::work_item::{Comment, PatchOperation, WorkItem, WorkItemType, WorkItemUpdate};

pub use client::RestClient;

pub type ApiResult<T> = Result<T, DevOpsError>;

#[async_trait]
pub trait CoreApi: Send + Sync {
    async fn list_projects(&self) -> ApiResult<Vec<Project>>;

    async fn list_iterations(
        &self,
        project: &str,
        team: Option<&str>,
        time_frame: Option<TimeFrame>,
    ) -> ApiResult<Vec<Iteration>>;
}

#[async_trait]
pub trait WorkItemApi: Send + Sync {
    /// The API URL other work items use to reference this one in a relation.
    fn work_item_url(&self, id: u64) -> String;

    async fn create_work_item(
        &self,
        project: &str,
        work_item_type: &str,
        document: &[PatchOperation],
    ) -> ApiResult<WorkItem>;

    async fn get_work_item(&self, id: u64) -> ApiResult<WorkItem>;

    /// Items the service cannot return are omitted rather than failing the batch.
    async fn get_work_items(&self, ids: &[u64]) -> ApiResult<Vec<WorkItem>>;

    async fn update_work_item(&self, id: u64, document: &[PatchOperation]) -> ApiResult<WorkItem>;

    async fn delete_work_item(&self, id: u64) -> ApiResult<()>;

    /// Run a WIQL query and return the matching ids in result order.
    async fn query_by_wiql(&self, query: &str) -> ApiResult<Vec<u64>>;

    async fn add_comment(&self, project: &str, id: u64, text: &str) -> ApiResult<Comment>;

    async fn list_comments(&self, project: &str, id: u64) -> ApiResult<Vec<Comment>>;

    async fn list_updates(&self, id: u64) -> ApiResult<Vec<WorkItemUpdate>>;

    async fn get_work_item_type(&self, project: &str, name: &str) -> ApiResult<WorkItemType>;
}

#[async_trait]
pub trait WikiApi: Send + Sync {
    async fn list_wikis(&self, project: &str) -> ApiResult<Vec<Wiki>>;

    async fn get_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        include_content: bool,
    ) -> ApiResult<WikiPage>;

    /// Create (no `version`) or overwrite (`version` = current concurrency token) a page.
    async fn put_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        content: &str,
        version: Option<&str>,
    ) -> ApiResult<WikiPage>;

    async fn delete_page(&self, project: &str, wiki: &str, path: &str) -> ApiResult<()>;

    async fn list_pages(&self, project: &str, wiki: &str) -> ApiResult<Vec<PageSummary>>;
}

#[async_trait]
pub trait GitApi: Send + Sync {
    async fn list_repositories(&self, project: &str) -> ApiResult<Vec<Repository>>;

    async fn list_items(
        &self,
        project: &str,
        repository: &str,
        scope_path: &str,
    ) -> ApiResult<Vec<GitItem>>;

    async fn get_item_text(&self, project: &str, repository: &str, path: &str) -> ApiResult<String>;
}

/// Everything the tool dispatcher needs from the service.
pub trait DevOps: CoreApi + WorkItemApi + WikiApi + GitApi {}

impl<T> DevOps for T where T: CoreApi + WorkItemApi + WikiApi + GitApi {}
