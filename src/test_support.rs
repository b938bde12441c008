use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::devops::{ApiResult, CoreApi, GitApi, WikiApi, WorkItemApi};
use crate::error::DevOpsError;
use crate::model::project::{GitItem, Iteration, Project, Repository, TimeFrame};
use crate::model::wiki::{PageSummary, Wiki, WikiPage};
use crate::model::work_item::{
    Comment, PatchOperation, WorkItem, WorkItemType, WorkItemUpdate, FIELD_TITLE,
};

/// In-memory stand-in for the service that records every call it receives.
#[derive(Default)]
pub struct FakeDevOps {
    pages: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<String>>,
    put_errors: Mutex<VecDeque<DevOpsError>>,
    get_error: Mutex<Option<DevOpsError>>,
    delete_error: Mutex<Option<DevOpsError>>,
    failing_paths: Vec<String>,
    always_conflict: bool,
    work_item_type: Option<WorkItemType>,
    pub documents: Mutex<Vec<(u64, Vec<PatchOperation>)>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeDevOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(self, pages: &[(&str, &str)]) -> Self {
        *self.pages.lock().unwrap() = pages
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self
    }

    /// Queue errors returned by successive page writes.
    pub fn with_put_errors(self, errors: Vec<DevOpsError>) -> Self {
        *self.put_errors.lock().unwrap() = errors.into();
        self
    }

    pub fn always_conflicting(mut self) -> Self {
        self.always_conflict = true;
        self
    }

    pub fn failing_get(self, error: DevOpsError) -> Self {
        *self.get_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_delete(self, error: DevOpsError) -> Self {
        *self.delete_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_put_for(mut self, path: &str) -> Self {
        self.failing_paths.push(path.to_string());
        self
    }

    pub fn with_work_item_type(mut self, ty: WorkItemType) -> Self {
        self.work_item_type = Some(ty);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn item(id: u64, title: &str) -> WorkItem {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_TITLE.to_string(), Value::from(title));
        WorkItem::from_fields(id, Some(1), Some(format!("https://fake/{id}")), fields, vec![])
    }
}

#[async_trait]
impl WikiApi for FakeDevOps {
    async fn list_wikis(&self, project: &str) -> ApiResult<Vec<Wiki>> {
        self.record(format!("wikis:{project}"));
        Ok(vec![Wiki {
            id: "w1".into(),
            name: format!("{project}.wiki"),
            url: None,
            remote_url: None,
            wiki_type: Some("projectWiki".into()),
            project_id: None,
        }])
    }

    async fn get_page(
        &self,
        _project: &str,
        _wiki: &str,
        path: &str,
        include_content: bool,
    ) -> ApiResult<WikiPage> {
        self.record(format!("get:{path}"));
        if let Some(err) = self.get_error.lock().unwrap().take() {
            return Err(err);
        }
        let content = self
            .content(path)
            .ok_or_else(|| DevOpsError::NotFound(format!("page '{path}' not found")))?;
        Ok(WikiPage {
            path: path.to_string(),
            content: include_content.then_some(content),
            e_tag: Some("\"v1\"".into()),
            ..Default::default()
        })
    }

    async fn put_page(
        &self,
        _project: &str,
        _wiki: &str,
        path: &str,
        content: &str,
        version: Option<&str>,
    ) -> ApiResult<WikiPage> {
        self.record(format!("put:{path}:{}", version.unwrap_or("none")));
        if self.always_conflict {
            return Err(DevOpsError::Conflict("page version is out of date".into()));
        }
        if let Some(err) = self.put_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        if self.failing_paths.iter().any(|p| p == path) {
            return Err(DevOpsError::Remote {
                status: 400,
                message: format!("invalid page path '{path}'"),
            });
        }

        let mut pages = self.pages.lock().unwrap();
        match pages.iter_mut().find(|(p, _)| p == path) {
            Some(entry) => entry.1 = content.to_string(),
            None => pages.push((path.to_string(), content.to_string())),
        }
        Ok(WikiPage {
            path: path.to_string(),
            content: Some(content.to_string()),
            url: Some(format!("https://fake/wiki{path}")),
            e_tag: Some("\"v2\"".into()),
            ..Default::default()
        })
    }

    async fn delete_page(&self, _project: &str, _wiki: &str, path: &str) -> ApiResult<()> {
        self.record(format!("delete:{path}"));
        if let Some(err) = self.delete_error.lock().unwrap().take() {
            return Err(err);
        }
        self.pages.lock().unwrap().retain(|(p, _)| p != path);
        Ok(())
    }

    async fn list_pages(&self, _project: &str, _wiki: &str) -> ApiResult<Vec<PageSummary>> {
        self.record("list".into());
        Ok(self
            .pages
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| PageSummary {
                path: path.clone(),
                ..Default::default()
            })
            .collect())
    }
}

#[async_trait]
impl WorkItemApi for FakeDevOps {
    fn work_item_url(&self, id: u64) -> String {
        format!("https://fake/_apis/wit/workItems/{id}")
    }

    async fn create_work_item(
        &self,
        project: &str,
        work_item_type: &str,
        document: &[PatchOperation],
    ) -> ApiResult<WorkItem> {
        self.record(format!("create_item:{project}:{work_item_type}"));
        self.documents.lock().unwrap().push((0, document.to_vec()));
        Ok(Self::item(100, "created"))
    }

    async fn get_work_item(&self, id: u64) -> ApiResult<WorkItem> {
        self.record(format!("get_item:{id}"));
        Ok(Self::item(id, &format!("Item {id}")))
    }

    async fn get_work_items(&self, ids: &[u64]) -> ApiResult<Vec<WorkItem>> {
        self.record(format!("get_items:{}", ids.len()));
        Ok(ids
            .iter()
            .map(|id| Self::item(*id, &format!("Item {id}")))
            .collect())
    }

    async fn update_work_item(&self, id: u64, document: &[PatchOperation]) -> ApiResult<WorkItem> {
        self.record(format!("update_item:{id}"));
        self.documents.lock().unwrap().push((id, document.to_vec()));
        Ok(Self::item(id, &format!("Item {id}")))
    }

    async fn delete_work_item(&self, id: u64) -> ApiResult<()> {
        self.record(format!("delete_item:{id}"));
        Ok(())
    }

    async fn query_by_wiql(&self, query: &str) -> ApiResult<Vec<u64>> {
        self.record("wiql".into());
        self.queries.lock().unwrap().push(query.to_string());
        Ok(vec![1, 2])
    }

    async fn add_comment(&self, _project: &str, id: u64, text: &str) -> ApiResult<Comment> {
        self.record(format!("comment:{id}"));
        Ok(Comment {
            id: 1,
            work_item_id: Some(id),
            text: text.to_string(),
            created_by: None,
            created_date: None,
            modified_date: None,
        })
    }

    async fn list_comments(&self, _project: &str, id: u64) -> ApiResult<Vec<Comment>> {
        self.record(format!("comments:{id}"));
        Ok(Vec::new())
    }

    async fn list_updates(&self, id: u64) -> ApiResult<Vec<WorkItemUpdate>> {
        self.record(format!("updates:{id}"));
        Ok(Vec::new())
    }

    async fn get_work_item_type(&self, _project: &str, name: &str) -> ApiResult<WorkItemType> {
        self.record(format!("type:{name}"));
        self.work_item_type
            .clone()
            .ok_or_else(|| DevOpsError::NotFound(format!("work item type '{name}' not found")))
    }
}

#[async_trait]
impl CoreApi for FakeDevOps {
    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.record("projects".into());
        Ok(vec![Project {
            id: "p1".into(),
            name: "Alpha".into(),
            description: None,
            state: Some("wellFormed".into()),
            url: None,
        }])
    }

    async fn list_iterations(
        &self,
        project: &str,
        _team: Option<&str>,
        time_frame: Option<TimeFrame>,
    ) -> ApiResult<Vec<Iteration>> {
        let frame = time_frame.map(|f| f.as_str()).unwrap_or("any");
        self.record(format!("iterations:{project}:{frame}"));
        Ok(Vec::new())
    }
}

#[async_trait]
impl GitApi for FakeDevOps {
    async fn list_repositories(&self, project: &str) -> ApiResult<Vec<Repository>> {
        self.record(format!("repos:{project}"));
        Ok(Vec::new())
    }

    async fn list_items(
        &self,
        _project: &str,
        repository: &str,
        scope_path: &str,
    ) -> ApiResult<Vec<GitItem>> {
        self.record(format!("items:{repository}:{scope_path}"));
        Ok(Vec::new())
    }

    async fn get_item_text(&self, _project: &str, repository: &str, path: &str) -> ApiResult<String> {
        self.record(format!("text:{repository}:{path}"));
        Ok("fn main() {}\n".into())
    }
}
