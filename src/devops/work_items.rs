use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{RestClient, API_VERSION, PREVIEW_API_VERSION};
use super::{ApiResult, WorkItemApi};
use crate::error::DevOpsError;
use crate::model::work_item::{
    Comment, FieldChange, PatchOperation, Relation, StateTransition, WorkItem, WorkItemState,
    WorkItemType, WorkItemUpdate,
};

/// The batch endpoint rejects more ids than this per call.
const BATCH_LIMIT: usize = 200;
const JSON_PATCH: &str = "application/json-patch+json";

#[derive(Deserialize)]
struct RawWorkItem {
    id: u64,
    rev: Option<u64>,
    url: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    relations: Option<Vec<Relation>>,
}

impl From<RawWorkItem> for WorkItem {
    fn from(raw: RawWorkItem) -> Self {
        WorkItem::from_fields(
            raw.id,
            raw.rev,
            raw.url,
            raw.fields,
            raw.relations.unwrap_or_default(),
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRef {
    display_name: Option<String>,
    unique_name: Option<String>,
}

impl IdentityRef {
    fn name(self) -> Option<String> {
        self.display_name.or(self.unique_name)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComment {
    id: u64,
    work_item_id: Option<u64>,
    text: Option<String>,
    created_by: Option<IdentityRef>,
    created_date: Option<DateTime<Utc>>,
    modified_date: Option<DateTime<Utc>>,
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        Comment {
            id: raw.id,
            work_item_id: raw.work_item_id,
            text: raw.text.unwrap_or_default(),
            created_by: raw.created_by.and_then(IdentityRef::name),
            created_date: raw.created_date,
            modified_date: raw.modified_date,
        }
    }
}

#[derive(Deserialize)]
struct CommentList {
    #[serde(default)]
    comments: Vec<RawComment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldChange {
    old_value: Option<Value>,
    new_value: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpdate {
    id: u64,
    rev: Option<u64>,
    revised_by: Option<IdentityRef>,
    revised_date: Option<DateTime<Utc>>,
    #[serde(default)]
    fields: BTreeMap<String, RawFieldChange>,
}

impl From<RawUpdate> for WorkItemUpdate {
    fn from(raw: RawUpdate) -> Self {
        WorkItemUpdate {
            id: raw.id,
            rev: raw.rev,
            revised_by: raw.revised_by.and_then(IdentityRef::name),
            revised_date: raw.revised_date,
            fields: raw
                .fields
                .into_iter()
                .map(|(name, change)| {
                    (
                        name,
                        FieldChange {
                            old_value: change.old_value,
                            new_value: change.new_value,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct WiqlResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WiqlRef>,
}

#[derive(Deserialize)]
struct WiqlRef {
    id: u64,
}

#[derive(Deserialize)]
struct RawState {
    name: String,
    color: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct RawTransition {
    to: String,
    actions: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawWorkItemType {
    name: String,
    states: Option<Vec<RawState>>,
    transitions: Option<BTreeMap<String, Vec<RawTransition>>>,
}

impl From<RawWorkItemType> for WorkItemType {
    fn from(raw: RawWorkItemType) -> Self {
        WorkItemType {
            name: raw.name,
            states: raw.states.map(|states| {
                states
                    .into_iter()
                    .map(|s| WorkItemState {
                        name: s.name,
                        color: s.color,
                        category: s.category,
                    })
                    .collect()
            }),
            transitions: raw.transitions.map(|map| {
                map.into_iter()
                    .map(|(from, list)| {
                        let list = list
                            .into_iter()
                            .map(|t| StateTransition {
                                to: t.to,
                                actions: t.actions.unwrap_or_default(),
                            })
                            .collect();
                        (from, list)
                    })
                    .collect()
            }),
        }
    }
}

fn patch_body(document: &[PatchOperation]) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(document).map_err(|e| DevOpsError::InvalidArgument(e.to_string()))
}

#[async_trait]
impl WorkItemApi for RestClient {
    fn work_item_url(&self, id: u64) -> String {
        self.org_api(&format!("wit/workItems/{id}"))
    }

    async fn create_work_item(
        &self,
        project: &str,
        work_item_type: &str,
        document: &[PatchOperation],
    ) -> ApiResult<WorkItem> {
        let url = self.project_api(
            project,
            &format!("wit/workitems/${}", urlencoding::encode(work_item_type)),
        );
        let request = self
            .client
            .post(url)
            .query(&[("api-version", API_VERSION)])
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(patch_body(document)?);
        let raw: RawWorkItem = self.send_json(request).await?;
        Ok(raw.into())
    }

    async fn get_work_item(&self, id: u64) -> ApiResult<WorkItem> {
        let request = self
            .client
            .get(self.org_api(&format!("wit/workitems/{id}")))
            .query(&[("api-version", API_VERSION), ("$expand", "relations")]);
        let raw: RawWorkItem = self.send_json(request).await?;
        Ok(raw.into())
    }

    async fn get_work_items(&self, ids: &[u64]) -> ApiResult<Vec<WorkItem>> {
        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            let joined = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let request = self.client.get(self.org_api("wit/workitems")).query(&[
                ("api-version", API_VERSION),
                ("ids", joined.as_str()),
                ("errorPolicy", "omit"),
            ]);
            let batch: Vec<Option<RawWorkItem>> = self.send_list(request).await?;
            items.extend(batch.into_iter().flatten().map(WorkItem::from));
        }
        Ok(items)
    }

    async fn update_work_item(&self, id: u64, document: &[PatchOperation]) -> ApiResult<WorkItem> {
        let request = self
            .client
            .patch(self.org_api(&format!("wit/workitems/{id}")))
            .query(&[("api-version", API_VERSION)])
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(patch_body(document)?);
        let raw: RawWorkItem = self.send_json(request).await?;
        Ok(raw.into())
    }

    async fn delete_work_item(&self, id: u64) -> ApiResult<()> {
        let request = self
            .client
            .delete(self.org_api(&format!("wit/workitems/{id}")))
            .query(&[("api-version", API_VERSION)]);
        self.send(request).await?;
        Ok(())
    }

    async fn query_by_wiql(&self, query: &str) -> ApiResult<Vec<u64>> {
        let request = self
            .client
            .post(self.org_api("wit/wiql"))
            .query(&[("api-version", API_VERSION)])
            .json(&json!({ "query": query }));
        let result: WiqlResult = self.send_json(request).await?;
        Ok(result.work_items.into_iter().map(|r| r.id).collect())
    }

    async fn add_comment(&self, project: &str, id: u64, text: &str) -> ApiResult<Comment> {
        let request = self
            .client
            .post(self.project_api(project, &format!("wit/workItems/{id}/comments")))
            .query(&[("api-version", PREVIEW_API_VERSION)])
            .json(&json!({ "text": text }));
        let raw: RawComment = self.send_json(request).await?;
        Ok(raw.into())
    }

    async fn list_comments(&self, project: &str, id: u64) -> ApiResult<Vec<Comment>> {
        let request = self
            .client
            .get(self.project_api(project, &format!("wit/workItems/{id}/comments")))
            .query(&[("api-version", PREVIEW_API_VERSION)]);
        let list: CommentList = self.send_json(request).await?;
        Ok(list.comments.into_iter().map(Comment::from).collect())
    }

    async fn list_updates(&self, id: u64) -> ApiResult<Vec<WorkItemUpdate>> {
        let request = self
            .client
            .get(self.org_api(&format!("wit/workItems/{id}/updates")))
            .query(&[("api-version", API_VERSION)]);
        let updates: Vec<RawUpdate> = self.send_list(request).await?;
        Ok(updates.into_iter().map(WorkItemUpdate::from).collect())
    }

    async fn get_work_item_type(&self, project: &str, name: &str) -> ApiResult<WorkItemType> {
        let request = self
            .client
            .get(self.project_api(
                project,
                &format!("wit/workitemtypes/{}", urlencoding::encode(name)),
            ))
            .query(&[("api-version", API_VERSION)]);
        let raw: RawWorkItemType = self.send_json(request).await?;
        Ok(raw.into())
    }
}
