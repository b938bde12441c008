use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::devops::{ApiResult, WorkItemApi};
use crate::error::DevOpsError;
use crate::model::work_item::{
    PatchOperation, Relation, WorkItem, WorkItemState, WorkItemSummary, WorkItemType,
    FIELD_DESCRIPTION, FIELD_TITLE,
};

const PARENT_LINK: &str = "System.LinkTypes.Hierarchy-Reverse";
const CHILD_LINK: &str = "System.LinkTypes.Hierarchy-Forward";
const RELATED_LINK: &str = "System.LinkTypes.Related";
const PREDECESSOR_LINK: &str = "System.LinkTypes.Dependency-Reverse";
const SUCCESSOR_LINK: &str = "System.LinkTypes.Dependency-Forward";

/// Map a friendly link name onto a relation type; unknown names pass through.
pub fn link_type(name: &str) -> &str {
    match name.to_ascii_lowercase().as_str() {
        "parent" => PARENT_LINK,
        "child" => CHILD_LINK,
        "related" => RELATED_LINK,
        "predecessor" => PREDECESSOR_LINK,
        "successor" => SUCCESSOR_LINK,
        _ => name,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub actions: Vec<String>,
}

/// Transitions out of one state. `error` is set instead of failing the call.
#[derive(Debug, Serialize)]
pub struct TransitionReport {
    pub work_item_type: String,
    pub from_state: String,
    pub transitions: Vec<Transition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct WorkItemOps<'a, A: WorkItemApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: WorkItemApi + ?Sized> WorkItemOps<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn create(
        &self,
        project: &str,
        work_item_type: &str,
        title: &str,
        description: Option<&str>,
        fields: &BTreeMap<String, Value>,
        parent_id: Option<u64>,
    ) -> ApiResult<WorkItem> {
        if title.trim().is_empty() {
            return Err(DevOpsError::InvalidArgument("title is empty".into()));
        }

        let mut document = vec![PatchOperation::add_field(FIELD_TITLE, title)];
        if let Some(description) = description {
            document.push(PatchOperation::add_field(FIELD_DESCRIPTION, description));
        }
        for (field, value) in fields {
            document.push(PatchOperation::add_field(field, value.clone()));
        }
        if let Some(parent) = parent_id {
            document.push(PatchOperation::add_relation(&Relation {
                rel: PARENT_LINK.into(),
                url: self.api.work_item_url(parent),
                attributes: None,
            }));
        }

        self.api
            .create_work_item(project, work_item_type, &document)
            .await
    }

    pub async fn update(&self, id: u64, updates: &BTreeMap<String, Value>) -> ApiResult<WorkItem> {
        if updates.is_empty() {
            return Err(DevOpsError::InvalidArgument("no fields to update".into()));
        }
        let document: Vec<PatchOperation> = updates
            .iter()
            .map(|(field, value)| PatchOperation::add_field(field, value.clone()))
            .collect();
        self.api.update_work_item(id, &document).await
    }

    pub async fn search(&self, project: &str, wiql: &str) -> ApiResult<Vec<WorkItemSummary>> {
        let query = scope_wiql(wiql, project);
        tracing::debug!(%query, "running wiql");
        let ids = self.api.query_by_wiql(&query).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.api.get_work_items(&ids).await?;
        Ok(items.into_iter().map(WorkItemSummary::from).collect())
    }

    pub async fn link(
        &self,
        source_id: u64,
        target_id: u64,
        link: &str,
        comment: Option<&str>,
    ) -> ApiResult<WorkItem> {
        if source_id == target_id {
            return Err(DevOpsError::InvalidArgument(
                "a work item cannot be linked to itself".into(),
            ));
        }
        let attributes = comment.map(|c| {
            let mut attrs = BTreeMap::new();
            attrs.insert("comment".to_string(), Value::from(c));
            attrs
        });
        let relation = Relation {
            rel: link_type(link).to_string(),
            url: self.api.work_item_url(target_id),
            attributes,
        };
        self.api
            .update_work_item(source_id, &[PatchOperation::add_relation(&relation)])
            .await
    }

    pub async fn states(&self, project: &str, work_item_type: &str) -> ApiResult<Vec<WorkItemState>> {
        let ty = self.api.get_work_item_type(project, work_item_type).await?;
        Ok(ty.states.unwrap_or_default())
    }

    /// Never fails: any error is reported inside the returned value.
    pub async fn transitions(
        &self,
        project: &str,
        work_item_type: &str,
        from_state: &str,
    ) -> TransitionReport {
        let (transitions, error) = match self.api.get_work_item_type(project, work_item_type).await {
            Ok(ty) => (available_transitions(&ty, from_state), None),
            Err(err) => {
                tracing::warn!(work_item_type, from_state, error = %err, "transition lookup failed");
                (Vec::new(), Some(err.to_string()))
            }
        };
        TransitionReport {
            work_item_type: work_item_type.to_string(),
            from_state: from_state.to_string(),
            transitions,
            error,
        }
    }
}

/// Declared transitions from `from_state`, or every other state when the type
/// declares no transition metadata.
pub fn available_transitions(ty: &WorkItemType, from_state: &str) -> Vec<Transition> {
    match &ty.transitions {
        Some(map) => map
            .iter()
            .filter(|(from, _)| from.eq_ignore_ascii_case(from_state))
            .flat_map(|(from, list)| {
                list.iter().map(move |t| Transition {
                    from: from.clone(),
                    to: t.to.clone(),
                    actions: t.actions.clone(),
                })
            })
            .collect(),
        None => ty
            .states
            .iter()
            .flatten()
            .filter(|s| !s.name.eq_ignore_ascii_case(from_state))
            .map(|s| Transition {
                from: from_state.to_string(),
                to: s.name.clone(),
                actions: Vec::new(),
            })
            .collect(),
    }
}

/// Restrict a WIQL query to `project` unless it already filters on a team project.
pub fn scope_wiql(query: &str, project: &str) -> String {
    let lower = query.to_ascii_lowercase();
    if lower.contains("[system.teamproject]") {
        return query.to_string();
    }

    let clause = format!("[System.TeamProject] = '{}'", project.replace('\'', "''"));
    let order = find_order_by(&lower);

    match find_keyword(&lower, "where") {
        Some(where_at) if order.map_or(true, |o| where_at < o) => {
            let cond_end = order.unwrap_or(query.len());
            let head = &query[..where_at + "where".len()];
            let condition = query[where_at + "where".len()..cond_end].trim();
            let tail = query[cond_end..].trim();
            join_tail(format!("{head} {clause} AND ({condition})"), tail)
        }
        _ => {
            let cut = order.unwrap_or(query.len());
            let head = query[..cut].trim_end();
            let tail = query[cut..].trim();
            join_tail(format!("{head} WHERE {clause}"), tail)
        }
    }
}

fn join_tail(mut query: String, tail: &str) -> String {
    if !tail.is_empty() {
        query.push(' ');
        query.push_str(tail);
    }
    query
}

/// Byte offset of `keyword` as a whole word outside single-quoted literals.
/// `haystack` must be ASCII-lowercased.
fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let word = keyword.as_bytes();
    let mut in_quote = false;
    for idx in 0..bytes.len() {
        // An escaped '' toggles twice and stays inside the literal.
        if bytes[idx] == b'\'' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote || !bytes[idx..].starts_with(word) {
            continue;
        }
        let end = idx + word.len();
        let before = idx == 0 || bytes[idx - 1].is_ascii_whitespace();
        let after = end == bytes.len() || bytes[end].is_ascii_whitespace();
        if before && after {
            return Some(idx);
        }
    }
    None
}

/// Byte offset of `order` when followed by `by` across any run of whitespace.
fn find_order_by(haystack: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = find_keyword(&haystack[from..], "order") {
        let at = from + rel;
        let rest = &haystack[at + "order".len()..];
        let gap = rest.len() - rest.trim_start().len();
        if gap > 0 && find_keyword(&rest[gap..], "by") == Some(0) {
            return Some(at);
        }
        from = at + "order".len();
    }
    None
}
