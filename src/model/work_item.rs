use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIELD_TITLE: &str = "System.Title";
pub const FIELD_STATE: &str = "System.State";
pub const FIELD_DESCRIPTION: &str = "System.Description";
pub const FIELD_WORK_ITEM_TYPE: &str = "System.WorkItemType";
pub const FIELD_ASSIGNED_TO: &str = "System.AssignedTo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Every field the service returned, keyed by reference name.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl WorkItem {
    /// Build a work item from its raw field map, lifting the common fields out.
    pub fn from_fields(
        id: u64,
        rev: Option<u64>,
        url: Option<String>,
        fields: BTreeMap<String, Value>,
        relations: Vec<Relation>,
    ) -> Self {
        let text = |name: &str| fields.get(name).and_then(field_text);
        Self {
            id,
            rev,
            url,
            title: text(FIELD_TITLE),
            state: text(FIELD_STATE),
            work_item_type: text(FIELD_WORK_ITEM_TYPE),
            description: text(FIELD_DESCRIPTION),
            assigned_to: text(FIELD_ASSIGNED_TO),
            fields,
            relations,
        }
    }
}

/// The short form returned by searches.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItemSummary {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<WorkItem> for WorkItemSummary {
    fn from(item: WorkItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            state: item.state,
            work_item_type: item.work_item_type,
            assigned_to: item.assigned_to,
            url: item.url,
        }
    }
}

/// Identity fields come back as `{displayName, uniqueName, ...}` objects.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("displayName")
            .or_else(|| obj.get("uniqueName"))
            .and_then(|v| v.as_str())
            .map(String::from),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// One field-level instruction of a JSON-patch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add_field(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("/fields/{field}"),
            value: Some(value.into()),
        }
    }

    pub fn add_relation(relation: &Relation) -> Self {
        Self {
            op: PatchOp::Add,
            path: "/relations/-".into(),
            value: serde_json::to_value(relation).ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<u64>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// One revision in a work item's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub to: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A work item type definition. Either metadata list may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItemType {
    pub name: String,
    pub states: Option<Vec<WorkItemState>>,
    /// Keyed by the state the transition starts from.
    pub transitions: Option<BTreeMap<String, Vec<StateTransition>>>,
}
