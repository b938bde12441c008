use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use super::args::*;

/// One entry of the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// JSON Schema for an argument struct, without the draft metadata clients don't need.
pub fn json_schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties")
            .or_insert_with(|| serde_json::json!({}));
    }
    value
}

fn tool<T: JsonSchema>(name: &'static str, description: &'static str) -> ToolDef {
    ToolDef {
        name,
        description,
        input_schema: json_schema_for::<T>(),
    }
}

pub fn catalog() -> Vec<ToolDef> {
    vec![
        // projects and context
        tool::<NoArgs>("get_projects", "List the projects in the organization."),
        tool::<SetProjectArgs>(
            "set_project_context",
            "Set the default project used when a tool call omits `project`.",
        ),
        tool::<NoArgs>("get_project_context", "Show the current default project, if any."),
        tool::<NoArgs>("clear_project_context", "Forget the default project."),
        // work items
        tool::<CreateWorkItemArgs>(
            "create_work_item",
            "Create a work item, optionally with extra fields and a parent link.",
        ),
        tool::<WorkItemIdArgs>("get_work_item", "Get a work item with all fields and relations."),
        tool::<UpdateWorkItemArgs>("update_work_item", "Set one or more fields on a work item."),
        tool::<WorkItemIdArgs>("delete_work_item", "Delete a work item (moves it to the recycle bin)."),
        tool::<SearchWorkItemsArgs>(
            "search_work_items",
            "Run a WIQL query in a project and return matching work items.",
        ),
        tool::<AddCommentArgs>("add_work_item_comment", "Add a comment to a work item."),
        tool::<ProjectWorkItemArgs>("get_work_item_comments", "List the comments on a work item."),
        tool::<WorkItemIdArgs>(
            "get_work_item_history",
            "List the revisions of a work item with the fields each one changed.",
        ),
        tool::<LinkWorkItemsArgs>("link_work_items", "Link two work items."),
        tool::<WorkItemTypeArgs>(
            "get_work_item_states",
            "List the states declared by a work item type.",
        ),
        tool::<TransitionsArgs>(
            "get_work_item_transitions",
            "List the states a work item type can move to from a given state.",
        ),
        tool::<IterationsArgs>("get_iterations", "List a team's iterations (sprints)."),
        // wikis
        tool::<ProjectArgs>("get_wikis", "List the wikis of a project."),
        tool::<PageArgs>("get_wiki_page", "Get a wiki page with its content."),
        tool::<PageContentArgs>("create_wiki_page", "Create a new wiki page."),
        tool::<PageContentArgs>(
            "update_wiki_page",
            "Replace the content of an existing wiki page (single attempt).",
        ),
        tool::<SafeUpdateArgs>(
            "safe_update_wiki_page",
            "Replace a wiki page's content, retrying when someone else edited it concurrently.",
        ),
        tool::<PageContentArgs>(
            "create_or_update_wiki_page",
            "Update a wiki page, creating it if it does not exist.",
        ),
        tool::<PageArgs>("delete_wiki_page", "Delete a wiki page."),
        tool::<WikiArgs>("list_wiki_pages", "List every page of a wiki with recent view counts."),
        tool::<WikiArgs>("get_wiki_page_tree", "Show a wiki's pages as a nested tree."),
        tool::<SearchPagesArgs>("search_wiki_pages", "Find wiki pages whose title or path matches."),
        tool::<PageTitleArgs>(
            "get_wiki_page_by_title",
            "Find the first wiki page whose title matches and return it with content.",
        ),
        tool::<SuggestionsArgs>(
            "get_wiki_page_suggestions",
            "Suggest existing page paths for a partially typed path.",
        ),
        tool::<MovePageArgs>(
            "move_wiki_page",
            "Move a wiki page by copying it to the new path and deleting the original.",
        ),
        tool::<BatchCreateArgs>(
            "batch_create_wiki_pages",
            "Create several wiki pages, reporting success or failure for each.",
        ),
        // repositories
        tool::<ProjectArgs>("list_repositories", "List the git repositories of a project."),
        tool::<ListFilesArgs>("list_files", "List files and folders under a repository path."),
        tool::<FileContentArgs>("get_file_content", "Get the text content of a repository file."),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique() {
        let tools = catalog();
        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 33);
    }

    #[test]
    fn schemas_are_objects() {
        for tool in catalog() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
        }
    }

    #[test]
    fn optional_project_is_not_required() {
        let schema = json_schema_for::<PageArgs>();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"wiki_identifier"));
        assert!(required.contains(&"path"));
        assert!(!required.contains(&"project"));
        assert!(schema["properties"]["path"]["description"].is_string());
    }

    #[test]
    fn serializes_with_input_schema_key() {
        let value = serde_json::to_value(&catalog()[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
    }
}
