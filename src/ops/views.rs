//! Views derived locally from a wiki's flat page listing.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::wiki::{page_title, PageSummary};

pub const SUGGESTION_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// One node of the page hierarchy. Children keep first-seen order.
#[derive(Debug, Default)]
pub struct TreeNode {
    children: Vec<(String, TreeNode)>,
    page: Option<PageSummary>,
}

impl TreeNode {
    fn child_entry(&mut self, name: &str) -> &mut TreeNode {
        let idx = match self.children.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.children.push((name.to_string(), TreeNode::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[idx].1
    }
}

/// The whole hierarchy; serializes as `{segment: {children, page?}}`.
#[derive(Debug, Default)]
pub struct PageTree {
    root: TreeNode,
}

#[cfg(test)]
impl TreeNode {
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn page(&self) -> Option<&PageSummary> {
        self.page.as_ref()
    }
}

#[cfg(test)]
impl PageTree {
    pub fn top_level(&self) -> Vec<&str> {
        self.root.child_names()
    }

    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.root.child(name)
    }
}

struct Children<'a>(&'a [(String, TreeNode)]);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, node) in self.0 {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.page.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("children", &Children(&self.children))?;
        if let Some(page) = &self.page {
            map.serialize_entry("page", page)?;
        }
        map.end()
    }
}

impl Serialize for PageTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Children(&self.root.children).serialize(serializer)
    }
}

pub fn build_tree(pages: &[PageSummary]) -> PageTree {
    let mut tree = PageTree::default();
    for page in pages {
        let segments: Vec<&str> = page.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        let mut node = &mut tree.root;
        for segment in segments {
            node = node.child_entry(segment);
        }
        node.page = Some(page.clone());
    }
    tree
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub path: String,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// 100 for a prefix match (leading "/" ignored on both sides), 50 for a
/// substring, 25 when some segment starts with the input.
pub fn suggestion_score(path: &str, input: &str) -> u32 {
    let path = path.to_lowercase();
    let input = input.to_lowercase();
    if path
        .trim_start_matches('/')
        .starts_with(input.trim_start_matches('/'))
    {
        100
    } else if path.contains(&input) {
        50
    } else if path.split('/').any(|segment| segment.starts_with(&input)) {
        25
    } else {
        0
    }
}

pub fn rank_suggestions(pages: &[PageSummary], input: &str) -> Vec<Suggestion> {
    let mut scored: Vec<Suggestion> = pages
        .iter()
        .map(|p| Suggestion {
            path: p.path.clone(),
            score: suggestion_score(&p.path, input),
            url: p.url.clone(),
        })
        .filter(|s| s.score > 0)
        .collect();
    // sort_by is stable, so equal scores keep listing order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(SUGGESTION_LIMIT);
    scored
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub fn search_score(path: &str, query: &str) -> u32 {
    let query = query.to_lowercase();
    let title = page_title(path).to_lowercase();
    if title == query {
        100
    } else if title.starts_with(&query) {
        75
    } else if title.contains(&query) {
        50
    } else if path.to_lowercase().contains(&query) {
        25
    } else {
        0
    }
}

pub fn rank_search(pages: &[PageSummary], query: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = pages
        .iter()
        .map(|p| SearchHit {
            path: p.path.clone(),
            title: p.title(),
            score: search_score(&p.path, query),
            url: p.url.clone(),
        })
        .filter(|h| h.score > 0)
        .collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}

/// First page whose title contains the wanted title, or is contained by it.
pub fn match_title<'p>(pages: &'p [PageSummary], title: &str) -> Option<&'p PageSummary> {
    let wanted = title.trim().replace(['-', '_'], " ").to_lowercase();
    pages.iter().find(|page| {
        let candidate = page.title().to_lowercase();
        !candidate.is_empty() && (candidate.contains(&wanted) || wanted.contains(&candidate))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(paths: &[&str]) -> Vec<PageSummary> {
        paths
            .iter()
            .map(|p| PageSummary {
                path: p.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn tree_shares_prefix_nodes() {
        let tree = build_tree(&pages(&["a/b", "a/c", "d"]));
        assert_eq!(tree.top_level(), vec!["a", "d"]);

        let a = tree.get("a").unwrap();
        assert_eq!(a.child_names(), vec!["b", "c"]);
        assert!(a.page().is_none());
        assert_eq!(a.child("b").unwrap().page().unwrap().path, "a/b");

        let d = tree.get("d").unwrap();
        assert!(d.child_names().is_empty());
        assert_eq!(d.page().unwrap().path, "d");
    }

    #[test]
    fn tree_keeps_insertion_order_and_intermediate_pages() {
        let tree = build_tree(&pages(&["/", "/Zeta", "/Alpha/Child", "/Alpha"]));
        assert_eq!(tree.top_level(), vec!["Zeta", "Alpha"]);
        let alpha = tree.get("Alpha").unwrap();
        assert_eq!(alpha.page().unwrap().path, "/Alpha");
        assert_eq!(alpha.child_names(), vec!["Child"]);
    }

    #[test]
    fn tree_serializes_in_insertion_order() {
        let tree = build_tree(&pages(&["z/y", "b"]));
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"{"z":{"children":{"y":{"children":{},"page":{"path":"z/y","view_stats":[]}}}},"b":{"children":{},"page":{"path":"b","view_stats":[]}}}"#
        );
    }

    #[test]
    fn suggestion_tiers() {
        assert_eq!(suggestion_score("/Home", "ho"), 100);
        assert_eq!(suggestion_score("/Guides/Setup", "setup"), 50);
        assert_eq!(suggestion_score("/Guides/Setup", "uide"), 50);
        assert_eq!(suggestion_score("/Guides/Setup", "xyz"), 0);
    }

    #[test]
    fn suggestions_drop_zero_scores_and_sort_stably() {
        let listing = pages(&["Home", "Home/Setup", "Guides/Setup"]);
        let ranked = rank_suggestions(&listing, "Setup");
        let paths: Vec<&str> = ranked.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["Home/Setup", "Guides/Setup"]);
        assert!(ranked.iter().all(|s| s.score == 50));
    }

    #[test]
    fn suggestions_put_prefix_matches_first() {
        let listing = pages(&["/Docs/Setup", "/Setup Guide", "/Other"]);
        let ranked = rank_suggestions(&listing, "setup");
        assert_eq!(ranked[0].path, "/Setup Guide");
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[1].path, "/Docs/Setup");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn slash_prefixed_input_matches_at_prefix_tier() {
        assert_eq!(suggestion_score("/Guides", "/Gu"), 100);
        assert_eq!(suggestion_score("/Docs/Guides", "/Gu"), 50);

        let ranked = rank_suggestions(&pages(&["/Docs/Guides", "/Guides"]), "/Gu");
        assert_eq!(ranked[0].path, "/Guides");
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[1].path, "/Docs/Guides");
        assert_eq!(ranked[1].score, 50);
    }

    #[test]
    fn suggestions_are_capped() {
        let paths: Vec<String> = (0..25).map(|i| format!("/Page{i}")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let ranked = rank_suggestions(&pages(&refs), "page");
        assert_eq!(ranked.len(), SUGGESTION_LIMIT);
        assert_eq!(ranked[0].path, "/Page0");
    }

    #[test]
    fn search_ranks_by_title_closeness() {
        let listing = pages(&[
            "/Archive/Deploy-Notes",
            "/Deploy",
            "/Ops/Deployment",
            "/Deploy/Checklist",
        ]);
        let hits = rank_search(&listing, "deploy", DEFAULT_SEARCH_LIMIT);
        let ranked: Vec<(&str, u32)> = hits.iter().map(|h| (h.path.as_str(), h.score)).collect();
        assert_eq!(
            ranked,
            vec![
                ("/Deploy", 100),
                ("/Archive/Deploy-Notes", 75),
                ("/Ops/Deployment", 75),
                ("/Deploy/Checklist", 25),
            ]
        );
        assert_eq!(hits[1].title, "Deploy Notes");
    }

    #[test]
    fn title_match_is_bidirectional() {
        let listing = pages(&["/", "/Team/On-Call_Rotation", "/Runbooks"]);
        assert_eq!(
            match_title(&listing, "on-call rotation").unwrap().path,
            "/Team/On-Call_Rotation"
        );
        assert_eq!(
            match_title(&listing, "All Runbooks for prod").unwrap().path,
            "/Runbooks"
        );
        assert!(match_title(&listing, "missing").is_none());
    }
}
