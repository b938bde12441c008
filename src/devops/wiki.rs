use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ETAG, IF_MATCH};
use serde::Deserialize;
use serde_json::json;

use super::client::{RestClient, API_VERSION, CONTINUATION_HEADER};
use super::{ApiResult, WikiApi};
use crate::model::wiki::{PageSummary, ViewStat, Wiki, WikiPage};

const PAGES_BATCH_SIZE: u32 = 100;
const PAGE_VIEW_DAYS: u32 = 30;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWiki {
    id: String,
    name: String,
    url: Option<String>,
    remote_url: Option<String>,
    #[serde(rename = "type")]
    wiki_type: Option<String>,
    project_id: Option<String>,
}

impl From<RawWiki> for Wiki {
    fn from(raw: RawWiki) -> Self {
        Wiki {
            id: raw.id,
            name: raw.name,
            url: raw.url,
            remote_url: raw.remote_url,
            wiki_type: raw.wiki_type,
            project_id: raw.project_id,
        }
    }
}

/// A page body. Some responses wrap the page in a `{eTag, page}` envelope, so
/// both levels are accepted.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    id: Option<u64>,
    path: Option<String>,
    content: Option<String>,
    url: Option<String>,
    remote_url: Option<String>,
    git_item_path: Option<String>,
    e_tag: Option<String>,
    page: Option<Box<RawPage>>,
}

impl RawPage {
    /// Flatten the envelope. `header_etag` is the response's `ETag` header.
    fn into_page(self, header_etag: Option<String>, requested_path: &str) -> WikiPage {
        let e_tag = resolve_version(header_etag, &self);
        let inner = self.page.map(|p| *p).unwrap_or_default();
        WikiPage {
            id: self.id.or(inner.id),
            path: self
                .path
                .or(inner.path)
                .unwrap_or_else(|| requested_path.to_string()),
            content: self.content.or(inner.content),
            url: self.url.or(inner.url),
            remote_url: self.remote_url.or(inner.remote_url),
            git_item_path: self.git_item_path.or(inner.git_item_path),
            e_tag,
        }
    }
}

/// Concurrency token precedence: response header, then body `eTag`, then `page.eTag`.
fn resolve_version(header_etag: Option<String>, raw: &RawPage) -> Option<String> {
    header_etag
        .filter(|t| !t.is_empty())
        .or_else(|| raw.e_tag.clone())
        .or_else(|| raw.page.as_ref().and_then(|p| p.e_tag.clone()))
}

#[derive(Deserialize)]
struct RawViewStat {
    day: DateTime<Utc>,
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageDetail {
    id: Option<u64>,
    path: String,
    url: Option<String>,
    #[serde(default)]
    view_stats: Vec<RawViewStat>,
}

impl From<RawPageDetail> for PageSummary {
    fn from(raw: RawPageDetail) -> Self {
        PageSummary {
            id: raw.id,
            path: raw.path,
            url: raw.url,
            view_stats: raw
                .view_stats
                .into_iter()
                .map(|s| ViewStat {
                    day: s.day,
                    count: s.count,
                })
                .collect(),
        }
    }
}

impl RestClient {
    fn pages_url(&self, project: &str, wiki: &str) -> String {
        self.project_api(
            project,
            &format!("wiki/wikis/{}/pages", urlencoding::encode(wiki)),
        )
    }
}

fn etag_header(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[async_trait]
impl WikiApi for RestClient {
    async fn list_wikis(&self, project: &str) -> ApiResult<Vec<Wiki>> {
        let request = self
            .client
            .get(self.project_api(project, "wiki/wikis"))
            .query(&[("api-version", API_VERSION)]);
        let wikis: Vec<RawWiki> = self.send_list(request).await?;
        Ok(wikis.into_iter().map(Wiki::from).collect())
    }

    async fn get_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        include_content: bool,
    ) -> ApiResult<WikiPage> {
        let include = if include_content { "true" } else { "false" };
        let request = self
            .client
            .get(self.pages_url(project, wiki))
            .query(&[
                ("api-version", API_VERSION),
                ("path", path),
                ("includeContent", include),
            ])
            .header(reqwest::header::ACCEPT, "application/json");
        let resp = self.send(request).await?;
        let etag = etag_header(&resp);
        let raw: RawPage = resp.json().await?;
        Ok(raw.into_page(etag, path))
    }

    async fn put_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        content: &str,
        version: Option<&str>,
    ) -> ApiResult<WikiPage> {
        let mut request = self
            .client
            .put(self.pages_url(project, wiki))
            .query(&[("api-version", API_VERSION), ("path", path)])
            .json(&json!({ "content": content }));
        if let Some(version) = version {
            request = request.header(IF_MATCH, version);
        }
        let resp = self.send(request).await?;
        let etag = etag_header(&resp);
        let raw: RawPage = resp.json().await?;
        Ok(raw.into_page(etag, path))
    }

    async fn delete_page(&self, project: &str, wiki: &str, path: &str) -> ApiResult<()> {
        let request = self
            .client
            .delete(self.pages_url(project, wiki))
            .query(&[("api-version", API_VERSION), ("path", path)]);
        self.send(request).await?;
        Ok(())
    }

    async fn list_pages(&self, project: &str, wiki: &str) -> ApiResult<Vec<PageSummary>> {
        let url = self.project_api(
            project,
            &format!("wiki/wikis/{}/pagesbatch", urlencoding::encode(wiki)),
        );
        let mut pages = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut body = json!({
                "top": PAGES_BATCH_SIZE,
                "pageViewsForDays": PAGE_VIEW_DAYS,
            });
            if let Some(token) = &continuation {
                body["continuationToken"] = json!(token);
            }
            let request = self
                .client
                .post(&url)
                .query(&[("api-version", API_VERSION)])
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&body);
            let resp = self.send(request).await?;
            let next = resp
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from);
            let batch: super::client::ListResponse<RawPageDetail> = resp.json().await?;
            let fetched = batch.value.len();
            pages.extend(batch.value.into_iter().map(PageSummary::from));

            match next {
                Some(token) if fetched > 0 && continuation.as_deref() != Some(token.as_str()) => {
                    continuation = Some(token);
                }
                _ => break,
            }
        }

        tracing::debug!(wiki, count = pages.len(), "listed wiki pages");
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_etag_wins_over_body() {
        let raw: RawPage = serde_json::from_str(
            r#"{"path": "/Home", "eTag": "\"body\"", "page": {"eTag": "\"nested\""}}"#,
        )
        .unwrap();
        assert_eq!(
            resolve_version(Some("\"header\"".into()), &raw).as_deref(),
            Some("\"header\"")
        );
    }

    #[test]
    fn body_etag_then_nested_etag() {
        let raw: RawPage =
            serde_json::from_str(r#"{"eTag": "top", "page": {"eTag": "nested"}}"#).unwrap();
        assert_eq!(resolve_version(None, &raw).as_deref(), Some("top"));

        let raw: RawPage = serde_json::from_str(r#"{"page": {"eTag": "nested"}}"#).unwrap();
        assert_eq!(resolve_version(Some(String::new()), &raw).as_deref(), Some("nested"));

        let raw: RawPage = serde_json::from_str(r#"{"path": "/x"}"#).unwrap();
        assert_eq!(resolve_version(None, &raw), None);
    }

    #[test]
    fn envelope_is_flattened() {
        let raw: RawPage = serde_json::from_str(
            r#"{"eTag": "v1", "page": {"id": 4, "path": "/Docs/Intro", "content": "hello",
                 "url": "https://example/wiki/4", "gitItemPath": "/Docs/Intro.md"}}"#,
        )
        .unwrap();
        let page = raw.into_page(None, "/ignored");
        assert_eq!(page.id, Some(4));
        assert_eq!(page.path, "/Docs/Intro");
        assert_eq!(page.content.as_deref(), Some("hello"));
        assert_eq!(page.git_item_path.as_deref(), Some("/Docs/Intro.md"));
        assert_eq!(page.e_tag.as_deref(), Some("v1"));
    }

    #[test]
    fn missing_path_falls_back_to_requested() {
        let page = RawPage::default().into_page(Some("etag".into()), "/Requested");
        assert_eq!(page.path, "/Requested");
        assert_eq!(page.e_tag.as_deref(), Some("etag"));
    }

    #[test]
    fn page_details_parse_view_stats() {
        let raw: RawPageDetail = serde_json::from_str(
            r#"{"id": 2, "path": "/Home", "viewStats": [{"day": "2024-05-01T00:00:00Z", "count": 3}]}"#,
        )
        .unwrap();
        let summary = PageSummary::from(raw);
        assert_eq!(summary.view_stats.len(), 1);
        assert_eq!(summary.view_stats[0].count, 3);
        assert!(summary.url.is_none());
    }
}
