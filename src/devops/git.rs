use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::client::{RestClient, API_VERSION};
use super::{ApiResult, GitApi};
use crate::model::project::{GitItem, Repository};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    id: String,
    name: String,
    url: Option<String>,
    web_url: Option<String>,
    default_branch: Option<String>,
    size: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    path: String,
    object_id: Option<String>,
    #[serde(default)]
    is_folder: bool,
    url: Option<String>,
}

impl RestClient {
    fn items_url(&self, project: &str, repository: &str) -> String {
        self.project_api(
            project,
            &format!("git/repositories/{}/items", urlencoding::encode(repository)),
        )
    }
}

#[async_trait]
impl GitApi for RestClient {
    async fn list_repositories(&self, project: &str) -> ApiResult<Vec<Repository>> {
        let request = self
            .client
            .get(self.project_api(project, "git/repositories"))
            .query(&[("api-version", API_VERSION)]);
        let repos: Vec<RawRepository> = self.send_list(request).await?;
        Ok(repos
            .into_iter()
            .map(|r| Repository {
                id: r.id,
                name: r.name,
                url: r.url,
                web_url: r.web_url,
                default_branch: r.default_branch,
                size: r.size,
            })
            .collect())
    }

    async fn list_items(
        &self,
        project: &str,
        repository: &str,
        scope_path: &str,
    ) -> ApiResult<Vec<GitItem>> {
        let request = self.client.get(self.items_url(project, repository)).query(&[
            ("api-version", API_VERSION),
            ("scopePath", scope_path),
            ("recursionLevel", "Full"),
        ]);
        let items: Vec<RawItem> = self.send_list(request).await?;
        Ok(items
            .into_iter()
            .map(|i| GitItem {
                path: i.path,
                object_id: i.object_id,
                is_folder: i.is_folder,
                url: i.url,
            })
            .collect())
    }

    async fn get_item_text(&self, project: &str, repository: &str, path: &str) -> ApiResult<String> {
        let request = self
            .client
            .get(self.items_url(project, repository))
            .query(&[
                ("api-version", API_VERSION),
                ("path", path),
                ("includeContent", "true"),
            ])
            .header(ACCEPT, "text/plain");
        let resp = self.send(request).await?;
        Ok(resp.text().await?)
    }
}
