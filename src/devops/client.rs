use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiResult;
use crate::config::Config;
use crate::error::DevOpsError;

pub(super) const API_VERSION: &str = "7.1";
pub(super) const PREVIEW_API_VERSION: &str = "7.1-preview.4";
pub(super) const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// HTTP client for one Azure DevOps organization, authenticated with a PAT.
pub struct RestClient {
    org_url: String,
    auth_header: String,
    pub(super) client: reqwest::Client,
}

/// The `{count, value}` envelope most list endpoints use.
#[derive(Deserialize)]
pub(super) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self> {
        // PATs use basic auth with an empty user name.
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{}", config.pat));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("devops-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            org_url: config.org_url.clone(),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    /// `{org}/_apis/{path}`
    pub(super) fn org_api(&self, path: &str) -> String {
        format!("{}/_apis/{path}", self.org_url)
    }

    /// `{org}/{project}/_apis/{path}`
    pub(super) fn project_api(&self, project: &str, path: &str) -> String {
        format!(
            "{}/{}/_apis/{path}",
            self.org_url,
            urlencoding::encode(project)
        )
    }

    /// `{org}/{project}/{team}/_apis/{path}`
    pub(super) fn team_api(&self, project: &str, team: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/_apis/{path}",
            self.org_url,
            urlencoding::encode(project),
            urlencoding::encode(team)
        )
    }

    /// Send an authenticated request and turn any non-success status into a typed error.
    pub(super) async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let request = request.header(AUTHORIZATION, &self.auth_header);
        let resp = request.send().await?;
        let status = resp.status();
        tracing::debug!(url = %resp.url(), status = status.as_u16(), "azure devops response");

        // A rejected PAT gets a sign-in page with 203 instead of a 401.
        if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(DevOpsError::Remote {
                status: status.as_u16(),
                message: "authentication failed; check the personal access token".into(),
            });
        }
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(DevOpsError::from_status(
            status.as_u16(),
            error_message(&body, status),
        ))
    }

    pub(super) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let resp = self
            .send(request.header(ACCEPT, "application/json"))
            .await?;
        resp.json::<T>()
            .await
            .map_err(|e| DevOpsError::Decode(e.to_string()))
    }

    pub(super) async fn send_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<Vec<T>> {
        let list: ListResponse<T> = self.send_json(request).await?;
        Ok(list.value)
    }
}

/// Prefer the service's own `message` field over the raw body.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.chars().take(500).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            org_url: "https://dev.azure.com/contoso".into(),
            pat: "secret".into(),
            default_project: None,
            request_timeout_secs: 30,
            log_level: None,
        }
    }

    #[test]
    fn builds_scoped_urls() {
        let client = RestClient::new(&config()).unwrap();
        assert_eq!(
            client.org_api("projects"),
            "https://dev.azure.com/contoso/_apis/projects"
        );
        assert_eq!(
            client.project_api("My Project", "wiki/wikis"),
            "https://dev.azure.com/contoso/My%20Project/_apis/wiki/wikis"
        );
        assert_eq!(
            client.team_api("Proj", "Team A", "work/teamsettings/iterations"),
            "https://dev.azure.com/contoso/Proj/Team%20A/_apis/work/teamsettings/iterations"
        );
    }

    #[test]
    fn auth_header_encodes_empty_user() {
        let client = RestClient::new(&config()).unwrap();
        // base64(":secret")
        assert_eq!(client.auth_header, "Basic OnNlY3JldA==");
    }

    #[test]
    fn error_message_prefers_service_message() {
        let body = r#"{"$id":"1","innerException":null,"message":"TF401232: Work item 99 does not exist.","typeName":"x","errorCode":0}"#;
        assert_eq!(
            error_message(body, StatusCode::NOT_FOUND),
            "TF401232: Work item 99 does not exist."
        );
        assert_eq!(error_message("", StatusCode::CONFLICT), "Conflict");
        assert_eq!(error_message("plain text", StatusCode::BAD_REQUEST), "plain text");
    }
}
