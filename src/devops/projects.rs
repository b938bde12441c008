use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::client::{RestClient, API_VERSION};
use super::{ApiResult, CoreApi};
use crate::model::project::{Iteration, Project, TimeFrame};

#[derive(Deserialize)]
struct RawProject {
    id: String,
    name: String,
    description: Option<String>,
    state: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct IterationAttributes {
    start_date: Option<DateTime<Utc>>,
    finish_date: Option<DateTime<Utc>>,
    time_frame: Option<TimeFrame>,
}

#[derive(Deserialize)]
struct RawIteration {
    id: String,
    name: String,
    path: Option<String>,
    url: Option<String>,
    attributes: Option<IterationAttributes>,
}

impl From<RawIteration> for Iteration {
    fn from(raw: RawIteration) -> Self {
        let attributes = raw.attributes.unwrap_or_default();
        Iteration {
            id: raw.id,
            name: raw.name,
            path: raw.path,
            start_date: attributes.start_date,
            finish_date: attributes.finish_date,
            time_frame: attributes.time_frame,
            url: raw.url,
        }
    }
}

#[async_trait]
impl CoreApi for RestClient {
    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let request = self
            .client
            .get(self.org_api("projects"))
            .query(&[("api-version", API_VERSION), ("$top", "500")]);
        let projects: Vec<RawProject> = self.send_list(request).await?;
        Ok(projects
            .into_iter()
            .map(|p| Project {
                id: p.id,
                name: p.name,
                description: p.description,
                state: p.state,
                url: p.url,
            })
            .collect())
    }

    async fn list_iterations(
        &self,
        project: &str,
        team: Option<&str>,
        time_frame: Option<TimeFrame>,
    ) -> ApiResult<Vec<Iteration>> {
        let path = "work/teamsettings/iterations";
        let url = match team {
            Some(team) => self.team_api(project, team, path),
            None => self.project_api(project, path),
        };
        let mut request = self.client.get(url).query(&[("api-version", API_VERSION)]);
        if let Some(frame) = time_frame {
            request = request.query(&[("$timeframe", frame.as_str())]);
        }
        let iterations: Vec<RawIteration> = self.send_list(request).await?;
        Ok(iterations.into_iter().map(Iteration::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_attributes_are_flattened() {
        let raw: RawIteration = serde_json::from_str(
            r#"{"id": "a1", "name": "Sprint 4", "path": "Proj\\Sprint 4",
                "attributes": {"startDate": "2024-06-03T00:00:00Z",
                               "finishDate": "2024-06-14T00:00:00Z",
                               "timeFrame": "current"}}"#,
        )
        .unwrap();
        let iteration = Iteration::from(raw);
        assert_eq!(iteration.time_frame, Some(TimeFrame::Current));
        assert!(iteration.start_date.is_some());
        assert_eq!(iteration.path.as_deref(), Some("Proj\\Sprint 4"));
    }

    #[test]
    fn iteration_without_attributes() {
        let raw: RawIteration =
            serde_json::from_str(r#"{"id": "b2", "name": "Backlog"}"#).unwrap();
        let iteration = Iteration::from(raw);
        assert!(iteration.time_frame.is_none());
        assert!(iteration.finish_date.is_none());
    }
}
