use std::time::Duration;

use chrono::DateTime;
use log::debug;
use reqwest::header::LOCATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use url::Url;

use crate::auth::Credentials;
use crate::error::{JenkinsError, Result};
use crate::registry::Environment;

use super::api::JenkinsApi;
use super::links::{build_url, job_url, queue_id_from_location, queue_item_url};
use super::types::{
    BuildState, BuildStatus, BuildSummary, JobReference, JobSummary, LogChunk, QueueState,
};

const TEXT_SIZE_HEADER: &str = "X-Text-Size";
const MORE_DATA_HEADER: &str = "X-More-Data";

/// CSRF protection token required on POST requests by default Jenkins setups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Crumb {
    crumb: String,
    crumb_request_field: String,
}

/// HTTP client bound to one Jenkins environment.
pub struct JenkinsClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    crumb: OnceCell<Option<Crumb>>,
}

impl JenkinsClient {
    pub fn new(environment: &Environment, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jj/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| JenkinsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: environment.url.clone(),
            credentials: environment.credentials.clone(),
            crumb: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(
            &self.credentials.username,
            Some(self.credentials.token.as_str()),
        )
    }

    /// Sends a request and turns non-2xx statuses into typed errors.
    async fn send(&self, url: Url, request: RequestBuilder) -> Result<Response> {
        let response = self
            .auth_request(request)
            .send()
            .await
            .map_err(|e| JenkinsError::Unreachable(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        debug!("Jenkins answered {status} for {url}");
        Err(status_error(status, &url))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(url.clone(), self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn post(&self, url: Url) -> Result<Response> {
        let mut request = self.client.post(url.clone());
        if let Some(crumb) = self.crumb().await? {
            request = request.header(crumb.crumb_request_field.as_str(), crumb.crumb.as_str());
        }
        self.send(url, request).await
    }

    async fn crumb(&self) -> Result<Option<&Crumb>> {
        let crumb = self
            .crumb
            .get_or_try_init(|| async {
                let url = self.api_url(&self.base_url, "crumbIssuer/", None)?;
                match self.get_json::<Crumb>(url).await {
                    Ok(crumb) => Ok(Some(crumb)),
                    // CSRF protection is disabled on this instance
                    Err(JenkinsError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        Ok(crumb.as_ref())
    }

    /// `<base><path>api/json`, optionally restricted with a `tree` filter.
    fn api_url(&self, base: &Url, path: &str, tree: Option<&str>) -> Result<Url> {
        let mut url = base
            .join(path)
            .and_then(|u| u.join("api/json"))
            .map_err(|e| JenkinsError::Config(format!("Invalid API URL: {e}")))?;
        if let Some(tree) = tree {
            url.set_query(Some(&format!("tree={tree}")));
        }
        Ok(url)
    }
}

fn status_error(status: StatusCode, url: &Url) -> JenkinsError {
    let url = url.to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => JenkinsError::Unauthorized { url },
        StatusCode::NOT_FOUND => JenkinsError::NotFound { url },
        s if s.is_server_error() => JenkinsError::ServerError {
            status: s.as_u16(),
            url,
        },
        s => JenkinsError::Unexpected {
            status: s.as_u16(),
            url,
        },
    }
}

#[derive(Deserialize)]
struct QueueItemResponse {
    #[serde(default)]
    cancelled: bool,
    executable: Option<Executable>,
    why: Option<String>,
}

#[derive(Deserialize)]
struct Executable {
    number: u64,
}

#[derive(Deserialize)]
struct BuildResponse {
    number: Option<u64>,
    #[serde(default)]
    building: bool,
    result: Option<String>,
    timestamp: Option<i64>,
    duration: Option<u64>,
}

impl BuildResponse {
    fn status(&self) -> BuildStatus {
        let state = BuildState::from_jenkins(self.building, self.result.as_deref());
        BuildStatus {
            state,
            started_at: self.timestamp.and_then(DateTime::from_timestamp_millis),
            // Jenkins reports 0 until the build completes
            duration: self
                .duration
                .filter(|_| state.is_terminal())
                .map(Duration::from_millis),
        }
    }
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<JobEntry>,
}

#[derive(Deserialize)]
struct JobEntry {
    name: String,
    color: Option<String>,
}

#[derive(Deserialize)]
struct BuildsResponse {
    #[serde(default)]
    builds: Vec<BuildResponse>,
}

impl JenkinsApi for JenkinsClient {
    async fn trigger(&self, job: &JobReference) -> Result<u64> {
        let endpoint = if job.parameters.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let mut url = job_url(&self.base_url, &job.job)
            .join(endpoint)
            .map_err(|e| JenkinsError::Config(format!("Invalid trigger URL: {e}")))?;
        if !job.parameters.is_empty() {
            url.query_pairs_mut().extend_pairs(&job.parameters);
        }

        let response = self.post(url.clone()).await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                JenkinsError::InvalidResponse(format!("{url} returned no queue location"))
            })?;

        queue_id_from_location(location).ok_or_else(|| {
            JenkinsError::InvalidResponse(format!("Unrecognised queue location: {location}"))
        })
    }

    async fn queue_item(&self, id: u64) -> Result<QueueState> {
        let url = self.api_url(&queue_item_url(&self.base_url, id), "", None)?;
        let item: QueueItemResponse = self.get_json(url).await?;

        Ok(match item {
            QueueItemResponse {
                executable: Some(executable),
                ..
            } => QueueState::Assigned {
                number: executable.number,
            },
            QueueItemResponse {
                cancelled: true, ..
            } => QueueState::Cancelled,
            QueueItemResponse { why, .. } => QueueState::Waiting { why },
        })
    }

    async fn build_status(&self, job: &str, number: u64) -> Result<BuildStatus> {
        let url = self.api_url(
            &build_url(&self.base_url, job, number),
            "",
            Some("number,building,result,timestamp,duration"),
        )?;
        let build: BuildResponse = self.get_json(url).await?;
        Ok(build.status())
    }

    async fn console_chunk(&self, job: &str, number: u64, offset: u64) -> Result<LogChunk> {
        let mut url = build_url(&self.base_url, job, number)
            .join("logText/progressiveText")
            .map_err(|e| JenkinsError::Config(format!("Invalid log URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("start", &offset.to_string());

        let response = self.send(url.clone(), self.client.get(url)).await?;
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let text_size = header(TEXT_SIZE_HEADER).and_then(|size| size.parse::<u64>().ok());
        let more_data = header(MORE_DATA_HEADER).is_some_and(|more| more == "true");

        let data = response.bytes().await?.to_vec();
        let next_offset = text_size.unwrap_or(offset + data.len() as u64);

        Ok(LogChunk {
            data,
            next_offset,
            more_data,
        })
    }

    async fn stop_build(&self, job: &str, number: u64) -> Result<()> {
        let url = build_url(&self.base_url, job, number)
            .join("stop")
            .map_err(|e| JenkinsError::Config(format!("Invalid stop URL: {e}")))?;
        self.post(url).await?;
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let url = self.api_url(&self.base_url, "", Some("jobs[name,color]"))?;
        let response: JobsResponse = self.get_json(url).await?;

        Ok(response
            .jobs
            .into_iter()
            .map(|job| JobSummary {
                name: job.name,
                color: job.color,
            })
            .collect())
    }

    async fn list_builds(&self, job: &str, limit: usize) -> Result<Vec<BuildSummary>> {
        let tree = format!("builds[number,building,result,timestamp,duration]{{0,{limit}}}");
        let url = self.api_url(&job_url(&self.base_url, job), "", Some(&tree))?;
        let response: BuildsResponse = self.get_json(url).await?;

        Ok(response
            .builds
            .into_iter()
            .filter_map(|build| {
                let status = build.status();
                build.number.map(|number| BuildSummary {
                    number,
                    state: status.state,
                    started_at: status.started_at,
                    duration: status.duration,
                })
            })
            .take(limit)
            .collect())
    }
}
