//! Modrinth v2 API client.
//!
//! The only place raw registry payloads exist. Both endpoint families are
//! normalized here: `/search` hits rename `project_id` to `id` and use
//! `versions` for *game* versions, while `/project` uses `id` and
//! `game_versions`. Past this module everything is a [`ProjectInfo`] or a
//! [`VersionCandidate`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use super::types::{ProjectId, ProjectInfo, VersionCandidate, VersionId};
use crate::retry::{check_retryable, with_retry};

const DEFAULT_API_URL: &str = "https://api.modrinth.com/v2";

const USER_AGENT: &str = concat!(
    "modshelf/",
    env!("MODSHELF_VERSION"),
    " (github.com/chaifeng/modshelf)"
);

/// Query interface to the remote mod registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetches project metadata. Fails with `NotFound` on an unknown id.
    async fn get_project_info(&self, project_id: &ProjectId) -> Result<ProjectInfo>;

    /// Fetches published versions for a project, filtered server-side by
    /// loader set and game version. The filtering is a hint; callers
    /// re-verify constraints where ordering depends on them.
    async fn get_project_versions(
        &self,
        project_id: &ProjectId,
        loaders: &[String],
        game_version: &str,
    ) -> Result<Vec<VersionCandidate>>;

    /// Fetches several projects in one request. Response order is not
    /// guaranteed to match the input; index by id for correspondence.
    async fn get_multiple_projects(&self, projects: &[ProjectId]) -> Result<Vec<ProjectInfo>>;

    /// Fetches a single version by id. Fails with `NotFound` on an unknown id.
    async fn get_version(&self, version_id: &VersionId) -> Result<VersionCandidate>;

    /// Fetches several versions in one request.
    async fn get_multiple_versions(&self, versions: &[VersionId]) -> Result<Vec<VersionCandidate>>;

    /// Full-text project search with facet filters.
    async fn search_projects(
        &self,
        query: &str,
        facets: &[Vec<String>],
        limit: u32,
    ) -> Result<Vec<ProjectInfo>>;

    /// Downloads a file by URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct ModrinthClient {
    client: Client,
    api_url: String,
}

impl ModrinthClient {
    #[tracing::instrument(skip(api_url))]
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {} with query {:?}", url, query);

        with_retry("Registry request", || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .query(query)
                    .send()
                    .await
                    .context("Failed to send request to registry")?;

                let response = response.error_for_status().map_err(check_retryable)?;

                response
                    .json::<T>()
                    .await
                    .context("Failed to parse JSON response from registry")
            }
        })
        .await
    }
}

/// Project information as `/search` returns it. `versions` here means the
/// *game* versions the project supports.
#[derive(Deserialize)]
struct RawSearchHit {
    project_id: ProjectId,
    slug: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    versions: Vec<String>,
}

impl From<RawSearchHit> for ProjectInfo {
    fn from(hit: RawSearchHit) -> Self {
        ProjectInfo {
            id: hit.project_id,
            slug: hit.slug,
            title: hit.title,
            description: hit.description,
            game_versions: hit.versions,
        }
    }
}

#[derive(Deserialize)]
struct RawSearchResults {
    hits: Vec<RawSearchHit>,
}

#[async_trait]
impl Registry for ModrinthClient {
    #[tracing::instrument(skip(self))]
    async fn get_project_info(&self, project_id: &ProjectId) -> Result<ProjectInfo> {
        self.get_json(&format!("/project/{}", project_id), &[])
            .await
            .with_context(|| format!("Failed to fetch project {}", project_id))
    }

    #[tracing::instrument(skip(self, loaders))]
    async fn get_project_versions(
        &self,
        project_id: &ProjectId,
        loaders: &[String],
        game_version: &str,
    ) -> Result<Vec<VersionCandidate>> {
        // The registry expects JSON arrays inside query string values.
        let mut query: Vec<(&str, String)> = Vec::new();
        if !loaders.is_empty() {
            query.push(("loaders", serde_json::to_string(loaders)?));
        }
        query.push(("game_versions", serde_json::to_string(&[game_version])?));

        self.get_json(&format!("/project/{}/version", project_id), &query)
            .await
            .with_context(|| format!("Failed to fetch versions of project {}", project_id))
    }

    #[tracing::instrument(skip(self, projects))]
    async fn get_multiple_projects(&self, projects: &[ProjectId]) -> Result<Vec<ProjectInfo>> {
        if projects.is_empty() {
            return Ok(vec![]);
        }

        let ids = serde_json::to_string(projects)?;
        self.get_json("/projects", &[("ids", ids)])
            .await
            .context("Failed to fetch project batch")
    }

    #[tracing::instrument(skip(self))]
    async fn get_version(&self, version_id: &VersionId) -> Result<VersionCandidate> {
        self.get_json(&format!("/version/{}", version_id), &[])
            .await
            .with_context(|| format!("Failed to fetch version {}", version_id))
    }

    #[tracing::instrument(skip(self, versions))]
    async fn get_multiple_versions(&self, versions: &[VersionId]) -> Result<Vec<VersionCandidate>> {
        if versions.is_empty() {
            return Ok(vec![]);
        }

        let ids = serde_json::to_string(versions)?;
        self.get_json("/versions", &[("ids", ids)])
            .await
            .context("Failed to fetch version batch")
    }

    #[tracing::instrument(skip(self, facets))]
    async fn search_projects(
        &self,
        query: &str,
        facets: &[Vec<String>],
        limit: u32,
    ) -> Result<Vec<ProjectInfo>> {
        let results: RawSearchResults = self
            .get_json(
                "/search",
                &[
                    ("query", query.to_string()),
                    ("facets", serde_json::to_string(facets)?),
                    ("limit", limit.to_string()),
                ],
            )
            .await
            .context("Search request failed")?;

        Ok(results.hits.into_iter().map(ProjectInfo::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        with_retry("Downloading file", || {
            let client = self.client.clone();
            let url = url.to_string();
            async move {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .context("Failed to start download")?;

                let response = response.error_for_status().map_err(check_retryable)?;

                let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.context("Download stream interrupted")?;
                    buf.extend_from_slice(&chunk);
                }

                Ok(buf)
            }
        })
        .await
    }
}
