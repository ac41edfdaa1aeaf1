//! GitHub REST client for the commit listing and per-commit diff stats.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::commit::CommitStats;
use crate::config::ChangelogConfig;
use crate::error::ChangelogError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";
const COMMITS_PER_PAGE: u8 = 10;

/// The listing is required, so it gets the longer budget.
const LIST_TIMEOUT: Duration = Duration::from_secs(10);
/// Stats enrichment is best-effort.
const STATS_TIMEOUT: Duration = Duration::from_secs(5);

// ── Upstream payloads ─────────────────────────────────────────────────────────

/// One element of `GET /repos/{owner}/{repo}/commits`.
///
/// Every field is optional and read leniently: a field of the wrong type
/// is treated as absent, so the normalizer supplies its fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommit {
    #[serde(default, deserialize_with = "lenient")]
    pub sha: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub commit: Option<RawCommitDetail>,
    #[serde(default, deserialize_with = "lenient")]
    pub stats: Option<RawStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommitDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<RawAuthor>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawStats {
    #[serde(default, deserialize_with = "lenient")]
    pub additions: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub deletions: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u64>,
}

impl RawStats {
    pub fn resolve(&self) -> CommitStats {
        let additions = self.additions.unwrap_or(0);
        let deletions = self.deletions.unwrap_or(0);
        CommitStats {
            additions,
            deletions,
            total: self
                .total
                .unwrap_or_else(|| additions.saturating_add(deletions)),
        }
    }
}

/// `GET /repos/{owner}/{repo}/commits/{sha}`; only the stats matter here.
#[derive(Debug, Default, Deserialize)]
struct CommitDetailResponse {
    #[serde(default, deserialize_with = "lenient")]
    stats: Option<RawStats>,
}

/// Reads any JSON value, keeping it only if it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decodes the listing body element by element.
///
/// The body must be a JSON array; an element that is not a commit object
/// becomes an empty record instead of failing the listing.
fn parse_listing(bytes: &[u8]) -> Result<Vec<RawCommit>, ChangelogError> {
    let elements: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| ChangelogError::Parse(e.to_string()))?;

    Ok(elements
        .into_iter()
        .map(|element| {
            serde_json::from_value(element).unwrap_or_else(|e| {
                warn!(error = %e, "Skipping fields of malformed commit record");
                RawCommit::default()
            })
        })
        .collect())
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Where commits come from.
///
/// Two operations: the required listing and the best-effort stats lookup.
/// Implement this to replace GitHub in tests.
pub trait CommitSource: Send + Sync + 'static {
    fn list_commits(
        &self,
        repo_path: &str,
    ) -> impl Future<Output = Result<Vec<RawCommit>, ChangelogError>> + Send;

    /// Never fails; unavailable stats come back zeroed.
    fn commit_stats(&self, sha: &str, repo_path: &str) -> impl Future<Output = CommitStats> + Send;
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct GithubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    list_timeout: Duration,
    stats_timeout: Duration,
}

impl GithubClient {
    pub fn new(
        api_url: impl Into<String>,
        user_agent: &str,
        token: Option<String>,
    ) -> Result<Self, ChangelogError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_JSON));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| ChangelogError::Transport(format!("invalid user agent: {e}")))?,
        );

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            list_timeout: LIST_TIMEOUT,
            stats_timeout: STATS_TIMEOUT,
        })
    }

    pub fn from_config(config: &ChangelogConfig) -> Result<Self, ChangelogError> {
        Self::new(
            config.api_url.clone(),
            &config.user_agent,
            config.github_token.clone(),
        )
    }

    /// Overrides the per-call read timeouts (listing, stats).
    pub fn with_timeouts(mut self, list: Duration, stats: Duration) -> Self {
        self.list_timeout = list;
        self.stats_timeout = stats;
        self
    }

    fn get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        let request = self.http.get(url).timeout(timeout);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Lists the first page of commits. No retry on failure.
    #[instrument(name = "github.list_commits", skip(self))]
    pub async fn fetch_recent_commits(
        &self,
        repo_path: &str,
    ) -> Result<Vec<RawCommit>, ChangelogError> {
        let url = format!(
            "{}/repos/{}/commits?per_page={}",
            self.api_url, repo_path, COMMITS_PER_PAGE
        );
        info!(url = %url, "Fetching commits from GitHub");

        let response = self.get(&url, self.list_timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "GitHub rejected commit listing");
            return Err(ChangelogError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let commits = parse_listing(&bytes)?;

        info!(count = commits.len(), "Parsed commits");
        Ok(commits)
    }

    /// Fetches diff stats for one commit, degrading to zero on any failure.
    pub async fn fetch_commit_stats(&self, sha: &str, repo_path: &str) -> CommitStats {
        match self.try_fetch_commit_stats(sha, repo_path).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(sha, error = %e, "Could not fetch stats for commit");
                CommitStats::default()
            }
        }
    }

    async fn try_fetch_commit_stats(
        &self,
        sha: &str,
        repo_path: &str,
    ) -> Result<CommitStats, ChangelogError> {
        let url = format!("{}/repos/{}/commits/{}", self.api_url, repo_path, sha);

        let response = self.get(&url, self.stats_timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChangelogError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let detail: CommitDetailResponse =
            serde_json::from_slice(&bytes).map_err(|e| ChangelogError::Parse(e.to_string()))?;

        let stats = detail.stats.unwrap_or_default().resolve();
        debug!(sha, total = stats.total, "Fetched commit stats");
        Ok(stats)
    }
}

impl CommitSource for GithubClient {
    async fn list_commits(&self, repo_path: &str) -> Result<Vec<RawCommit>, ChangelogError> {
        self.fetch_recent_commits(repo_path).await
    }

    async fn commit_stats(&self, sha: &str, repo_path: &str) -> CommitStats {
        self.fetch_commit_stats(sha, repo_path).await
    }
}
