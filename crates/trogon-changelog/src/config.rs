use std::time::Duration;

use trogon_std::env::ReadEnv;
use crate::filter::DEFAULT_SIGNIFICANCE_THRESHOLD;
use crate::github::DEFAULT_API_URL;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REPO: &str = "carolinekks/carolinekks.dk";
const DEFAULT_USER_AGENT: &str = "trogon-changelog";
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60; // 1 hour

/// Configuration for the changelog server.
///
/// Resolved from environment variables:
/// - `GITHUB_TOKEN`: bearer token for authenticated, higher rate-limit calls (optional)
/// - `GITHUB_WEBHOOK_SECRET`: HMAC-SHA256 secret shared with GitHub; without it every webhook is rejected
/// - `CHANGELOG_REPO`: tracked repository as `owner/repo` (default: `carolinekks/carolinekks.dk`)
/// - `GITHUB_API_URL`: REST API base URL (default: `https://api.github.com`)
/// - `CHANGELOG_USER_AGENT`: `User-Agent` sent upstream (default: `trogon-changelog`)
/// - `CHANGELOG_PORT`: HTTP listening port (default: 8080)
/// - `CHANGELOG_CACHE_TTL_SECS`: lifetime of the cached listing in seconds (default: 3600)
/// - `CHANGELOG_SIGNIFICANCE_THRESHOLD`: commits must change more lines than this (default: 50)
#[derive(Debug, Clone)]
pub struct ChangelogConfig {
    pub github_token: Option<String>,
    pub webhook_secret: Option<String>,
    pub repo_path: String,
    pub api_url: String,
    pub user_agent: String,
    pub port: u16,
    pub cache_ttl: Duration,
    pub significance_threshold: u64,
}

impl ChangelogConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            github_token: env.non_empty("GITHUB_TOKEN"),
            webhook_secret: env.non_empty("GITHUB_WEBHOOK_SECRET"),
            repo_path: env
                .non_empty("CHANGELOG_REPO")
                .map(|r| r.trim().trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_REPO.to_string()),
            api_url: env
                .non_empty("GITHUB_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_agent: env
                .non_empty("CHANGELOG_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            port: env.parsed("CHANGELOG_PORT").unwrap_or(DEFAULT_PORT),
            cache_ttl: Duration::from_secs(
                env.parsed("CHANGELOG_CACHE_TTL_SECS")
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            significance_threshold: env
                .parsed("CHANGELOG_SIGNIFICANCE_THRESHOLD")
                .unwrap_or(DEFAULT_SIGNIFICANCE_THRESHOLD),
        }
    }

    /// Public web page of the tracked repository.
    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}", self.repo_path)
    }
}
