//! Normalized commit records served to the changelog page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::{CommitSource, RawCommit};

const SHORT_SHA_LEN: usize = 7;
const UNKNOWN_SHA: &str = "unknown";
const NO_MESSAGE: &str = "No message";
const NO_TITLE: &str = "No title";
const MISSING_URL: &str = "#";

/// Sentinel hash of the placeholder served when upstream is unavailable.
pub const DEV_SHA: &str = "dev";
/// Sentinel hash of the placeholder served when every commit was filtered out.
pub const FILTERED_SHA: &str = "filtered";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

impl CommitStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
            total: additions.saturating_add(deletions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Author date as `YYYY-MM-DD`.
    pub date: String,
    pub title: String,
    pub details: Vec<String>,
    pub sha: String,
    pub url: String,
    pub stats: CommitStats,
}

impl CommitSummary {
    fn placeholder(title: &str, details: Vec<String>, sha: &str, url: String) -> Self {
        Self {
            date: today(),
            title: title.to_string(),
            details,
            sha: sha.to_string(),
            url,
            stats: CommitStats::default(),
        }
    }

    /// Served in place of the listing whenever producing it failed.
    pub fn development_mode(repo_url: &str) -> Self {
        Self::placeholder(
            "Development Mode",
            vec!["GitHub API integration in progress".to_string()],
            DEV_SHA,
            repo_url.to_string(),
        )
    }

    /// Served when no commit cleared the significance threshold.
    pub fn no_significant_changes(threshold: u64) -> Self {
        Self::placeholder(
            "No significant changes",
            vec![format!(
                "Recent commits each changed {threshold} lines or fewer."
            )],
            FILTERED_SHA,
            MISSING_URL.to_string(),
        )
    }
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Maps one upstream record into a [`CommitSummary`].
///
/// Never fails: each missing or malformed field gets a fixed fallback. When
/// the listing reports no added and no deleted lines, the stats are looked
/// up through `source` (which itself degrades to zero).
pub async fn normalize<S: CommitSource>(
    raw: RawCommit,
    repo_path: &str,
    source: &S,
) -> CommitSummary {
    let detail = raw.commit.unwrap_or_default();
    let author = detail.author.unwrap_or_default();
    let message = detail.message.unwrap_or_else(|| NO_MESSAGE.to_string());
    let sha = raw.sha.filter(|s| !s.trim().is_empty());

    let mut stats = raw.stats.unwrap_or_default().resolve();
    if stats.additions == 0 && stats.deletions == 0 {
        if let Some(sha) = sha.as_deref() {
            stats = source.commit_stats(sha, repo_path).await;
        }
    }

    let (title, details) = split_message(&message);

    CommitSummary {
        date: format_date(author.date.as_deref()),
        title,
        details,
        sha: sha
            .map(|s| s.chars().take(SHORT_SHA_LEN).collect())
            .unwrap_or_else(|| UNKNOWN_SHA.to_string()),
        url: raw
            .html_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| MISSING_URL.to_string()),
        stats,
    }
}

fn format_date(raw: Option<&str>) -> String {
    raw.and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(today)
}

/// First line is the title; the remaining non-blank lines, in order, are details.
fn split_message(message: &str) -> (String, Vec<String>) {
    let mut lines = message.lines();
    let title = lines
        .next()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or(NO_TITLE)
        .to_string();
    let details = lines
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    (title, details)
}
