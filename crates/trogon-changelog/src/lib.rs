//! # trogon-changelog
//!
//! Serves a cached, filtered JSON view of one GitHub repository's recent
//! commits, and drops the cache when GitHub reports a push.
//!
//! ## How it works
//!
//! 1. `GET /changelog_data` reads the cache slot `changelog:v1:{owner/repo}`.
//!    On a miss it lists the first 10 commits from the GitHub REST API,
//!    enriches commits that report no changed lines with per-commit stats,
//!    normalizes each record and caches the result for the TTL.
//! 2. Commits changing 50 lines or fewer are filtered out; if none remain a
//!    single "No significant changes" entry is served.
//! 3. When GitHub cannot be reached the listing still answers 200 with a single
//!    "Development Mode" entry, which is not cached.
//! 4. `POST /changelog_webhook` validates `X-Hub-Signature-256` against
//!    `GITHUB_WEBHOOK_SECRET` and deletes the cache slot. Invalid or unsigned
//!    requests get an empty 401.
//! 5. `POST /changelog_refresh` repopulates the cache immediately and reports
//!    upstream failures as 500.
//!
//! ## Configuration (env vars)
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GITHUB_TOKEN` | unset | Bearer token for authenticated API calls |
//! | `GITHUB_WEBHOOK_SECRET` | unset | HMAC-SHA256 secret (unset rejects every webhook) |
//! | `CHANGELOG_REPO` | `carolinekks/carolinekks.dk` | Tracked `owner/repo` |
//! | `GITHUB_API_URL` | `https://api.github.com` | REST API base URL |
//! | `CHANGELOG_USER_AGENT` | `trogon-changelog` | Outbound `User-Agent` |
//! | `CHANGELOG_PORT` | `8080` | HTTP listening port |
//! | `CHANGELOG_CACHE_TTL_SECS` | `3600` | Cache lifetime in seconds |
//! | `CHANGELOG_SIGNIFICANCE_THRESHOLD` | `50` | Minimum changed lines, exclusive |

pub mod cache;
pub mod commit;
pub mod config;
pub mod error;
pub mod filter;
pub mod github;
#[cfg(test)]
mod mocks;
pub mod server;
pub mod signature;

pub use cache::{CacheStore, MemoryCache};
pub use commit::{CommitStats, CommitSummary};
pub use config::ChangelogConfig;
pub use error::ChangelogError;
pub use github::{CommitSource, GithubClient};
pub use server::{AppState, router, serve};
