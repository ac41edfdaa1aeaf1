use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::cache::{CacheStore, MemoryCache, cache_key, read_or_populate};
use crate::commit::{CommitSummary, normalize};
use crate::config::ChangelogConfig;
use crate::error::ChangelogError;
use crate::filter::filter_significant;
use crate::github::{CommitSource, GithubClient};
use crate::signature::{self, SIGNATURE_HEADER};

type Listing = Vec<CommitSummary>;

/// Shared per-server state. Cloning is cheap; the source and the cache
/// slot are shared between clones.
pub struct AppState<S, K> {
    source: Arc<S>,
    cache: Arc<K>,
    repo_path: String,
    repo_url: String,
    webhook_secret: Option<String>,
    cache_ttl: Duration,
    significance_threshold: u64,
}

impl<S, K> Clone for AppState<S, K> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            repo_path: self.repo_path.clone(),
            repo_url: self.repo_url.clone(),
            webhook_secret: self.webhook_secret.clone(),
            cache_ttl: self.cache_ttl,
            significance_threshold: self.significance_threshold,
        }
    }
}

impl<S, K> AppState<S, K>
where
    S: CommitSource,
    K: CacheStore<Listing> + 'static,
{
    pub fn new(config: &ChangelogConfig, source: S, cache: K) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(cache),
            repo_path: config.repo_path.clone(),
            repo_url: config.repo_url(),
            webhook_secret: config.webhook_secret.clone(),
            cache_ttl: config.cache_ttl,
            significance_threshold: config.significance_threshold,
        }
    }

    pub fn cache(&self) -> &K {
        &self.cache
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.repo_path)
    }

    /// Fetches and normalizes the listing, bypassing the cache.
    async fn fetch_listing(&self) -> Result<Listing, ChangelogError> {
        let raw = self.source.list_commits(&self.repo_path).await?;
        let source = self.source.as_ref();
        let repo_path = self.repo_path.as_str();
        Ok(futures::future::join_all(
            raw.into_iter()
                .map(|commit| normalize(commit, repo_path, source)),
        )
        .await)
    }
}

/// Builds the changelog router.
///
/// - `GET  /changelog_data`    cached, filtered listing (always 200)
/// - `POST /changelog_refresh` repopulate the cache now
/// - `POST /changelog_webhook` signed GitHub push hook, drops the cache
/// - `GET  /up`                liveness check
pub fn router<S, K>(state: AppState<S, K>) -> Router
where
    S: CommitSource,
    K: CacheStore<Listing> + 'static,
{
    Router::new()
        .route("/changelog_data", get(handle_list::<S, K>))
        .route("/changelog_refresh", post(handle_refresh::<S, K>))
        .route("/changelog_webhook", post(handle_webhook::<S, K>))
        .route("/up", get(handle_up))
        .with_state(state)
}

/// Starts the changelog HTTP server against GitHub with an in-memory cache.
pub async fn serve(config: ChangelogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let source = GithubClient::from_config(&config)?;
    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN not set, using unauthenticated GitHub rate limits");
    }
    if config.webhook_secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET not set, every webhook will be rejected");
    }

    let state = AppState::new(&config, source, MemoryCache::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(addr = %addr, repo = %config.repo_path, "Changelog server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[instrument(name = "changelog.list", skip_all, fields(repo = tracing::field::Empty))]
async fn handle_list<S, K>(State(state): State<AppState<S, K>>) -> Json<Listing>
where
    S: CommitSource,
    K: CacheStore<Listing> + 'static,
{
    tracing::Span::current().record("repo", state.repo_path.as_str());

    let key = state.cache_key();
    let listing = read_or_populate(state.cache.as_ref(), &key, state.cache_ttl, || {
        state.fetch_listing()
    })
    .await;

    match listing {
        Ok(commits) => Json(filter_significant(commits, state.significance_threshold)),
        Err(e) => {
            error!(error = %e, "Changelog unavailable, serving development placeholder");
            Json(vec![CommitSummary::development_mode(&state.repo_url)])
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub commits: Listing,
    /// RFC 3339 time of the refresh.
    pub timestamp: String,
}

#[instrument(name = "changelog.refresh", skip_all, fields(repo = tracing::field::Empty))]
async fn handle_refresh<S, K>(
    State(state): State<AppState<S, K>>,
) -> Result<Json<RefreshResponse>, ChangelogError>
where
    S: CommitSource,
    K: CacheStore<Listing> + 'static,
{
    tracing::Span::current().record("repo", state.repo_path.as_str());

    let commits = state.fetch_listing().await.inspect_err(|e| {
        error!(error = %e, "Changelog refresh failed");
    })?;

    state
        .cache
        .set(&state.cache_key(), commits.clone(), state.cache_ttl);
    info!(count = commits.len(), "Changelog cache refreshed");

    Ok(Json(RefreshResponse {
        message: "Changelog cache refreshed".to_string(),
        commits: filter_significant(commits, state.significance_threshold),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[instrument(
    name = "changelog.webhook",
    skip_all,
    fields(
        event = tracing::field::Empty,
        delivery = tracing::field::Empty,
    )
)]
async fn handle_webhook<S, K>(
    State(state): State<AppState<S, K>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ChangelogError>
where
    S: CommitSource,
    K: CacheStore<Listing> + 'static,
{
    let sig = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !signature::verify(sig, &body, state.webhook_secret.as_deref()) {
        warn!(has_signature = sig.is_some(), "Rejected changelog webhook");
        return Err(ChangelogError::Verification);
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_owned()
    };
    let span = tracing::Span::current();
    span.record("event", header("x-github-event").as_str());
    span.record("delivery", header("x-github-delivery").as_str());

    let dropped = state.cache.delete(&state.cache_key());
    info!(dropped, "Changelog cache invalidated by webhook");

    Ok(StatusCode::OK)
}

async fn handle_up() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::response::Response;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt as _;

    use super::*;
    use trogon_std::time::MockClock;
    use crate::commit::{DEV_SHA, FILTERED_SHA};
    use crate::github::{RawCommit, RawCommitDetail, RawStats};
    use crate::mocks::MockCommitSource;

    type TestState = AppState<MockCommitSource, MemoryCache<Listing, MockClock>>;

    const SECRET: &str = "hook-secret";
    const TTL: Duration = Duration::from_secs(3600);

    fn config(secret: Option<&str>) -> ChangelogConfig {
        ChangelogConfig {
            github_token: None,
            webhook_secret: secret.map(str::to_owned),
            repo_path: "octo/site".to_string(),
            api_url: "http://unused.invalid".to_string(),
            user_agent: "changelog-tests".to_string(),
            port: 0,
            cache_ttl: TTL,
            significance_threshold: 50,
        }
    }

    fn raw(sha: &str, additions: u64, deletions: u64) -> RawCommit {
        RawCommit {
            sha: Some(format!("{sha}000000000")),
            html_url: Some(format!("https://github.com/octo/site/commit/{sha}")),
            commit: Some(RawCommitDetail {
                author: None,
                message: Some(format!("commit {sha}")),
            }),
            stats: Some(RawStats {
                additions: Some(additions),
                deletions: Some(deletions),
                total: None,
            }),
        }
    }

    fn setup(secret: Option<&str>) -> (TestState, MockCommitSource, MockClock) {
        let source = MockCommitSource::new();
        let clock = MockClock::new();
        let state = AppState::new(
            &config(secret),
            source.clone(),
            MemoryCache::with_clock(clock.clone()),
        );
        (state, source, clock)
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    async fn send(state: &TestState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn get_listing(state: &TestState) -> Listing {
        let response = send(
            state,
            Request::get("/changelog_data").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn webhook(body: &'static str, sig: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/changelog_webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-github-event", "push");
        if let Some(sig) = sig {
            builder = builder.header("x-hub-signature-256", sig);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn listing_filters_insignificant_commits() {
        let (state, source, _clock) = setup(None);
        source.set_commits(vec![
            raw("a", 100, 0),
            raw("b", 10, 10),
            raw("c", 30, 30),
            raw("d", 50, 0),
        ]);

        let listing = get_listing(&state).await;

        let shas: Vec<_> = listing.iter().map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["a000000", "c000000"]);
    }

    #[tokio::test]
    async fn listing_is_served_from_cache_until_ttl() {
        let (state, source, clock) = setup(None);
        source.set_commits(vec![raw("a", 100, 0)]);

        get_listing(&state).await;
        get_listing(&state).await;
        assert_eq!(source.list_calls(), 1);

        clock.advance(TTL);
        get_listing(&state).await;
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_serves_uncached_development_placeholder() {
        let (state, source, _clock) = setup(None);
        source.set_unavailable();

        let listing = get_listing(&state).await;

        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].title, "Development Mode");
        assert_eq!(listing[0].sha, DEV_SHA);
        assert_eq!(listing[0].url, "https://github.com/octo/site");
        assert_eq!(listing[0].stats.total, 0);
        assert!(state.cache().is_empty(), "failures must not be cached");

        source.set_commits(vec![raw("a", 100, 0)]);
        let listing = get_listing(&state).await;
        assert_eq!(listing[0].sha, "a000000");
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn all_small_commits_yield_filtered_placeholder() {
        let (state, source, _clock) = setup(None);
        source.set_commits(vec![raw("a", 1, 1), raw("b", 20, 0), raw("c", 25, 25)]);

        let listing = get_listing(&state).await;

        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].sha, FILTERED_SHA);
    }

    #[tokio::test]
    async fn refresh_bypasses_and_rewrites_cache() {
        let (state, source, _clock) = setup(None);
        source.set_commits(vec![raw("a", 100, 0)]);
        get_listing(&state).await;

        source.set_commits(vec![raw("b", 200, 0)]);
        let response = send(
            &state,
            Request::post("/changelog_refresh").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let refreshed: RefreshResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(refreshed.message, "Changelog cache refreshed");
        assert_eq!(refreshed.commits[0].sha, "b000000");
        assert!(chrono::DateTime::parse_from_rfc3339(&refreshed.timestamp).is_ok());

        let listing = get_listing(&state).await;
        assert_eq!(listing[0].sha, "b000000");
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn refresh_failure_is_reported_as_500() {
        let (state, source, _clock) = setup(None);
        source.set_unavailable();

        let response = send(
            &state,
            Request::post("/changelog_refresh").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("timed out"));
        assert!(state.cache().is_empty());
    }

    #[tokio::test]
    async fn signed_webhook_drops_cache_slot() {
        let (state, source, _clock) = setup(Some(SECRET));
        source.set_commits(vec![raw("a", 100, 0)]);
        get_listing(&state).await;
        assert!(state.cache().get(&state.cache_key()).is_some());

        let body = r#"{"ref":"refs/heads/main"}"#;
        let response = send(&state, webhook(body, Some(sign(body.as_bytes())))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
        assert!(state.cache().get(&state.cache_key()).is_none());

        get_listing(&state).await;
        assert_eq!(source.list_calls(), 2);
    }

    #[tokio::test]
    async fn bad_or_missing_signature_is_rejected_and_cache_kept() {
        let (state, source, _clock) = setup(Some(SECRET));
        source.set_commits(vec![raw("a", 100, 0)]);
        get_listing(&state).await;

        let forged = send(&state, webhook("{}", Some("sha256=deadbeef".to_string()))).await;
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(forged.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());

        let unsigned = send(&state, webhook("{}", None)).await;
        assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);

        assert!(state.cache().get(&state.cache_key()).is_some());
    }

    #[tokio::test]
    async fn webhook_without_configured_secret_fails_closed() {
        let (state, _source, _clock) = setup(None);
        let body = r#"{"ref":"refs/heads/main"}"#;

        let response = send(&state, webhook(body, Some(sign(body.as_bytes())))).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_route_only_accepts_post() {
        let (state, _source, _clock) = setup(Some(SECRET));

        let response = send(
            &state,
            Request::get("/changelog_webhook").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn liveness_check_answers_ok() {
        let (state, _source, _clock) = setup(None);

        let response = send(&state, Request::get("/up").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
