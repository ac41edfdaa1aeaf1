use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures that can occur while producing or guarding the changelog.
#[derive(Debug)]
pub enum ChangelogError {
    /// DNS, TLS, connect or timeout failure talking to GitHub.
    Transport(String),
    /// GitHub answered with a non-2xx status.
    UpstreamStatus { status: u16, body: String },
    /// The GitHub payload could not be decoded.
    Parse(String),
    /// Webhook signature missing, malformed, or not matching the secret.
    Verification,
}

impl std::fmt::Display for ChangelogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "GitHub request failed: {msg}"),
            Self::UpstreamStatus { status, body } => {
                write!(f, "GitHub API returned status {status}: {body}")
            }
            Self::Parse(msg) => write!(f, "Failed to parse GitHub response: {msg}"),
            Self::Verification => write!(f, "Webhook signature verification failed"),
        }
    }
}

impl std::error::Error for ChangelogError {}

impl From<reqwest::Error> for ChangelogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl IntoResponse for ChangelogError {
    fn into_response(self) -> Response {
        match self {
            // No detail leaks to an unauthenticated caller.
            Self::Verification => StatusCode::UNAUTHORIZED.into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response(),
        }
    }
}
