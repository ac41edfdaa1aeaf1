//! In-memory [`CommitSource`] for unit tests without a GitHub server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::commit::CommitStats;
use crate::error::ChangelogError;
use crate::github::{CommitSource, RawCommit};

/// Serves a fixed commit list and per-hash stats, counting every call.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the server.
#[derive(Clone, Default)]
pub struct MockCommitSource {
    /// `None` makes the listing fail with a transport error.
    commits: Arc<Mutex<Option<Vec<RawCommit>>>>,
    stats: Arc<Mutex<HashMap<String, CommitStats>>>,
    list_calls: Arc<AtomicUsize>,
    stats_calls: Arc<AtomicUsize>,
}

impl MockCommitSource {
    /// Starts with an empty, successful listing.
    pub fn new() -> Self {
        let source = Self::default();
        source.set_commits(Vec::new());
        source
    }

    pub fn with_stats(self, sha: &str, stats: CommitStats) -> Self {
        self.stats.lock().unwrap().insert(sha.to_string(), stats);
        self
    }

    pub fn set_commits(&self, commits: Vec<RawCommit>) {
        *self.commits.lock().unwrap() = Some(commits);
    }

    pub fn set_unavailable(&self) {
        *self.commits.lock().unwrap() = None;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }
}

impl CommitSource for MockCommitSource {
    async fn list_commits(&self, _repo_path: &str) -> Result<Vec<RawCommit>, ChangelogError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.commits
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChangelogError::Transport("operation timed out".to_string()))
    }

    async fn commit_stats(&self, sha: &str, _repo_path: &str) -> CommitStats {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.stats
            .lock()
            .unwrap()
            .get(sha)
            .copied()
            .unwrap_or_default()
    }
}
