use crate::commit::CommitSummary;

/// A commit must change more lines than this to be listed.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: u64 = 50;

/// Keeps commits whose `stats.total` is strictly greater than `threshold`.
///
/// Never returns an empty list: when nothing qualifies, a single
/// "no significant changes" placeholder is returned instead.
pub fn filter_significant(commits: Vec<CommitSummary>, threshold: u64) -> Vec<CommitSummary> {
    let significant: Vec<_> = commits
        .into_iter()
        .filter(|c| c.stats.total > threshold)
        .collect();

    if significant.is_empty() {
        vec![CommitSummary::no_significant_changes(threshold)]
    } else {
        significant
    }
}
