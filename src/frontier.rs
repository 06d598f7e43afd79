use std::collections::BTreeSet;

use crate::classify::is_in_domain;
use crate::session::CrawlSession;

/// Outcome of one frontier computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierStep {
    /// In-domain URLs still to fetch.
    pub next: BTreeSet<String>,
    /// Candidates outside the target domains; to be added to the excluded set.
    pub excluded: BTreeSet<String>,
}

/// Computes `(current ∪ discovered) − processed − excluded`, then splits the
/// candidates by domain membership.
///
/// Links are identified by their trimmed text; blank links are dropped.
/// Abandoned URLs are settled the same way processed ones are.
pub fn compute_next_frontier(
    current: &BTreeSet<String>,
    discovered: &BTreeSet<String>,
    session: &CrawlSession,
) -> FrontierStep {
    let mut step = FrontierStep::default();

    for url in current.iter().chain(discovered) {
        let url = url.trim();
        if url.is_empty()
            || session.is_processed(url)
            || session.is_excluded(url)
            || session.is_abandoned(url)
        {
            continue;
        }

        if is_in_domain(url, session.target_domains()) {
            step.next.insert(url.to_owned());
        } else {
            step.excluded.insert(url.to_owned());
        }
    }

    step
}
