use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::artifacts::ArtifactStore;
use crate::cli::CrawlArgs;
use crate::dispatch::{ConcurrencyLimit, Dispatcher, LevelReport};
use crate::frontier::compute_next_frontier;
use crate::render::HttpRenderer;
use crate::seeds::{SeedList, read_url_list};
use crate::session::CrawlSession;

/// Remaining hop levels. Negative is unlimited, zero stops after the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthBudget(i64);

impl DepthBudget {
    pub fn new(depth: i64) -> Self {
        Self(depth)
    }

    pub fn unlimited() -> Self {
        Self(-1)
    }

    pub fn is_exhausted(self) -> bool {
        self.0 == 0
    }

    /// Positive budgets shrink by one; negative budgets never reach zero.
    pub fn descend(self) -> Self {
        if self.0 > 0 { Self(self.0 - 1) } else { self }
    }
}

impl Default for DepthBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

pub struct Crawler {
    dispatcher: Dispatcher,
    depth: DepthBudget,
}

impl Crawler {
    pub fn new(dispatcher: Dispatcher, depth: DepthBudget) -> Self {
        Self { dispatcher, depth }
    }

    /// Crawls level by level from `seeds` until the frontier is empty or the
    /// depth budget runs out, then hands back the final session.
    pub async fn run(&self, seeds: BTreeSet<String>, mut session: CrawlSession) -> CrawlSession {
        let mut frontier = seeds;
        let mut budget = self.depth;
        let mut level = 0_usize;

        while !frontier.is_empty() {
            tracing::info!(level, depth = budget.0, frontier = frontier.len(), "crawling level");
            let next = self.crawl_level(&frontier, &mut session).await;

            if budget.is_exhausted() {
                tracing::info!(level, pending = next.len(), "depth budget exhausted");
                break;
            }
            budget = budget.descend();
            frontier = next;
            level += 1;
        }

        session
    }

    /// Fetches one frontier and returns the next one.
    ///
    /// Returns only after every fetch of this level has settled.
    pub async fn crawl_level(
        &self,
        frontier: &BTreeSet<String>,
        session: &mut CrawlSession,
    ) -> BTreeSet<String> {
        let pending = frontier
            .iter()
            .filter(|url| !session.is_excluded(url))
            .cloned()
            .collect::<Vec<_>>();

        let report = self.dispatcher.dispatch(pending).await;
        let discovered = absorb_report(session, report);

        let step = compute_next_frontier(frontier, &discovered, session);
        tracing::debug!(
            next = step.next.len(),
            excluded = step.excluded.len(),
            "computed next frontier"
        );
        session.exclude_all(step.excluded);
        step.next
    }
}

/// Folds fetch outcomes into the session and pools every discovered link.
fn absorb_report(session: &mut CrawlSession, report: LevelReport) -> BTreeSet<String> {
    let LevelReport { fetched, failed } = report;
    tracing::info!(fetched = fetched.len(), failed = failed.len(), "level finished");

    let mut discovered = BTreeSet::new();
    for page in fetched {
        for redirect in page.redirects {
            tracing::info!(from = %redirect.from, to = %redirect.to, "detected redirect");
            session.record_redirect(redirect.from, redirect.to);
        }
        discovered.extend(
            page.links
                .iter()
                .map(|link| link.trim())
                .filter(|link| !link.is_empty())
                .map(str::to_owned),
        );
        session.mark_processed(page.url);
    }

    for failure in failed {
        let attempts = session.record_failure(&failure.url);
        tracing::debug!(url = %failure.url, attempts, "recorded fetch failure");
        if session.is_abandoned(&failure.url) {
            tracing::warn!(url = %failure.url, attempts, "giving up on url");
        }
    }

    discovered
}

pub async fn run(args: CrawlArgs) -> anyhow::Result<()> {
    if args.timeout_secs == 0 {
        anyhow::bail!("--timeout-secs must be positive");
    }

    let seeds = SeedList::load(Path::new(&args.seeds)).context("load seeds")?;
    let skip_list = match &args.exclude {
        Some(path) => read_url_list(Path::new(path)).context("load skip list")?,
        None => Vec::new(),
    };
    let store = ArtifactStore::create(&args.out).context("prepare output dir")?;
    let renderer = HttpRenderer::new(Duration::from_secs(args.timeout_secs))?;

    let max_attempts = u32::try_from(args.max_attempts)
        .ok()
        .filter(|max| *max > 0);
    let mut session = CrawlSession::new(seeds.target_domains.clone(), max_attempts);
    session.exclude_all(skip_list);

    tracing::info!(
        seeds = seeds.urls.len(),
        domains = ?seeds.target_domains,
        depth = args.depth,
        limit = args.limit,
        "starting crawl"
    );

    let dispatcher = Dispatcher::new(
        Arc::new(renderer),
        store.clone(),
        ConcurrencyLimit::from_arg(args.limit),
    );
    let crawler = Crawler::new(dispatcher, DepthBudget::new(args.depth));
    let session = crawler.run(seeds.urls, session).await;

    store
        .write_summaries(&session)
        .context("write summary files")?;

    tracing::info!(
        processed = session.processed().len(),
        excluded = session.excluded().len(),
        redirected = session.redirects().len(),
        failed = session.failed().count(),
        "crawl finished"
    );

    Ok(())
}
