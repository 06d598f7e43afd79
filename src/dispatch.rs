use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use rand::seq::SliceRandom as _;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::artifacts::ArtifactStore;
use crate::render::{Redirect, RenderedPage, Renderer};

/// Cap on simultaneous fetches. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConcurrencyLimit(Option<usize>);

impl ConcurrencyLimit {
    pub fn unbounded() -> Self {
        Self(None)
    }

    /// Non-positive values mean unbounded; larger values are capped at what a
    /// semaphore can hold.
    pub fn from_arg(limit: i64) -> Self {
        Self(
            usize::try_from(limit)
                .ok()
                .filter(|limit| *limit > 0)
                .map(|limit| limit.min(Semaphore::MAX_PERMITS)),
        )
    }

    pub fn permits(self) -> Option<usize> {
        self.0
    }
}

/// A page that was rendered and whose artifacts were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub links: Vec<String>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub error: anyhow::Error,
}

/// Per-URL outcomes of one dispatched batch, in completion order.
#[derive(Debug, Default)]
pub struct LevelReport {
    pub fetched: Vec<FetchedPage>,
    pub failed: Vec<FetchFailure>,
}

/// Renders a batch of URLs with bounded concurrency, isolating failures per URL.
#[derive(Clone)]
pub struct Dispatcher {
    renderer: Arc<dyn Renderer>,
    store: ArtifactStore,
    limit: ConcurrencyLimit,
}

impl Dispatcher {
    pub fn new(renderer: Arc<dyn Renderer>, store: ArtifactStore, limit: ConcurrencyLimit) -> Self {
        Self {
            renderer,
            store,
            limit,
        }
    }

    /// Fetches every URL once and waits for all of them to settle.
    ///
    /// Dispatch order is shuffled. A failing or panicking fetch is reported in
    /// [`LevelReport::failed`] and never affects its siblings.
    pub async fn dispatch<I>(&self, urls: I) -> LevelReport
    where
        I: IntoIterator<Item = String>,
    {
        let mut urls: Vec<String> = urls.into_iter().collect();
        urls.shuffle(&mut rand::rng());

        let semaphore = self
            .limit
            .permits()
            .map(|permits| Arc::new(Semaphore::new(permits)));

        let mut tasks = JoinSet::new();
        let mut task_urls = HashMap::new();
        for url in urls {
            let renderer = Arc::clone(&self.renderer);
            let store = self.store.clone();
            let semaphore = semaphore.clone();
            let task_url = url.clone();
            let handle = tasks.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .expect("dispatch semaphore is closed"),
                    ),
                    None => None,
                };
                let result = fetch_page(renderer.as_ref(), &store, &task_url).await;
                (task_url, result)
            });
            task_urls.insert(handle.id(), url);
        }

        let mut report = LevelReport::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (url, Ok(page)))) => report.fetched.push(page_for(url, page)),
                Ok((_, (url, Err(error)))) => {
                    tracing::warn!(%url, ?error, "fetch failed");
                    report.failed.push(FetchFailure { url, error });
                }
                Err(join_err) => {
                    let url = task_urls.remove(&join_err.id()).unwrap_or_default();
                    tracing::error!(%url, ?join_err, "fetch task aborted");
                    report.failed.push(FetchFailure {
                        url,
                        error: anyhow::anyhow!("fetch task aborted: {join_err}"),
                    });
                }
            }
        }

        report
    }
}

fn page_for(url: String, page: RenderedPage) -> FetchedPage {
    FetchedPage {
        url,
        links: page.links,
        redirects: page.redirects,
    }
}

async fn fetch_page(
    renderer: &dyn Renderer,
    store: &ArtifactStore,
    url: &str,
) -> anyhow::Result<RenderedPage> {
    let page = renderer
        .render(url)
        .await
        .with_context(|| format!("render {url}"))?;
    store
        .write_page(url, &page)
        .await
        .with_context(|| format!("write artifacts for {url}"))?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::render::stub::StubRenderer;

    fn urls(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("https://example.com/{i}"))
            .collect()
    }

    fn site(count: usize) -> StubRenderer {
        urls(count)
            .iter()
            .fold(StubRenderer::new(), |stub, url| stub.page(url, &[]))
            .with_delay(Duration::from_millis(20))
    }

    #[test]
    fn limit_from_arg() {
        assert_eq!(ConcurrencyLimit::from_arg(2).permits(), Some(2));
        assert_eq!(ConcurrencyLimit::from_arg(0), ConcurrencyLimit::unbounded());
        assert_eq!(ConcurrencyLimit::from_arg(-1), ConcurrencyLimit::unbounded());
        assert_eq!(
            ConcurrencyLimit::from_arg(i64::MAX).permits(),
            Some(Semaphore::MAX_PERMITS)
        );
    }

    #[tokio::test]
    async fn huge_limit_dispatches_normally() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let dispatcher = Dispatcher::new(
            Arc::new(site(1)),
            ArtifactStore::create(temp.path())?,
            ConcurrencyLimit::from_arg(i64::MAX),
        );

        let report = dispatcher.dispatch(urls(1)).await;

        assert_eq!(report.fetched.len(), 1);
        assert!(report.failed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let renderer = Arc::new(site(5));
        let dispatcher = Dispatcher::new(
            renderer.clone(),
            ArtifactStore::create(temp.path())?,
            ConcurrencyLimit::from_arg(2),
        );

        let report = dispatcher.dispatch(urls(5)).await;

        assert_eq!(report.fetched.len(), 5);
        assert!(report.failed.is_empty());
        assert_eq!(renderer.calls().len(), 5);
        assert!(
            renderer.peak_in_flight() <= 2,
            "peak in flight: {}",
            renderer.peak_in_flight()
        );
        Ok(())
    }

    #[tokio::test]
    async fn unbounded_runs_everything_at_once() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let renderer = Arc::new(site(5));
        let dispatcher = Dispatcher::new(
            renderer.clone(),
            ArtifactStore::create(temp.path())?,
            ConcurrencyLimit::unbounded(),
        );

        let report = dispatcher.dispatch(urls(5)).await;

        assert_eq!(report.fetched.len(), 5);
        assert_eq!(renderer.peak_in_flight(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = ArtifactStore::create(temp.path())?;
        let renderer = Arc::new(site(4).fail("https://example.com/4"));
        let dispatcher =
            Dispatcher::new(renderer, store.clone(), ConcurrencyLimit::from_arg(5));

        let report = dispatcher.dispatch(urls(5)).await;

        assert_eq!(report.fetched.len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, "https://example.com/4");
        for url in urls(4) {
            assert!(store.content_path(&url).exists());
            assert!(store.links_path(&url).exists());
        }
        assert!(!store.content_path("https://example.com/4").exists());
        Ok(())
    }

    #[tokio::test]
    async fn panicking_fetch_is_reported_as_failure() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let renderer = Arc::new(site(2).panic("https://example.com/2"));
        let dispatcher = Dispatcher::new(
            renderer,
            ArtifactStore::create(temp.path())?,
            ConcurrencyLimit::unbounded(),
        );

        let report = dispatcher.dispatch(urls(3)).await;

        assert_eq!(report.fetched.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, "https://example.com/2");
        Ok(())
    }

    #[tokio::test]
    async fn artifact_write_failure_fails_only_that_url() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = ArtifactStore::create(temp.path())?;
        let long_url = format!("https://example.com/{}", "a".repeat(400));
        let renderer = Arc::new(site(1).page(&long_url, &[]));
        let dispatcher = Dispatcher::new(renderer, store, ConcurrencyLimit::unbounded());

        let report = dispatcher
            .dispatch(vec!["https://example.com/0".to_owned(), long_url.clone()])
            .await;

        assert_eq!(report.fetched.len(), 1);
        assert_eq!(report.fetched[0].url, "https://example.com/0");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, long_url);
        Ok(())
    }
}
