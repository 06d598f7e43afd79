use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::render::RenderedPage;
use crate::session::CrawlSession;

pub const PROCESSED_URLS_FILE: &str = "all_processed_urls.txt";
pub const EXCLUDED_URLS_FILE: &str = "all_excluded_urls.txt";
pub const REDIRECTED_URLS_FILE: &str = "all_redirected_urls.txt";
pub const FAILED_URLS_FILE: &str = "all_failed_urls.txt";

const LINKS_FILE_PREFIX: &str = "urls_in_";

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(url: &str) -> String {
    url.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes per-page artifacts and run summaries into one flat directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    out_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates `out_dir` if needed. Existing artifacts are overwritten.
    pub fn create(out_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("create output dir: {}", out_dir.display()))?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn content_path(&self, url: &str) -> PathBuf {
        self.out_dir.join(sanitize_file_name(url))
    }

    pub fn links_path(&self, url: &str) -> PathBuf {
        self.out_dir
            .join(format!("{LINKS_FILE_PREFIX}{}", sanitize_file_name(url)))
    }

    pub async fn write_page(&self, url: &str, page: &RenderedPage) -> anyhow::Result<()> {
        let content_path = self.content_path(url);
        tokio::fs::write(&content_path, &page.content)
            .await
            .with_context(|| format!("write page content: {}", content_path.display()))?;
        tracing::debug!(path = %content_path.display(), "wrote page content");

        let links_path = self.links_path(url);
        tokio::fs::write(&links_path, lines(page.links.iter().map(String::as_str)))
            .await
            .with_context(|| format!("write page links: {}", links_path.display()))?;
        tracing::debug!(path = %links_path.display(), "wrote page links");

        Ok(())
    }

    pub fn write_summaries(&self, session: &CrawlSession) -> anyhow::Result<()> {
        self.write_summary(
            PROCESSED_URLS_FILE,
            lines(session.processed().iter().map(String::as_str)),
        )?;
        self.write_summary(
            EXCLUDED_URLS_FILE,
            lines(session.excluded().iter().map(String::as_str)),
        )?;
        self.write_summary(REDIRECTED_URLS_FILE, redirect_lines(session))?;
        self.write_summary(FAILED_URLS_FILE, lines(session.failed()))?;
        Ok(())
    }

    fn write_summary(&self, file_name: &str, text: String) -> anyhow::Result<()> {
        let path = self.out_dir.join(file_name);
        std::fs::write(&path, text).with_context(|| format!("write summary: {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote summary");
        Ok(())
    }
}

/// One trimmed, non-blank entry per line.
fn lines<'a>(entries: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for entry in entries.map(str::trim).filter(|entry| !entry.is_empty()) {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

fn redirect_lines(session: &CrawlSession) -> String {
    let mut out = String::new();
    for (from, to) in session.redirects() {
        let from = from.trim();
        if from.is_empty() {
            continue;
        }
        out.push_str(&format!("{from} => {}\n", to.trim()));
    }
    out
}
