use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context as _;

use crate::classify::host_of;

/// Parses the newline-delimited URL list format shared by seed and skip lists.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

pub fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read url list: {}", path.display()))?;
    Ok(parse_url_list(&text))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedList {
    pub urls: BTreeSet<String>,
    /// Hosts of every seed; the allow-list for the whole run.
    pub target_domains: BTreeSet<String>,
}

impl SeedList {
    pub fn from_urls<I>(urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seeds = Self::default();
        for url in urls {
            match host_of(&url) {
                Some(host) => {
                    seeds.target_domains.insert(host);
                }
                None => tracing::warn!(%url, "seed url has no host; it contributes no target domain"),
            }
            seeds.urls.insert(url);
        }
        seeds
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let urls = read_url_list(path).context("load seed list")?;
        Ok(Self::from_urls(urls))
    }
}
