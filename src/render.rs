use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, LOCATION};
use scraper::{Html, Selector};
use url::Url;

const MAX_REDIRECTS: usize = 10;
const USER_AGENT: &str = concat!("sitecrawl/", env!("CARGO_PKG_VERSION"));

/// A 3xx response observed while loading a page: the responding URL and its
/// raw `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub content: String,
    /// Every anchor's href as the document exposes it; may contain blanks,
    /// duplicates and unparsable values.
    pub links: Vec<String>,
    pub redirects: Vec<Redirect>,
}

/// Loads a single URL and reports its content, anchors and redirects.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> anyhow::Result<RenderedPage>;
}

/// Renderer that loads pages over plain HTTP without executing scripts.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .context("build http renderer client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> anyhow::Result<RenderedPage> {
        let mut current = Url::parse(url).with_context(|| format!("parse url: {url}"))?;
        if current.scheme() != "http" && current.scheme() != "https" {
            anyhow::bail!("url must be http/https: {url}");
        }

        let mut redirects = Vec::new();
        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(current.clone())
                .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
                .send()
                .await
                .with_context(|| format!("GET {current}"))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned)
                    .ok_or_else(|| anyhow::anyhow!("GET {current}: {status} without location"))?;
                let next = current
                    .join(location.trim())
                    .with_context(|| format!("resolve redirect location: {location}"))?;
                redirects.push(Redirect {
                    from: response.url().to_string(),
                    to: location,
                });
                current = next;
                continue;
            }

            if !status.is_success() {
                anyhow::bail!("GET {current}: HTTP {status}");
            }

            let final_url = response.url().clone();
            let content = response
                .text()
                .await
                .with_context(|| format!("read body: {final_url}"))?;
            let links = extract_anchor_hrefs(&content, &final_url);

            return Ok(RenderedPage {
                content,
                links,
                redirects,
            });
        }

        anyhow::bail!("too many redirects (>{MAX_REDIRECTS}) starting at {url}")
    }
}

/// Href of every `<a>` element, resolved against `base`.
///
/// Anchors without `href` yield an empty string and hrefs that cannot be
/// resolved are returned verbatim.
pub fn extract_anchor_hrefs(html: &str, base: &Url) -> Vec<String> {
    let selector = Selector::parse("a").expect("anchor selector is valid");
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .map(|anchor| match anchor.value().attr("href") {
            None => String::new(),
            Some(href) => match base.join(href.trim()) {
                Ok(resolved) => resolved.to_string(),
                Err(_) => href.to_owned(),
            },
        })
        .collect()
}
