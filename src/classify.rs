use std::collections::BTreeSet;

use url::Url;

/// Host component of `url`, or `None` when the URL does not parse or has no host.
///
/// Identity is the trimmed string; the host is lowercased by the URL parser for
/// special schemes but otherwise compared verbatim (no subdomain folding).
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str().map(str::to_owned)
}

pub fn is_in_domain(url: &str, target_domains: &BTreeSet<String>) -> bool {
    match host_of(url) {
        Some(host) => target_domains.contains(&host),
        None => false,
    }
}
