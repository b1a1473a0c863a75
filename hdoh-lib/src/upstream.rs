use crate::{constants::DEFAULT_UPSTREAMS, trace::*};
use url::Url;

#[derive(Debug, Clone)]
/// Ordered set of upstream DoH resolvers, fixed at process start.
/// Indexing is stable; the latency table reorders copies of this list per request.
pub struct UpstreamRegistry {
  upstreams: Vec<Url>,
}

impl UpstreamRegistry {
  /// Parse the configured upstream list. Tokens are separated by any mix of
  /// commas, newlines and whitespace; empty tokens are dropped and the rest
  /// normalized. Tokens that still fail URL parsing are skipped with a warning,
  /// never an error. An empty result falls back to the built-in resolvers.
  pub fn load(config: Option<&str>) -> Self {
    let mut upstreams = parse_upstream_list(config.unwrap_or_default());
    if upstreams.is_empty() {
      upstreams = parse_upstream_list(&DEFAULT_UPSTREAMS.join(" "));
    }
    Self { upstreams }
  }

  pub fn as_slice(&self) -> &[Url] {
    &self.upstreams
  }

  pub fn len(&self) -> usize {
    self.upstreams.len()
  }

  pub fn is_empty(&self) -> bool {
    self.upstreams.is_empty()
  }
}

fn parse_upstream_list(config: &str) -> Vec<Url> {
  config
    .split(|c: char| c == ',' || c.is_whitespace())
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .filter_map(|token| match normalize_upstream(token) {
      Some(url) => Some(url),
      None => {
        warn!("Skipping malformed upstream url: {token}");
        None
      }
    })
    .collect()
}

/// Normalize a single upstream token: strip a trailing slash, then append
/// "/dns-query" unless the url already ends in it or carries a query string.
fn normalize_upstream(token: &str) -> Option<Url> {
  let stripped = token.strip_suffix('/').unwrap_or(token);
  let mut normalized = stripped.to_string();
  if !normalized.ends_with(crate::constants::QUERY_PATH) && !normalized.contains('?') {
    normalized.push_str(crate::constants::QUERY_PATH);
  }
  Url::parse(&normalized).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn appends_query_path_to_bare_host() {
    let registry = UpstreamRegistry::load(Some("https://x.example"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.as_slice()[0].as_str(), "https://x.example/dns-query");
  }

  #[test]
  fn strips_trailing_slash_before_appending() {
    let registry = UpstreamRegistry::load(Some("https://x.example/"));
    assert_eq!(registry.as_slice()[0].as_str(), "https://x.example/dns-query");
  }

  #[test]
  fn keeps_url_with_query_string_unchanged() {
    let registry = UpstreamRegistry::load(Some("https://x.example/custom?foo=1"));
    assert_eq!(registry.as_slice()[0].as_str(), "https://x.example/custom?foo=1");
  }

  #[test]
  fn normalization_is_idempotent() {
    for token in ["https://x.example", "https://x.example/", "https://x.example/dns-query", "https://x.example/custom?foo=1"] {
      let once = normalize_upstream(token).unwrap();
      let twice = normalize_upstream(once.as_str()).unwrap();
      assert_eq!(once, twice);
    }
  }

  #[test]
  fn splits_on_commas_newlines_and_whitespace() {
    let registry = UpstreamRegistry::load(Some("https://a.example,,https://b.example\nhttps://c.example  https://d.example"));
    let hosts: Vec<_> = registry.as_slice().iter().filter_map(|u| u.host_str()).collect();
    assert_eq!(hosts, ["a.example", "b.example", "c.example", "d.example"]);
  }

  #[test]
  fn blank_config_falls_back_to_defaults() {
    let from_none = UpstreamRegistry::load(None);
    let from_blank = UpstreamRegistry::load(Some("  \n "));
    assert_eq!(from_none.len(), DEFAULT_UPSTREAMS.len());
    assert_eq!(from_blank.len(), DEFAULT_UPSTREAMS.len());
    assert!(from_none.as_slice().iter().all(|u| u.path().ends_with("/dns-query")));
  }

  #[test]
  fn malformed_tokens_are_skipped() {
    let registry = UpstreamRegistry::load(Some("not-a-url https://a.example"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.as_slice()[0].host_str(), Some("a.example"));
  }
}
