use crate::constants::LATENCY_EMA_ALPHA;
use rustc_hash::FxHashMap as HashMap;
use tokio::sync::RwLock;
use url::Url;

#[derive(Debug, Default)]
/// Per-region exponential moving average of observed upstream round-trip latency.
/// Keyed by region, then by upstream url. An entry exists only after the first
/// successful observation for that pair; unobserved upstreams sort as +inf.
/// The table is process-local and never persisted.
pub struct LatencyTable {
  inner: RwLock<HashMap<String, HashMap<String, f64>>>,
}

impl LatencyTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns a copy of `upstreams` stably sorted by ascending known latency for
  /// `region`. Upstreams without an observation keep their original order after
  /// all observed ones.
  pub async fn order(&self, region: &str, upstreams: &[Url]) -> Vec<Url> {
    let lock = self.inner.read().await;
    let observed = lock.get(region);
    let latency_of = |u: &Url| {
      observed
        .and_then(|per_region| per_region.get(u.as_str()))
        .copied()
        .unwrap_or(f64::INFINITY)
    };
    let mut sorted = upstreams.to_vec();
    sorted.sort_by(|a, b| latency_of(a).total_cmp(&latency_of(b)));
    sorted
  }

  /// Fold one observation into the EMA for (region, upstream):
  /// `next = prev + alpha * (obs - prev)`, seeded directly by the first
  /// observation. Negative or non-finite observations are ignored.
  pub async fn observe(&self, region: &str, upstream: &Url, ms: f64) {
    if !ms.is_finite() || ms < 0.0 {
      return;
    }
    let mut lock = self.inner.write().await;
    lock
      .entry(region.to_string())
      .or_default()
      .entry(upstream.as_str().to_string())
      .and_modify(|prev| *prev += LATENCY_EMA_ALPHA * (ms - *prev))
      .or_insert(ms);
  }

  #[cfg(test)]
  /// Known EMA for (region, upstream), if any observation has been folded in
  pub async fn get(&self, region: &str, upstream: &Url) -> Option<f64> {
    let lock = self.inner.read().await;
    lock.get(region).and_then(|per_region| per_region.get(upstream.as_str())).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upstream(host: &str) -> Url {
    Url::parse(&format!("https://{host}/dns-query")).unwrap()
  }

  #[tokio::test]
  async fn first_observation_seeds_directly() {
    let table = LatencyTable::new();
    let u = upstream("a.example");
    table.observe("GLOBAL", &u, 20.0).await;
    assert_eq!(table.get("GLOBAL", &u).await, Some(20.0));
  }

  #[tokio::test]
  async fn follows_the_ema_law() {
    let table = LatencyTable::new();
    let u = upstream("a.example");
    table.observe("GLOBAL", &u, 100.0).await;
    table.observe("GLOBAL", &u, 50.0).await;
    let expected = 100.0 + LATENCY_EMA_ALPHA * (50.0 - 100.0);
    let got = table.get("GLOBAL", &u).await.unwrap();
    assert!((got - expected).abs() < 1e-9);
  }

  #[tokio::test]
  async fn ignores_negative_and_non_finite_observations() {
    let table = LatencyTable::new();
    let u = upstream("a.example");
    table.observe("GLOBAL", &u, -1.0).await;
    table.observe("GLOBAL", &u, f64::NAN).await;
    table.observe("GLOBAL", &u, f64::INFINITY).await;
    assert_eq!(table.get("GLOBAL", &u).await, None);
  }

  #[tokio::test]
  async fn observed_upstreams_sort_before_unobserved() {
    let table = LatencyTable::new();
    let (a, b, c) = (upstream("a.example"), upstream("b.example"), upstream("c.example"));
    table.observe("GLOBAL", &c, 15.0).await;
    let ordered = table.order("GLOBAL", &[a.clone(), b.clone(), c.clone()]).await;
    assert_eq!(ordered, vec![c, a, b]);
  }

  #[tokio::test]
  async fn unobserved_upstreams_keep_their_original_order() {
    let table = LatencyTable::new();
    let list = vec![upstream("a.example"), upstream("b.example"), upstream("c.example")];
    let ordered = table.order("GLOBAL", &list).await;
    assert_eq!(ordered, list);
  }

  #[tokio::test]
  async fn regions_are_independent() {
    let table = LatencyTable::new();
    let (a, b) = (upstream("a.example"), upstream("b.example"));
    table.observe("DE", &b, 5.0).await;
    table.observe("US", &a, 5.0).await;
    assert_eq!(table.order("DE", &[a.clone(), b.clone()]).await, vec![b.clone(), a.clone()]);
    assert_eq!(table.order("US", &[a.clone(), b.clone()]).await, vec![a, b]);
  }
}
