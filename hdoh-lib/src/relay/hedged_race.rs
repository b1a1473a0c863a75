use super::relay_main::{InnerRelay, QueryPayload};
use crate::{
  constants::{DNS_QUERY_PARAM, DOH_CONTENT_TYPE, SYNTHETIC_FAILURE_STATUS},
  error::*,
  hyper_body::{empty, full, BoxBody, IncomingOr},
  shaper::shape_response_headers,
  trace::*,
};
use futures::{stream::FuturesUnordered, Stream, StreamExt};
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use hyper_util::client::legacy::connect::Connect;
use tokio::time::{sleep, timeout, Instant};
use url::Url;

/// A settled launch: one upstream's terminal outcome within a single race
pub(super) struct Settlement<B> {
  /// index of the upstream in launch order
  pub(super) idx: usize,
  /// upstream response, or a synthetic 599 when transport failed
  pub(super) response: Response<B>,
  /// elapsed milliseconds between launch start and settlement
  pub(super) elapsed_ms: f64,
}

/// Outcome of draining a race's settlement stream
pub(super) enum RaceOutcome<B> {
  /// first acceptable settlement observed
  Winner(Settlement<B>),
  /// every launch settled unacceptably; carries the settlement that arrived last
  Exhausted(Settlement<B>),
  /// the stream ended without a single settlement
  Empty,
}

/// Success predicate of the race: a 2xx whose content type either carries
/// "application/dns-message" or is absent/blank entirely.
pub(super) fn is_acceptable<B>(response: &Response<B>) -> bool {
  if !response.status().is_success() {
    return false;
  }
  match response.headers().get(header::CONTENT_TYPE) {
    None => true,
    Some(value) => match value.to_str() {
      Ok(ct) if ct.trim().is_empty() => true,
      Ok(ct) => ct.to_ascii_lowercase().contains(DOH_CONTENT_TYPE),
      Err(_) => false,
    },
  }
}

/// Drain settlements as they arrive and pick the race outcome. The first
/// acceptable settlement wins immediately; otherwise the race is decided once
/// all `n` launches have settled, returning the settlement that arrived last
/// regardless of its launch index.
pub(super) async fn select_outcome<B, S>(mut settlements: S, n: usize) -> RaceOutcome<B>
where
  S: Stream<Item = Settlement<B>> + Unpin,
{
  let mut settled = 0usize;
  let mut last = None;
  while let Some(settlement) = settlements.next().await {
    settled += 1;
    if is_acceptable(&settlement.response) {
      return RaceOutcome::Winner(settlement);
    }
    debug!(
      "upstream {} settled unacceptably with status {}",
      settlement.idx,
      settlement.response.status()
    );
    last = Some(settlement);
    if settled == n {
      break;
    }
  }
  match last {
    Some(settlement) => RaceOutcome::Exhausted(settlement),
    None => RaceOutcome::Empty,
  }
}

/// Synthetic settlement representing an upstream transport failure
fn transport_failure(idx: usize, elapsed_ms: f64) -> Settlement<IncomingOr<BoxBody>> {
  let response = Response::builder()
    .status(StatusCode::from_u16(SYNTHETIC_FAILURE_STATUS).unwrap_or(StatusCode::BAD_GATEWAY))
    .body(IncomingOr::Right(empty()))
    .unwrap();
  Settlement {
    idx,
    response,
    elapsed_ms,
  }
}

fn elapsed_ms_since(start: Instant) -> f64 {
  start.elapsed().as_secs_f64() * 1000.0
}

impl<C> InnerRelay<C>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  /// Race one query across the upstreams ordered by known latency for `region`.
  /// Launches start `hedge_delay` apart; the first acceptable settlement wins,
  /// its losers are cancelled by dropping their futures, and only the winner
  /// feeds the latency table. When every launch settles unacceptably, the last
  /// settlement is passed through; the safety timeout caps the whole race.
  pub(super) async fn race(&self, region: &str, payload: QueryPayload) -> HttpResult<Response<IncomingOr<BoxBody>>> {
    let ordered = self.latency_table.order(region, self.upstreams.as_slice()).await;
    if ordered.is_empty() {
      return Err(HttpError::NoUpstream);
    }
    let n = ordered.len();

    let launches: FuturesUnordered<_> = ordered
      .iter()
      .enumerate()
      .map(|(idx, upstream)| self.launch(idx, upstream, &payload))
      .collect();

    // losers (and not-yet-launched hedges) are dropped together with the stream
    let outcome = timeout(self.race_timeout, select_outcome(launches, n))
      .await
      .map_err(|_| HttpError::UpstreamTimeout)?;

    match outcome {
      RaceOutcome::Winner(settlement) => {
        let upstream = &ordered[settlement.idx];
        self.latency_table.observe(region, upstream, settlement.elapsed_ms).await;
        debug!("upstream {} won in {:.1} ms", upstream, settlement.elapsed_ms);

        let mut response = settlement.response;
        let headers = response.headers_mut();
        let blank_content_type = headers
          .get(header::CONTENT_TYPE)
          .map(|v| v.to_str().map(|s| s.trim().is_empty()).unwrap_or(true))
          .unwrap_or(true);
        if blank_content_type {
          headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DOH_CONTENT_TYPE));
        }
        shape_response_headers(headers, true);
        Ok(response)
      }
      RaceOutcome::Exhausted(settlement) => {
        warn!(
          "all {} upstreams settled unacceptably, passing through status {}",
          n,
          settlement.response.status()
        );
        let mut response = settlement.response;
        if response.status().as_u16() == SYNTHETIC_FAILURE_STATUS {
          *response.status_mut() = StatusCode::BAD_GATEWAY;
        }
        shape_response_headers(response.headers_mut(), false);
        Ok(response)
      }
      RaceOutcome::Empty => Err(HttpError::UpstreamTimeout),
    }
  }

  /// One launch: wait out the hedge offset, then issue the upstream request and
  /// settle with the response or a synthetic transport failure. Elapsed time is
  /// measured from after the hedge sleep.
  async fn launch(&self, idx: usize, upstream: &Url, payload: &QueryPayload) -> Settlement<IncomingOr<BoxBody>> {
    if idx > 0 {
      sleep(self.hedge_delay * idx as u32).await;
    }
    let start = Instant::now();
    let req = match self.build_upstream_request(upstream, payload) {
      Ok(req) => req,
      Err(e) => {
        warn!("failed to build upstream request for {upstream}: {e}");
        return transport_failure(idx, elapsed_ms_since(start));
      }
    };
    match self.inner.request(req).await {
      Ok(response) => Settlement {
        idx,
        elapsed_ms: elapsed_ms_since(start),
        response: response.map(IncomingOr::Left),
      },
      Err(e) => {
        warn!("upstream {upstream} transport failure: {e}");
        transport_failure(idx, elapsed_ms_since(start))
      }
    }
  }

  /// Build the outbound request for one upstream. GET re-attaches the validated
  /// `dns` value percent-encoded; POST shares the same byte buffer across all
  /// launches of the race.
  fn build_upstream_request(&self, upstream: &Url, payload: &QueryPayload) -> HttpResult<Request<BoxBody>> {
    let mut request = match payload {
      QueryPayload::Get(dns) => {
        let mut url = upstream.clone();
        url.query_pairs_mut().append_pair(DNS_QUERY_PARAM, dns);
        Request::builder()
          .method(Method::GET)
          .uri(url.as_str())
          .body(empty())
          .map_err(|e| HttpError::Other(anyhow!("invalid upstream request: {e}")))?
      }
      QueryPayload::Post(query) => Request::builder()
        .method(Method::POST)
        .uri(upstream.as_str())
        .body(full(query.clone()))
        .map_err(|e| HttpError::Other(anyhow!("invalid upstream request: {e}")))?,
    };

    let headers = request.headers_mut();
    *headers = self.request_headers.clone();
    if matches!(payload, QueryPayload::Post(_)) {
      headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DOH_CONTENT_TYPE));
    }
    Ok(request)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::stream;

  fn settlement(idx: usize, status: u16, content_type: Option<&str>) -> Settlement<BoxBody> {
    let mut builder = Response::builder().status(StatusCode::from_u16(status).unwrap());
    if let Some(ct) = content_type {
      builder = builder.header(header::CONTENT_TYPE, ct);
    }
    Settlement {
      idx,
      response: builder.body(empty()).unwrap(),
      elapsed_ms: 10.0,
    }
  }

  #[test]
  fn acceptability_requires_2xx_and_dns_message() {
    assert!(is_acceptable(&settlement(0, 200, Some("application/dns-message")).response));
    assert!(is_acceptable(&settlement(0, 200, Some("application/dns-message; charset=binary")).response));
    assert!(is_acceptable(&settlement(0, 200, None).response));
    assert!(is_acceptable(&settlement(0, 200, Some("")).response));
    assert!(!is_acceptable(&settlement(0, 200, Some("text/html")).response));
    assert!(!is_acceptable(&settlement(0, 500, Some("application/dns-message")).response));
    assert!(!is_acceptable(&settlement(0, 301, None).response));
  }

  #[test]
  fn transport_failures_are_never_acceptable() {
    let failed = transport_failure(0, 1.0);
    assert_eq!(failed.response.status().as_u16(), SYNTHETIC_FAILURE_STATUS);
    assert!(!is_acceptable(&failed.response));
  }

  #[tokio::test]
  async fn first_acceptable_settlement_wins() {
    let settlements = stream::iter(vec![
      settlement(0, 502, None),
      settlement(1, 200, Some("application/dns-message")),
      settlement(2, 200, Some("application/dns-message")),
    ]);
    match select_outcome(settlements, 3).await {
      RaceOutcome::Winner(s) => assert_eq!(s.idx, 1),
      _ => panic!("expected a winner"),
    }
  }

  #[tokio::test]
  async fn exhausted_race_returns_last_settlement_by_arrival() {
    // launch order is 0..3 but settlements arrive out of order; the fallback
    // must fire on the settlement count, not on the last launch index
    let settlements = stream::iter(vec![
      settlement(2, 500, None),
      settlement(0, 500, None),
      settlement(1, 404, None),
    ]);
    match select_outcome(settlements, 3).await {
      RaceOutcome::Exhausted(s) => {
        assert_eq!(s.idx, 1);
        assert_eq!(s.response.status(), StatusCode::NOT_FOUND);
      }
      _ => panic!("expected exhaustion"),
    }
  }

  #[tokio::test]
  async fn exhausted_even_when_last_index_settles_first() {
    let settlements = stream::iter(vec![settlement(1, 500, None), settlement(0, 503, None)]);
    match select_outcome(settlements, 2).await {
      RaceOutcome::Exhausted(s) => assert_eq!(s.response.status(), StatusCode::SERVICE_UNAVAILABLE),
      _ => panic!("expected exhaustion"),
    }
  }

  #[tokio::test]
  async fn empty_stream_yields_empty_outcome() {
    let settlements = stream::iter(Vec::<Settlement<BoxBody>>::new());
    assert!(matches!(select_outcome(settlements, 0).await, RaceOutcome::Empty));
  }
}
