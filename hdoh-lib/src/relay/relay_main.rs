use crate::{
  error::*,
  globals::Globals,
  hyper_body::{empty, BoxBody, IncomingOr},
  hyper_client::HttpClient,
  latency::LatencyTable,
  message_util::{check_doh_content_type, dns_param_from_query, read_request_body},
  region::region_of,
  shaper::shape_response_headers,
  upstream::UpstreamRegistry,
};
use http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use hyper::body::{Bytes, Incoming};
use hyper_util::client::legacy::connect::Connect;
use std::{sync::Arc, time::Duration};
use tracing::instrument;

/// Payload of a single DoH query, shared unchanged across all launches of a race
pub(crate) enum QueryPayload {
  /// validated base64url value of the `dns` query parameter
  Get(String),
  /// opaque binary DNS message from the request body
  Post(Bytes),
}

/// Relay racing each DoH query against the configured upstream resolvers
pub struct InnerRelay<C>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  /// hyper client issuing upstream requests
  pub(super) inner: Arc<HttpClient<C, BoxBody>>,
  /// request default headers for upstream launches
  pub(super) request_headers: HeaderMap,
  /// url path serving DoH queries
  pub(crate) serve_path: String,
  /// upstream resolvers in configured order
  pub(super) upstreams: UpstreamRegistry,
  /// per-region latency memory
  pub(super) latency_table: Arc<LatencyTable>,
  /// delay between successive upstream launches
  pub(super) hedge_delay: Duration,
  /// safety timeout bounding the whole race
  pub(super) race_timeout: Duration,
}

impl<C> InnerRelay<C>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  #[instrument(name = "relay_serve", skip_all)]
  /// Serve a DoH request:
  /// 1. derive the region key from request headers
  /// 2. dispatch on method: preflight for OPTIONS, validation for GET/POST
  /// 3. race the query across upstreams ordered by known latency
  pub async fn serve(&self, req: Request<Incoming>) -> HttpResult<Response<IncomingOr<BoxBody>>> {
    let region = region_of(req.headers());
    match *req.method() {
      Method::OPTIONS => Ok(preflight_response()),
      Method::GET => {
        let dns = dns_param_from_query(&req)?;
        self.race(&region, QueryPayload::Get(dns)).await
      }
      Method::POST => {
        check_doh_content_type(&req)?;
        let query = read_request_body(&mut req.into_body()).await?;
        self.race(&region, QueryPayload::Post(Bytes::from(query))).await
      }
      _ => Err(HttpError::InvalidMethod),
    }
  }

  /// Build relay
  pub fn try_new(globals: &Arc<Globals>, http_client: &Arc<HttpClient<C, BoxBody>>) -> Result<Arc<Self>> {
    let service_config = &globals.service_config;

    // default headers for upstream requests
    let mut request_headers = HeaderMap::new();
    request_headers.insert(
      header::ACCEPT,
      HeaderValue::from_static(crate::constants::DOH_CONTENT_TYPE),
    );
    request_headers.insert(
      header::CACHE_CONTROL,
      HeaderValue::from_static(crate::constants::FORWARD_CACHE_CONTROL),
    );
    request_headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    request_headers.insert(
      header::USER_AGENT,
      HeaderValue::from_str(&service_config.http_user_agent).map_err(|_| ProxyError::BuildRelayError)?,
    );

    Ok(Arc::new(Self {
      inner: http_client.clone(),
      request_headers,
      serve_path: service_config.path.clone(),
      upstreams: service_config.upstreams.clone(),
      latency_table: globals.latency_table.clone(),
      hedge_delay: service_config.hedge_delay,
      race_timeout: service_config.race_timeout,
    }))
  }
}

/// Unconditional 204 for a CORS preflight, with an explicit zero content-length
fn preflight_response() -> Response<IncomingOr<BoxBody>> {
  let mut response = Response::builder()
    .status(StatusCode::NO_CONTENT)
    .header(header::CONTENT_LENGTH, "0")
    .body(IncomingOr::Right(empty()))
    .unwrap();
  shape_response_headers(response.headers_mut(), false);
  response
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preflight_carries_cors_headers_and_no_content() {
    let res = preflight_response();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "0");
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Accept");
    assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(res.headers()[header::CONTENT_SECURITY_POLICY], "default-src 'none'");
    assert!(!res.headers().contains_key(header::CACHE_CONTROL));
  }
}
