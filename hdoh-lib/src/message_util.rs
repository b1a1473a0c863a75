use crate::{
  constants::{DNS_QUERY_PARAM, DOH_CONTENT_TYPE, MAX_DNS_QUESTION_LEN},
  error::*,
};
use futures::StreamExt;
use http::{header, Request};
use http_body_util::BodyStream;
use hyper::body::{Body, Buf};

/// true iff `v` is a plausible base64url-encoded DNS message: non-empty and
/// restricted to the padding-free base64url alphabet of RFC 8484.
pub(crate) fn is_base64url(v: &str) -> bool {
  !v.is_empty() && v.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extract and validate the `dns` query parameter of a DoH GET request
pub(crate) fn dns_param_from_query<B>(req: &Request<B>) -> HttpResult<String> {
  let http_query = req.uri().query().unwrap_or("");
  let value = http_query
    .split('&')
    .filter_map(|pair| pair.split_once('='))
    .find(|(k, _)| *k == DNS_QUERY_PARAM)
    .map(|(_, v)| v)
    .ok_or(HttpError::MissingDnsParameter)?;
  if !is_base64url(value) {
    return Err(HttpError::InvalidDnsParameter);
  }
  Ok(value.to_string())
}

/// Check the content type of a DoH POST request. A missing content-type header
/// is accepted and the body forwarded as-is; a present one must carry
/// "application/dns-message".
pub(crate) fn check_doh_content_type<B>(req: &Request<B>) -> HttpResult<()> {
  let Some(content_type) = req.headers().get(header::CONTENT_TYPE) else {
    return Ok(());
  };
  let Ok(ct) = content_type.to_str() else {
    return Err(HttpError::InvalidContentType);
  };
  if !ct.to_ascii_lowercase().contains(DOH_CONTENT_TYPE) {
    return Err(HttpError::InvalidContentType);
  }
  Ok(())
}

/// read request body into a vector, bounded by MAX_DNS_QUESTION_LEN
pub(crate) async fn read_request_body<B>(body: &mut B) -> HttpResult<Vec<u8>>
where
  B: Body + Unpin,
{
  let mut sum_size = 0;
  let mut query = vec![];
  let mut stream = BodyStream::new(body);
  while let Some(chunk) = stream.next().await {
    let chunk = chunk
      .map_err(|_| HttpError::TooLargeRequestBody)?
      .into_data()
      .map(|v| v.chunk().to_vec())
      .map_err(|_| HttpError::TooLargeRequestBody)?;

    sum_size += chunk.len();
    if sum_size > MAX_DNS_QUESTION_LEN {
      return Err(HttpError::TooLargeRequestBody);
    }
    query.extend(chunk);
  }
  if query.is_empty() {
    return Err(HttpError::NoBodyInRequest);
  }

  Ok(query)
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::{engine::general_purpose, Engine as _};
  use http_body_util::Full;
  use hyper::body::Bytes;

  fn get_request(query: &str) -> Request<()> {
    Request::builder()
      .uri(format!("https://proxy.example/dns-query{query}"))
      .body(())
      .unwrap()
  }

  #[test]
  fn accepts_base64url_dns_param() {
    let encoded = general_purpose::URL_SAFE_NO_PAD.encode([0u8, 1, 2, 255]);
    let req = get_request(&format!("?dns={encoded}"));
    assert_eq!(dns_param_from_query(&req).unwrap(), encoded);
  }

  #[test]
  fn rejects_missing_and_malformed_dns_param() {
    assert!(matches!(
      dns_param_from_query(&get_request("")),
      Err(HttpError::MissingDnsParameter)
    ));
    assert!(matches!(
      dns_param_from_query(&get_request("?other=abc")),
      Err(HttpError::MissingDnsParameter)
    ));
    assert!(matches!(
      dns_param_from_query(&get_request("?dns=!!!")),
      Err(HttpError::InvalidDnsParameter)
    ));
    // padded base64url is rejected, RFC 8484 carries none
    assert!(matches!(
      dns_param_from_query(&get_request("?dns=abcd=")),
      Err(HttpError::InvalidDnsParameter)
    ));
  }

  #[test]
  fn content_type_check_allows_absent_header() {
    let req = Request::builder().body(()).unwrap();
    assert!(check_doh_content_type(&req).is_ok());
  }

  #[test]
  fn content_type_check_matches_dns_message_only() {
    let ok = Request::builder()
      .header(header::CONTENT_TYPE, "Application/DNS-Message")
      .body(())
      .unwrap();
    assert!(check_doh_content_type(&ok).is_ok());

    let bad = Request::builder()
      .header(header::CONTENT_TYPE, "text/plain")
      .body(())
      .unwrap();
    assert!(matches!(check_doh_content_type(&bad), Err(HttpError::InvalidContentType)));
  }

  #[tokio::test]
  async fn reads_post_body_fully() {
    let mut body = Full::new(Bytes::from_static(b"\x12\x34rest-of-query"));
    let read = read_request_body(&mut body).await.unwrap();
    assert_eq!(read, b"\x12\x34rest-of-query");
  }

  #[tokio::test]
  async fn rejects_empty_body() {
    let mut body = Full::new(Bytes::new());
    assert!(matches!(
      read_request_body(&mut body).await,
      Err(HttpError::NoBodyInRequest)
    ));
  }

  #[tokio::test]
  async fn rejects_oversized_body() {
    let mut body = Full::new(Bytes::from(vec![0u8; MAX_DNS_QUESTION_LEN + 1]));
    assert!(matches!(
      read_request_body(&mut body).await,
      Err(HttpError::TooLargeRequestBody)
    ));
  }
}
