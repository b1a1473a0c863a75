use crate::constants::DOH_CACHE_CONTROL;
use http::{header, HeaderMap, HeaderValue};

/// Apply the proxy's CORS and security headers to an outbound response,
/// preserving unrelated entries. The cache-control default is only set on
/// successful DoH responses that carry none of their own; the upstream's
/// choice always wins.
pub(crate) fn shape_response_headers(headers: &mut HeaderMap, success: bool) {
  headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
  headers.insert(
    header::ACCESS_CONTROL_ALLOW_METHODS,
    HeaderValue::from_static("GET, POST, OPTIONS"),
  );
  headers.insert(
    header::ACCESS_CONTROL_ALLOW_HEADERS,
    HeaderValue::from_static("Content-Type, Accept"),
  );
  headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
  if !headers.contains_key(header::CONTENT_SECURITY_POLICY) {
    headers.insert(
      header::CONTENT_SECURITY_POLICY,
      HeaderValue::from_static("default-src 'none'"),
    );
  }
  if success && !headers.contains_key(header::CACHE_CONTROL) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(DOH_CACHE_CONTROL));
  }
}
