use http::HeaderMap;

/// Header names consulted for a region hint, in priority order
const REGION_HEADERS: &[&str] = &["x-vercel-ip-country", "cf-ipcountry", "x-vercel-id"];
/// Fallback region key when no usable hint is present
const GLOBAL_REGION: &str = "GLOBAL";

/// Derive the latency-table bucket for a request from its headers. The value is
/// advisory and never validated against a geography list; blank or non-UTF-8
/// header values fall through to the next candidate.
pub fn region_of(headers: &HeaderMap) -> String {
  REGION_HEADERS
    .iter()
    .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
    .map(str::trim)
    .find(|v| !v.is_empty())
    .map(|v| v.to_ascii_uppercase())
    .unwrap_or_else(|| GLOBAL_REGION.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use http::HeaderValue;

  fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
      headers.insert(*name, HeaderValue::from_str(value).unwrap());
    }
    headers
  }

  #[test]
  fn prefers_vercel_country_over_cloudflare() {
    let h = headers(&[("cf-ipcountry", "us"), ("x-vercel-ip-country", "de")]);
    assert_eq!(region_of(&h), "DE");
  }

  #[test]
  fn falls_back_through_the_priority_order() {
    let h = headers(&[("cf-ipcountry", "jp")]);
    assert_eq!(region_of(&h), "JP");
    let h = headers(&[("x-vercel-id", "fra1::abcd")]);
    assert_eq!(region_of(&h), "FRA1::ABCD");
  }

  #[test]
  fn blank_values_fall_through() {
    let h = headers(&[("x-vercel-ip-country", "  "), ("cf-ipcountry", "br")]);
    assert_eq!(region_of(&h), "BR");
  }

  #[test]
  fn defaults_to_global() {
    assert_eq!(region_of(&HeaderMap::new()), "GLOBAL");
  }
}
