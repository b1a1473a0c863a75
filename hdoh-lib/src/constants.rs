pub const LISTEN_SOCKET: &str = "0.0.0.0:8080";
/// URL path serving DoH queries
pub const QUERY_PATH: &str = "/dns-query";

pub const TCP_LISTEN_BACKLOG: u32 = 1024;
pub const MAX_CLIENTS: usize = 1024;
pub const MAX_CONCURRENT_STREAMS: u32 = 100;
pub const KEEPALIVE: bool = true;

// Racing dispatcher constants

/// Delay between successive upstream launches within one race, in milliseconds
pub const HEDGE_DELAY_MS: u64 = 35;
/// Safety timeout bounding the whole race from dispatcher entry, in milliseconds
pub const RACE_TIMEOUT_MS: u64 = 3000;
/// Smoothing factor of the per-region latency EMA
pub const LATENCY_EMA_ALPHA: f64 = 0.3;
/// Synthetic status representing an upstream transport failure within a race
pub const SYNTHETIC_FAILURE_STATUS: u16 = 599;

// DoH constants

pub const FORWARDER_USER_AGENT: &str = "hdoh-server";
pub const DOH_CONTENT_TYPE: &str = "application/dns-message";
/// Cache-control applied to successful DoH responses that carry none of their own
pub const DOH_CACHE_CONTROL: &str = "public, max-age=60, s-maxage=300";
/// Cache-control sent with upstream requests
pub const FORWARD_CACHE_CONTROL: &str = "no-cache";
/// DNS query parameter name in GET request for DoH (/dns-query?dns=...)
pub const DNS_QUERY_PARAM: &str = "dns";

/// Maximum length of a DNS query carried in a POST body, in bytes
pub const MAX_DNS_QUESTION_LEN: usize = 65536;

/// Built-in upstream resolvers raced when no upstream list is configured
pub const DEFAULT_UPSTREAMS: &[&str] = &[
  "https://cloudflare-dns.com/dns-query",
  "https://dns.google/dns-query",
  "https://dns.quad9.net/dns-query",
  "https://doh.opendns.com/dns-query",
  "https://dns.adguard-dns.com/dns-query",
  "https://doh.mullvad.net/dns-query",
];
