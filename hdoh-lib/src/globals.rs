use crate::{constants::*, count::RequestCount, latency::LatencyTable, upstream::UpstreamRegistry};
use std::{net::SocketAddr, sync::Arc, time::Duration};

/// Global objects
pub struct Globals {
  /// Configuration of the proxy service
  pub service_config: ServiceConfig,

  /// Per-region latency memory biasing upstream dispatch order.
  /// Held here explicitly so the handler receives it rather than reaching
  /// for ambient state; regions populate lazily.
  pub latency_table: Arc<LatencyTable>,

  /// Tokio runtime handler
  pub runtime_handle: tokio::runtime::Handle,

  /// Tokio termination notifier
  pub term_notify: Option<Arc<tokio::sync::Notify>>,

  /// Request count, i.e., TCP sessions
  pub request_count: RequestCount,
}

#[derive(Clone)]
/// Service configuration passed from outside
pub struct ServiceConfig {
  /// Address to listen on
  pub listener_socket: SocketAddr,

  /// TCP listen backlog
  pub tcp_listen_backlog: u32,

  /// Maximum number of concurrent connections
  pub max_clients: usize,
  /// Maximum number of concurrent streams
  pub max_concurrent_streams: u32,
  /// http keepalive
  pub keepalive: bool,

  /// url path serving DoH queries
  pub path: String,
  /// upstream DoH resolvers raced for each query
  pub upstreams: UpstreamRegistry,
  /// delay between successive upstream launches within one race
  pub hedge_delay: Duration,
  /// safety timeout bounding the whole race
  pub race_timeout: Duration,
  /// http user agent for upstream requests
  pub http_user_agent: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      listener_socket: LISTEN_SOCKET.parse().unwrap(),
      tcp_listen_backlog: TCP_LISTEN_BACKLOG,
      max_clients: MAX_CLIENTS,
      max_concurrent_streams: MAX_CONCURRENT_STREAMS,
      keepalive: KEEPALIVE,
      path: QUERY_PATH.to_string(),
      upstreams: UpstreamRegistry::load(None),
      hedge_delay: Duration::from_millis(HEDGE_DELAY_MS),
      race_timeout: Duration::from_millis(RACE_TIMEOUT_MS),
      http_user_agent: format!("{}/{}", FORWARDER_USER_AGENT, env!("CARGO_PKG_VERSION")),
    }
  }
}
