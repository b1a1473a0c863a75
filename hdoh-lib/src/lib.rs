mod constants;
mod count;
mod error;
mod globals;
mod hyper_body;
mod hyper_client;
mod hyper_executor;
mod latency;
mod message_util;
mod region;
mod relay;
mod router;
mod shaper;
mod trace;
mod upstream;

use crate::{
  count::RequestCount, error::*, globals::Globals, hyper_client::HttpClient, hyper_executor::LocalExecutor,
  latency::LatencyTable, router::Router, trace::*,
};
use hyper_util::server::{self, conn::auto::Builder as ConnectionBuilder};
use std::sync::Arc;

pub use globals::ServiceConfig;
pub use upstream::UpstreamRegistry;

/// Entry point of the proxy
pub async fn entrypoint(
  service_config: &ServiceConfig,
  runtime_handle: &tokio::runtime::Handle,
  term_notify: Option<Arc<tokio::sync::Notify>>,
) -> Result<()> {
  // build globals
  let globals = Arc::new(Globals {
    service_config: service_config.clone(),
    latency_table: Arc::new(LatencyTable::new()),
    runtime_handle: runtime_handle.clone(),
    term_notify,
    request_count: RequestCount::default(),
  });

  // build http client racing queries against upstream resolvers
  let http_client = Arc::new(HttpClient::try_new(runtime_handle.clone())?);

  // build http server
  let http_server = build_hyper_server(&globals);

  // build router
  let router = Router::try_new(&globals, &http_server, &http_client)?;

  // start router
  if let Err(e) = router.start().await {
    warn!("DoH proxy service stopped: {e}");
  }

  Ok(())
}

/// build hyper server
fn build_hyper_server(globals: &Arc<Globals>) -> Arc<ConnectionBuilder<LocalExecutor>> {
  let executor = LocalExecutor::new(globals.runtime_handle.clone());
  let mut server = server::conn::auto::Builder::new(executor);
  server
    .http1()
    .keep_alive(globals.service_config.keepalive)
    .pipeline_flush(true);
  server
    .http2()
    .max_concurrent_streams(globals.service_config.max_concurrent_streams);
  Arc::new(server)
}
