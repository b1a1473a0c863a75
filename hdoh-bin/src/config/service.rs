use super::Opts;
use crate::{constants::UPSTREAMS_ENV, trace::*};
use anyhow::Context;
use hdoh_server_lib::{ServiceConfig, UpstreamRegistry};

/// Build the service configuration from command line options and the process
/// environment. The explicit `--upstreams` option wins over $DOH_UPSTREAMS;
/// a blank or absent list falls back to the built-in resolvers.
pub fn build_service_config(opts: &Opts) -> Result<ServiceConfig, anyhow::Error> {
  let mut service_config = ServiceConfig::default();

  if let Some(listen) = &opts.listen_socket {
    service_config.listener_socket = listen
      .parse()
      .with_context(|| format!("Invalid listen socket address: {listen}"))?;
  }

  let configured = opts
    .upstreams
    .clone()
    .or_else(|| std::env::var(UPSTREAMS_ENV).ok());
  service_config.upstreams = UpstreamRegistry::load(configured.as_deref());

  info!("Listening on {}", service_config.listener_socket);
  let upstream_list = service_config
    .upstreams
    .as_slice()
    .iter()
    .map(|u| u.as_str())
    .collect::<Vec<_>>()
    .join(", ");
  info!("Racing {} upstream resolvers: {}", service_config.upstreams.len(), upstream_list);

  Ok(service_config)
}
