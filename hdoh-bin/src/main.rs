#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod constants;
mod trace;

use crate::{
  config::{build_service_config, parse_opts, Opts},
  trace::*,
};
use hdoh_server_lib::entrypoint;

fn main() {
  let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
  runtime_builder.enable_all();
  runtime_builder.thread_name("hdoh-server");
  let runtime = runtime_builder.build().unwrap();

  runtime.block_on(async {
    // Initially load options
    let Ok(parsed_opts) = parse_opts() else {
      eprintln!("Invalid command line arguments");
      std::process::exit(1);
    };

    // Initialize tracing subscriber
    init_tracing_subscriber();

    if let Err(e) = proxy_service(&parsed_opts, runtime.handle().clone()).await {
      error!("hdoh-server exited: {e}");
      std::process::exit(1);
    }
  });
}

async fn proxy_service(opts: &Opts, runtime_handle: tokio::runtime::Handle) -> Result<(), anyhow::Error> {
  info!("Start hedged DoH proxy");
  let service_config = build_service_config(opts)?;

  entrypoint(&service_config, &runtime_handle, None)
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
