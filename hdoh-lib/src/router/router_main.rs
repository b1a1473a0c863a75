use super::{router_serve_req::serve_request, socket::bind_tcp_socket};
use crate::{
  count::RequestCount, error::*, globals::Globals, hyper_client::HttpClient, hyper_executor::LocalExecutor,
  relay::InnerRelay, trace::*,
};
use hyper::{
  body::Incoming,
  rt::{Read, Write},
  service::service_fn,
  Request,
};
use hyper_util::{client::legacy::connect::Connect, rt::TokioIo, server::conn::auto::Builder as ConnectionBuilder};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::Instrument as _;

#[derive(Clone)]
/// DoH proxy router main object
pub struct Router<C>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  /// global config
  pub(crate) globals: Arc<Globals>,
  /// hyper server receiving http requests
  pub(crate) http_server: Arc<ConnectionBuilder<LocalExecutor>>,
  /// relay racing each query against upstream resolvers
  pub(crate) inner_relay: Arc<InnerRelay<C>>,
  /// request count
  pub(crate) request_count: RequestCount,
}

impl<C> Router<C>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  /// Serve tcp stream
  fn serve_connection<I>(&self, stream: I, peer_addr: SocketAddr)
  where
    I: Read + Write + Unpin + Send + 'static,
  {
    let request_count = self.request_count.clone();
    if request_count.increment() > self.globals.service_config.max_clients as isize {
      request_count.decrement();
      return;
    }
    debug!("Request incoming: current # {}", request_count.current());

    let server_clone = self.http_server.clone();
    let relay_clone = self.inner_relay.clone();
    // The per-connection timeout bounds the whole exchange; the race inside is
    // capped separately by the shorter safety timeout.
    let timeout_duration = self.globals.service_config.race_timeout + Duration::from_secs(1);
    self.globals.runtime_handle.clone().spawn(async move {
      timeout(
        timeout_duration,
        server_clone.serve_connection(
          stream,
          service_fn(move |req: Request<Incoming>| {
            let current_span =
              tracing::info_span!("serve_request", method = ?req.method(), uri = ?req.uri(), peer_addr = ?peer_addr);
            serve_request(req, relay_clone.clone()).instrument(current_span)
          }),
        ),
      )
      .await
      .ok();

      request_count.decrement();
      debug!("Request processed: current # {}", request_count.current());
    });
  }

  /// Start http routing service
  async fn router_service(&self) -> Result<()> {
    let listener_service = async {
      let tcp_socket = bind_tcp_socket(&self.globals.service_config.listener_socket)?;
      let tcp_listener = tcp_socket.listen(self.globals.service_config.tcp_listen_backlog)?;
      info!(
        "Start TCP listener serving DoH queries on {}",
        self.globals.service_config.listener_socket
      );
      while let Ok((stream, peer_addr)) = tcp_listener.accept().await {
        self.serve_connection(TokioIo::new(stream), peer_addr);
      }
      Ok(()) as Result<()>
    };
    listener_service.await?;
    Ok(())
  }

  /// Entrypoint for HTTP/1.1 and HTTP/2 servers
  pub async fn start(&self) -> Result<()> {
    info!("Start hedged DoH proxy service");

    match &self.globals.term_notify {
      Some(term) => {
        tokio::select! {
          _ = self.router_service() => {
            warn!("Http routing service got down");
          }
          _ = term.notified() => {
            info!("Http routing service receives term signal");
          }
        }
      }
      None => {
        self.router_service().await.ok();
        warn!("Http routing service got down");
      }
    }
    Ok(())
  }

  /// build router
  pub fn try_new(
    globals: &Arc<Globals>,
    http_server: &Arc<ConnectionBuilder<LocalExecutor>>,
    http_client: &Arc<HttpClient<C>>,
  ) -> Result<Self> {
    let inner_relay = InnerRelay::try_new(globals, http_client)?;

    Ok(Self {
      globals: globals.clone(),
      http_server: http_server.clone(),
      inner_relay,
      request_count: globals.request_count.clone(),
    })
  }
}
