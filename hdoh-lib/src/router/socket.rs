use crate::{error::*, trace::*};
use std::net::SocketAddr;
use tokio::net::TcpSocket;

/// Bind the listener socket with `SO_REUSEADDR` and `SO_REUSEPORT` set, so the
/// address can be re-bound when the proxy instance is reconstructed.
pub(super) fn bind_tcp_socket(listening_on: &SocketAddr) -> Result<TcpSocket> {
  let tcp_socket = match listening_on {
    SocketAddr::V4(_) => TcpSocket::new_v4(),
    SocketAddr::V6(_) => TcpSocket::new_v6(),
  }?;
  tcp_socket.set_reuseaddr(true)?;
  tcp_socket.set_reuseport(true)?;
  if let Err(e) = tcp_socket.bind(*listening_on) {
    error!("Failed to bind TCP socket at {listening_on}: {e}");
    return Err(ProxyError::BindTcpSocketError(e));
  }
  Ok(tcp_socket)
}
