use crate::{
  error::*,
  hyper_body::{synthetic_error_response, BoxBody, IncomingOr},
  relay::InnerRelay,
  trace::*,
};
use http::StatusCode;
use hyper::{body::Incoming, Request, Response};
use hyper_util::client::legacy::connect::Connect;
use std::sync::Arc;

/// Route a single request: only the DoH path is served, everything else is a
/// 404. Method dispatch and validation live in the relay; typed request errors
/// are rendered here as plain-text synthetic responses.
pub async fn serve_request<C>(
  req: Request<Incoming>,
  relay: Arc<InnerRelay<C>>,
) -> Result<Response<IncomingOr<BoxBody>>>
where
  C: Send + Sync + Connect + Clone + 'static,
{
  if req.uri().path() != relay.serve_path {
    let e = HttpError::InvalidPath;
    let msg = e.to_string();
    return synthetic_error_response(StatusCode::from(e), &msg);
  }

  match relay.serve(req).await {
    Ok(res) => Ok(res),
    Err(e) => {
      debug!("failed to serve query: {e}");
      let msg = e.to_string();
      synthetic_error_response(StatusCode::from(e), &msg)
    }
  }
}
