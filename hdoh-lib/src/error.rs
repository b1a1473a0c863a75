pub use anyhow::{anyhow, bail, ensure, Context};
use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Describes things that can go wrong while bringing the proxy up
#[derive(Debug, Error)]
pub enum ProxyError {
  #[error("Failed to bind TCP socket")]
  BindTcpSocketError(#[from] std::io::Error),
  #[error("Failed to build relay")]
  BuildRelayError,
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

/// Describes things that can go wrong while serving a single query
#[derive(Debug, Error)]
pub enum HttpError {
  #[error("Method not allowed")]
  InvalidMethod,
  #[error("Not found")]
  InvalidPath,
  #[error("Missing dns query parameter")]
  MissingDnsParameter,
  #[error("Invalid dns query parameter")]
  InvalidDnsParameter,
  #[error("Invalid content type")]
  InvalidContentType,
  #[error("No body in request")]
  NoBodyInRequest,
  #[error("Too large body")]
  TooLargeRequestBody,

  #[error("No upstream configured")]
  NoUpstream,
  #[error("Upstream timeout")]
  UpstreamTimeout,
  #[error("Failed to send request")]
  SendRequestError(#[from] hyper_util::client::legacy::Error),

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl From<HttpError> for StatusCode {
  fn from(e: HttpError) -> StatusCode {
    match e {
      HttpError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
      HttpError::InvalidPath => StatusCode::NOT_FOUND,
      HttpError::MissingDnsParameter => StatusCode::BAD_REQUEST,
      HttpError::InvalidDnsParameter => StatusCode::BAD_REQUEST,
      HttpError::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      HttpError::NoBodyInRequest => StatusCode::BAD_REQUEST,
      HttpError::TooLargeRequestBody => StatusCode::PAYLOAD_TOO_LARGE,

      HttpError::NoUpstream => StatusCode::GATEWAY_TIMEOUT,
      HttpError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
      HttpError::SendRequestError(_) => StatusCode::BAD_GATEWAY,

      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}
