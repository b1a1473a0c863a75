use crate::error::*;
use http::{header, Response, StatusCode};
use http_body_util::{combinators, BodyExt, Either, Empty, Full};
use hyper::body::{Bytes, Incoming};

/// Type for synthetic boxed body
pub(crate) type BoxBody = combinators::BoxBody<Bytes, hyper::Error>;
/// Type for either passthrough body or synthetic body
pub(crate) type IncomingOr<B> = Either<Incoming, B>;

/// build http response with status code of 4xx and 5xx carrying the reason as plain text
pub(crate) fn synthetic_error_response(status_code: StatusCode, msg: &str) -> Result<Response<IncomingOr<BoxBody>>> {
  let res = Response::builder()
    .status(status_code)
    .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
    .body(IncomingOr::Right(full(Bytes::copy_from_slice(msg.as_bytes()))))
    .unwrap();
  Ok(res)
}

/// helper function to build an empty body
pub(crate) fn empty() -> BoxBody {
  Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// helper function to build a full body from a byte buffer
pub(crate) fn full(body: Bytes) -> BoxBody {
  Full::new(body).map_err(|never| match never {}).boxed()
}
