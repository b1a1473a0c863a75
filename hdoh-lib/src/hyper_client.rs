use crate::{error::*, hyper_body::BoxBody, hyper_executor::LocalExecutor};
use http::{Request, Response};
use hyper::body::{Body, Incoming};
use hyper_util::client::legacy::{
  connect::{Connect, HttpConnector},
  Client,
};

#[derive(Clone)]
/// Http client racing DoH queries against upstream resolvers
pub struct HttpClient<C, B = BoxBody>
where
  C: Send + Sync + Connect + Clone + 'static,
  B: Body + Send + Unpin + 'static,
  <B as Body>::Data: Send,
  <B as Body>::Error: Into<Box<(dyn std::error::Error + Send + Sync + 'static)>>,
{
  pub inner: Client<C, B>,
}

impl<C, B> HttpClient<C, B>
where
  C: Send + Sync + Connect + Clone + 'static,
  B: Body + Send + Unpin + 'static,
  <B as Body>::Data: Send,
  <B as Body>::Error: Into<Box<(dyn std::error::Error + Send + Sync + 'static)>>,
{
  /// wrapper request fn
  pub async fn request(
    &self,
    req: Request<B>,
  ) -> std::result::Result<Response<Incoming>, hyper_util::client::legacy::Error> {
    self.inner.request(req).await
  }
}

impl<B> HttpClient<hyper_rustls::HttpsConnector<HttpConnector>, B>
where
  B: Body + Send + Unpin + 'static,
  <B as Body>::Data: Send,
  <B as Body>::Error: Into<Box<(dyn std::error::Error + Send + Sync + 'static)>>,
{
  /// Build inner client with rustls and webpki roots, only https is allowed
  pub fn try_new(runtime_handle: tokio::runtime::Handle) -> Result<Self> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
      .with_webpki_roots()
      .https_only()
      .enable_http1()
      .enable_http2()
      .build();
    let executor = LocalExecutor::new(runtime_handle.clone());
    let inner = Client::builder(executor).build::<_, B>(connector);

    Ok(Self { inner })
  }
}
