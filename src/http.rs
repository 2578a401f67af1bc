//! Transport primitives for provider API calls.
//!
//! [`ApiHttpClient`] is the gatekeeper's only dependency on an HTTP stack. Requests and responses
//! use the `http` types re-exported by `oauth2` ([`HttpRequest`], [`HttpResponse`]) so custom
//! transports and test doubles never depend on reqwest. The default implementation,
//! [`ReqwestHttpClient`], reads at most [`ReqwestHttpClient::DEFAULT_MAX_BODY_BYTES`] of every
//! response body.

// std
use std::{ops::Deref, sync::OnceLock};
// crates.io
pub use oauth2::{HttpClientError, HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// Boxed future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of issuing provider API calls.
///
/// Implementations must be `Send + Sync + 'static` so one instance can be shared by every
/// provider and every in-flight verification. They perform exactly one request per call: no
/// retries, no redirects beyond the client's defaults, and no timeout other than the client's
/// own. Non-2xx responses are returned as responses, not errors; the caller classifies them.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and returns the full (possibly truncated) response.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// Reqwest-backed [`ApiHttpClient`] with a bounded body reader.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	max_body_bytes: usize,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Upper bound on bytes read from a single response body.
	pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES }
	}

	/// Overrides the body read limit. Bytes past the limit are discarded.
	pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
		self.max_body_bytes = limit;

		self
	}

	/// Process-wide pooled client, created on first use.
	///
	/// Components still receive the client explicitly; this only avoids building one connection
	/// pool per provider.
	pub fn shared() -> Arc<Self> {
		static SHARED: OnceLock<Arc<ReqwestHttpClient>> = OnceLock::new();

		SHARED.get_or_init(|| Arc::new(Self::default())).clone()
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::with_client(ReqwestClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.client.clone();
		let limit = self.max_body_bytes;

		Box::pin(async move {
			let request: reqwest::Request = request.try_into().map_err(redact)?;
			let mut response = client.execute(request).await.map_err(redact)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = read_bounded(&mut response, limit).await.map_err(redact)?;
			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

// Request URLs may carry the access token as a query parameter.
#[cfg(feature = "reqwest")]
fn redact(err: ReqwestError) -> Box<ReqwestError> {
	Box::new(err.without_url())
}

#[cfg(feature = "reqwest")]
async fn read_bounded(
	response: &mut reqwest::Response,
	limit: usize,
) -> Result<Vec<u8>, ReqwestError> {
	let mut body = Vec::new();

	while let Some(chunk) = response.chunk().await? {
		let remaining = limit.saturating_sub(body.len());

		if chunk.len() >= remaining {
			body.extend_from_slice(&chunk[..remaining]);

			break;
		}

		body.extend_from_slice(&chunk);
	}

	Ok(body)
}
