//! Authenticated GET calls against a provider's REST API.
//!
//! [`EndpointClient`] joins an endpoint path onto the provider's validation base URL, attaches the
//! access token the way the provider expects ([`CredentialPlacement`]), performs exactly one
//! request, and classifies the outcome:
//!
//! - transport failure → [`Error::Transport`]
//! - any status other than 200 → [`Error::UpstreamStatus`] with a bounded body preview
//! - a 200 body that does not decode → [`Error::Decode`]
//!
//! Decoded values come back together with the response headers, which the scope probe reads.

// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue, Method, Request, StatusCode,
	header::{ACCEPT, AUTHORIZATION},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, TransportError},
	http::{ApiHttpClient, HttpClientError, HttpResponse},
	obs,
};

/// Query parameter carrying the token for [`CredentialPlacement::QueryParameter`].
pub const TOKEN_QUERY_PARAMETER: &str = "token";

const BODY_PREVIEW_LIMIT: usize = 256;

/// How a provider expects the bearer credential on API calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPlacement {
	/// `?token=<access_token>` query parameter.
	#[default]
	QueryParameter,
	/// `Authorization: Bearer <access_token>` header.
	BearerHeader,
}

/// Successfully decoded response plus the headers it arrived with.
#[derive(Clone, Debug)]
pub struct Decoded<T> {
	/// Decoded body.
	pub value: T,
	/// Raw response headers.
	pub headers: HeaderMap,
}

/// Issues authenticated GET requests relative to a provider's validation URL.
pub struct EndpointClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	base_url: Url,
	placement: CredentialPlacement,
}
impl<C> EndpointClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client rooted at `base_url`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		base_url: Url,
		placement: CredentialPlacement,
	) -> Self {
		Self { http_client: http_client.into(), base_url, placement }
	}

	/// Validation base URL every endpoint is joined onto.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Credential placement used for every call.
	pub fn placement(&self) -> CredentialPlacement {
		self.placement
	}

	/// Builds the endpoint URL carrying `params`, without any credential.
	///
	/// `endpoint` is appended segment by segment to the base path, so `"/users.identity"` and
	/// `"users.identity"` resolve identically and trailing slashes on the base are ignored.
	pub fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
		let invalid = || ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned() };
		let segments =
			endpoint.split('/').filter(|segment| !segment.is_empty()).collect::<Vec<_>>();

		if segments.is_empty() || segments.iter().any(|segment| matches!(*segment, "." | "..")) {
			return Err(invalid().into());
		}

		let mut url = self.base_url.clone();

		url.set_query(None);
		url.set_fragment(None);
		url.path_segments_mut().map_err(|_| invalid())?.pop_if_empty().extend(segments);

		if !params.is_empty() {
			url.query_pairs_mut().extend_pairs(params);
		}

		Ok(url)
	}

	/// Calls `endpoint` and decodes the 200 response body into `T`.
	pub async fn call<T>(
		&self,
		endpoint: &str,
		token: &AccessToken,
		params: &[(&str, &str)],
	) -> Result<Decoded<T>>
	where
		T: DeserializeOwned,
	{
		let response = self.send(endpoint, token, params).await?;
		let value = {
			let mut deserializer = serde_json::Deserializer::from_slice(response.body());

			serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| Error::Decode { endpoint: endpoint.to_owned(), source })?
		};
		let (parts, _) = response.into_parts();

		Ok(Decoded { value, headers: parts.headers })
	}

	/// Calls `endpoint` and returns the raw response once its status is known to be 200.
	pub async fn send(
		&self,
		endpoint: &str,
		token: &AccessToken,
		params: &[(&str, &str)],
	) -> Result<HttpResponse> {
		let request = self.build_request(endpoint, token, params)?;
		let response = self.http_client.execute(request).await.map_err(map_transport_error)?;
		let status = response.status();

		obs::trace_upstream_response(endpoint, status.as_u16());

		if status != StatusCode::OK {
			return Err(Error::UpstreamStatus {
				endpoint: endpoint.to_owned(),
				status: status.as_u16(),
				body: body_preview(response.body()),
			});
		}

		Ok(response)
	}

	fn build_request(
		&self,
		endpoint: &str,
		token: &AccessToken,
		params: &[(&str, &str)],
	) -> Result<Request<Vec<u8>>> {
		let mut builder =
			Request::builder().method(Method::GET).header(ACCEPT, "application/json");
		let url = match self.placement {
			CredentialPlacement::QueryParameter => {
				let mut with_token = params.to_vec();

				with_token.push((TOKEN_QUERY_PARAMETER, token.expose()));

				self.endpoint_url(endpoint, &with_token)?
			},
			CredentialPlacement::BearerHeader => {
				let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
					.map_err(|_| ConfigError::InvalidTokenHeader)?;

				value.set_sensitive(true);
				builder = builder.header(AUTHORIZATION, value);

				self.endpoint_url(endpoint, params)?
			},
		};

		builder.uri(url.as_str()).body(Vec::new()).map_err(|e| ConfigError::from(e).into())
	}
}
impl<C> Clone for EndpointClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			base_url: self.base_url.clone(),
			placement: self.placement,
		}
	}
}
impl<C> Debug for EndpointClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointClient")
			.field("base_url", &self.base_url.as_str())
			.field("placement", &self.placement)
			.finish()
	}
}

fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unrecognized HTTP client failure".into() }.into(),
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
