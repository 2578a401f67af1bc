#![allow(dead_code)]

// std
use std::sync::{Arc, Mutex};
// crates.io
use httpmock::MockServer;
// self
use oauth2_gatekeeper::{
	gatekeeper::Gatekeeper,
	http::{ApiHttpClient, HttpFuture, HttpRequest, ReqwestHttpClient},
	policy::PolicyConstraint,
	provider::{ProviderSettings, SlackProvider, SpacesProvider},
	url::Url,
};

pub const CLIENT_ID: &str = "client-it";
pub const ACCESS_TOKEN: &str = "xoxp-it-token";
pub const API_PREFIX: &str = "/api";

/// Forwards to an inner transport while recording every request path.
pub struct CountingClient<C> {
	inner: C,
	paths: Mutex<Vec<String>>,
}
impl<C> CountingClient<C> {
	pub fn new(inner: C) -> Self {
		Self { inner, paths: Mutex::new(Vec::new()) }
	}

	pub fn paths(&self) -> Vec<String> {
		self.paths.lock().expect("Path log should not be poisoned.").clone()
	}

	pub fn calls_to(&self, endpoint: &str) -> usize {
		self.paths().iter().filter(|path| path.ends_with(endpoint)).count()
	}
}
impl<C> ApiHttpClient for CountingClient<C>
where
	C: ApiHttpClient,
{
	type TransportError = C::TransportError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		self.paths
			.lock()
			.expect("Path log should not be poisoned.")
			.push(request.uri().path().to_owned());

		self.inner.execute(request)
	}
}

pub type TestTransport = CountingClient<ReqwestHttpClient>;

pub fn api_base(server: &MockServer) -> Url {
	Url::parse(&server.url(API_PREFIX)).expect("Mock API base URL should parse successfully.")
}

pub fn api_path(endpoint: &str) -> String {
	format!("{API_PREFIX}/{endpoint}")
}

pub fn settings(server: &MockServer, policy: PolicyConstraint) -> ProviderSettings {
	ProviderSettings::new(CLIENT_ID).with_base_url(&api_base(server)).with_policy(policy)
}

pub fn slack_gatekeeper(
	server: &MockServer,
	policy: PolicyConstraint,
) -> (Gatekeeper, Arc<TestTransport>) {
	let transport = Arc::new(CountingClient::new(ReqwestHttpClient::default()));
	let provider = SlackProvider::<TestTransport>::new(&settings(server, policy), transport.clone())
		.expect("Slack provider should build against the mock server.");

	(Gatekeeper::new(Arc::new(provider)), transport)
}

pub fn spaces_gatekeeper(
	server: &MockServer,
	policy: PolicyConstraint,
) -> (Gatekeeper, Arc<TestTransport>) {
	spaces_gatekeeper_with(&settings(server, policy))
}

pub fn spaces_gatekeeper_with(settings: &ProviderSettings) -> (Gatekeeper, Arc<TestTransport>) {
	let transport = Arc::new(CountingClient::new(ReqwestHttpClient::default()));
	let provider = SpacesProvider::<TestTransport>::new(settings, transport.clone())
		.expect("Spaces provider should build against the mock server.");

	(Gatekeeper::new(Arc::new(provider)), transport)
}
