//! Slack workspace provider.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	endpoint::{CredentialPlacement, EndpointClient},
	error::ConfigError,
	escalation::{self, ScopeDetection},
	http::ApiHttpClient,
	identity::{self, GroupList, IdentityEnvelope},
	policy::PolicyConstraint,
	provider::{
		IdentityProvider, ProviderConfig, ProviderDefaults, ProviderFuture, ProviderSettings,
		build_login_url,
	},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Identity endpoint returning `{ok, user, team}`.
pub const SLACK_IDENTITY_ENDPOINT: &str = "users.identity";
/// Private channel listing used for group membership.
pub const SLACK_GROUPS_ENDPOINT: &str = "groups.list";
/// Auth check whose response headers list the granted scopes.
pub const SLACK_AUTH_TEST_ENDPOINT: &str = "auth.test";
/// Response header carrying granted scopes.
pub const SLACK_SCOPES_HEADER: &str = "x-oauth-scopes";
/// Scope required to list private channels.
pub const SLACK_GROUP_READ_SCOPE: &str = "groups:read";
/// Built-in Slack endpoints and scope.
pub const SLACK_DEFAULTS: ProviderDefaults = ProviderDefaults {
	login_url: "https://slack.com/oauth/authorize",
	redeem_url: "https://slack.com/api/oauth.access",
	validate_url: "https://slack.com/api",
	scope: "identity.basic identity.email",
};

const GROUP_LIST_PARAMS: [(&str, &str); 2] =
	[("exclude_archived", "true"), ("exclude_members", "true")];

/// Slack "Sign in with Slack" provider.
///
/// A team constraint is also sent to Slack as the login URL's `team` parameter so the consent
/// screen is pinned to that workspace.
pub struct SlackProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	config: ProviderConfig,
	policy: PolicyConstraint,
	group_read_scope: ScopeSet,
	detection: ScopeDetection,
	endpoints: EndpointClient<C>,
}
impl<C> SlackProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Provider label.
	pub const NAME: &'static str = "slack";

	/// Resolves `settings` against [`SLACK_DEFAULTS`] and binds the provider to `http_client`.
	pub fn new(settings: &ProviderSettings, http_client: impl Into<Arc<C>>) -> Result<Self> {
		let config = settings.resolve(&SLACK_DEFAULTS).map_err(ConfigError::from)?;
		let endpoints = EndpointClient::new(
			http_client,
			config.validate_url.clone(),
			CredentialPlacement::QueryParameter,
		);

		Ok(Self {
			config,
			policy: settings.policy.clone(),
			group_read_scope: ScopeSet::parse_list(SLACK_GROUP_READ_SCOPE),
			detection: ScopeDetection::ResponseHeader {
				endpoint: SLACK_AUTH_TEST_ENDPOINT,
				header: SLACK_SCOPES_HEADER,
			},
			endpoints,
		})
	}

	/// Endpoint client bound to the validation URL.
	pub fn endpoints(&self) -> &EndpointClient<C> {
		&self.endpoints
	}
}
#[cfg(feature = "reqwest")]
impl SlackProvider<ReqwestHttpClient> {
	/// Builds the provider on the process-wide pooled reqwest client.
	pub fn with_shared_client(settings: &ProviderSettings) -> Result<Self> {
		Self::new(settings, ReqwestHttpClient::shared())
	}
}
impl<C> IdentityProvider for SlackProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn name(&self) -> &'static str {
		Self::NAME
	}

	fn config(&self) -> &ProviderConfig {
		&self.config
	}

	fn policy(&self) -> &PolicyConstraint {
		&self.policy
	}

	fn group_read_scope(&self) -> Option<&ScopeSet> {
		Some(&self.group_read_scope)
	}

	fn resolve_identity<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, IdentityEnvelope> {
		Box::pin(async move {
			let decoded =
				self.endpoints.call::<IdentityEnvelope>(SLACK_IDENTITY_ENDPOINT, token, &[]).await?;

			identity::ensure_ok(SLACK_IDENTITY_ENDPOINT, decoded.value)
		})
	}

	fn resolve_groups<'a>(&'a self, token: &'a AccessToken) -> ProviderFuture<'a, GroupList> {
		Box::pin(async move {
			let decoded = self
				.endpoints
				.call::<GroupList>(SLACK_GROUPS_ENDPOINT, token, &GROUP_LIST_PARAMS)
				.await?;

			identity::ensure_ok(SLACK_GROUPS_ENDPOINT, decoded.value)
		})
	}

	fn granted_scopes<'a>(&'a self, token: &'a AccessToken) -> ProviderFuture<'a, ScopeSet> {
		Box::pin(escalation::detect_granted_scopes(
			&self.endpoints,
			&self.detection,
			&self.config.scope,
			token,
		))
	}

	fn login_url(&self, redirect_uri: &Url, scope: &ScopeSet, state: &str) -> Url {
		match self.policy.team_id() {
			Some(team_id) =>
				build_login_url(&self.config, redirect_uri, scope, state, &[("team", team_id)]),
			None => build_login_url(&self.config, redirect_uri, scope, state, &[]),
		}
	}
}
impl<C> Debug for SlackProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SlackProvider")
			.field("config", &self.config)
			.field("policy", &self.policy)
			.field("endpoints", &self.endpoints)
			.finish()
	}
}
