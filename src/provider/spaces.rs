//! Spaces provider: bearer-authenticated REST API with space membership as the group dimension.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	endpoint::{CredentialPlacement, EndpointClient},
	error::ConfigError,
	escalation::{self, ScopeDetection},
	http::ApiHttpClient,
	identity::{GroupList, GroupRecord, IdentityEnvelope, UserRecord},
	policy::PolicyConstraint,
	provider::{
		IdentityProvider, ProviderConfig, ProviderConfigError, ProviderDefaults, ProviderFuture,
		ProviderSettings,
	},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Profile endpoint returning `{id, email}`.
pub const SPACES_PROFILE_ENDPOINT: &str = "users/me/profile";
/// Collection prefix for space lookups (`spaces/{id}`).
pub const SPACES_SPACE_ENDPOINT: &str = "spaces";
/// Scope required to look up spaces.
pub const SPACES_GROUP_READ_SCOPE: &str = "spaces:read";
/// Built-in Spaces endpoints and scope.
pub const SPACES_DEFAULTS: ProviderDefaults = ProviderDefaults {
	login_url: "https://signup.spaces.de/o/oauth2/auth",
	redeem_url: "https://signup.spaces.de/o/oauth2/token",
	validate_url: "https://api.spaces.de/v1",
	scope: "profile:read spaces:read",
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Profile {
	#[serde(alias = "ID")]
	id: String,
	#[serde(alias = "EMail")]
	email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Space {
	#[serde(alias = "ID")]
	id: String,
	name: String,
}

/// Spaces provider.
///
/// Spaces has no team concept, so a team constraint is rejected at construction. The group
/// constraint names a space; membership holds when `spaces/{id}` answers 200 with that ID.
pub struct SpacesProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	config: ProviderConfig,
	policy: PolicyConstraint,
	group_read_scope: ScopeSet,
	detection: ScopeDetection,
	endpoints: EndpointClient<C>,
}
impl<C> SpacesProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Provider label.
	pub const NAME: &'static str = "spaces";

	/// Resolves `settings` against [`SPACES_DEFAULTS`] and binds the provider to `http_client`.
	pub fn new(settings: &ProviderSettings, http_client: impl Into<Arc<C>>) -> Result<Self> {
		if settings.policy.team_id().is_some() {
			return Err(ConfigError::from(ProviderConfigError::UnsupportedConstraint {
				provider: Self::NAME,
				constraint: "team_id",
			})
			.into());
		}

		let config = settings.resolve(&SPACES_DEFAULTS).map_err(ConfigError::from)?;
		let endpoints = EndpointClient::new(
			http_client,
			config.validate_url.clone(),
			CredentialPlacement::BearerHeader,
		);

		Ok(Self {
			config,
			policy: settings.policy.clone(),
			group_read_scope: ScopeSet::parse_list(SPACES_GROUP_READ_SCOPE),
			detection: ScopeDetection::ConfiguredScope,
			endpoints,
		})
	}

	/// Endpoint client bound to the validation URL.
	pub fn endpoints(&self) -> &EndpointClient<C> {
		&self.endpoints
	}
}
#[cfg(feature = "reqwest")]
impl SpacesProvider<ReqwestHttpClient> {
	/// Builds the provider on the process-wide pooled reqwest client.
	pub fn with_shared_client(settings: &ProviderSettings) -> Result<Self> {
		Self::new(settings, ReqwestHttpClient::shared())
	}
}
impl<C> IdentityProvider for SpacesProvider<C>
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

	fn escalation_scope(&self) -> Option<ScopeSet> {
		Some(self.config.scope.union(&self.group_read_scope))
	}

	fn resolve_identity<'a>(
		&'a self,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, IdentityEnvelope> {
		Box::pin(async move {
			let profile =
				self.endpoints.call::<Profile>(SPACES_PROFILE_ENDPOINT, token, &[]).await?.value;

			Ok(IdentityEnvelope {
				ok: true,
				user: UserRecord { id: profile.id, name: String::new(), email: profile.email },
				..Default::default()
			})
		})
	}

	fn resolve_groups<'a>(&'a self, token: &'a AccessToken) -> ProviderFuture<'a, GroupList> {
		Box::pin(async move {
			let Some(space_id) = self.policy.group_id() else {
				return Ok(GroupList { ok: true, ..Default::default() });
			};
			let endpoint = format!("{SPACES_SPACE_ENDPOINT}/{space_id}");
			let space = self.endpoints.call::<Space>(&endpoint, token, &[]).await?.value;
			let groups = if space.id == space_id {
				vec![GroupRecord { id: space.id, name: space.name }]
			} else {
				Vec::new()
			};

			Ok(GroupList { ok: true, groups, error: None })
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
}
impl<C> Debug for SpacesProvider<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SpacesProvider")
			.field("config", &self.config)
			.field("policy", &self.policy)
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{HttpClientError, HttpFuture, HttpRequest};

	#[derive(Debug, ThisError)]
	#[error("Offline.")]
	struct Offline;

	struct OfflineClient;
	impl ApiHttpClient for OfflineClient {
		type TransportError = Offline;

		fn execute(&self, _request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
			Box::pin(async { Err(HttpClientError::Reqwest(Box::new(Offline))) })
		}
	}

	fn provider() -> SpacesProvider<OfflineClient> {
		SpacesProvider::new(&ProviderSettings::new("client-1"), OfflineClient)
			.expect("Spaces provider should build from defaults.")
	}

	#[test]
	fn team_constraints_are_rejected() {
		let settings = ProviderSettings::new("client-1")
			.with_policy(PolicyConstraint::default().with_team_id("T1"));
		let err = SpacesProvider::<OfflineClient>::new(&settings, OfflineClient)
			.expect_err("Spaces cannot enforce a team constraint.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::Provider(ProviderConfigError::UnsupportedConstraint {
				constraint: "team_id",
				..
			}))
		));
	}

	#[test]
	fn retry_scope_keeps_profile_access() {
		let settings =
			ProviderSettings { scope: Some("profile:read".into()), ..ProviderSettings::new("c") };
		let spaces = SpacesProvider::<OfflineClient>::new(&settings, OfflineClient)
			.expect("Spaces provider should build with a narrowed scope.");
		let retry = spaces.escalation_scope().expect("Spaces defines a retry scope.");

		assert!(retry.contains("profile:read"));
		assert!(retry.contains(SPACES_GROUP_READ_SCOPE));
	}

	#[tokio::test]
	async fn configured_scope_is_reported_as_granted() {
		let spaces = provider();
		let token = AccessToken::new("spaces-token");
		let granted = spaces
			.granted_scopes(&token)
			.await
			.expect("Configured scope detection should not touch the network.");

		assert_eq!(spaces.endpoints().placement(), CredentialPlacement::BearerHeader);
		assert_eq!(spaces.endpoints().base_url().as_str(), "https://api.spaces.de/v1");
		assert!(granted.contains(SPACES_GROUP_READ_SCOPE));
	}

	#[tokio::test]
	async fn unconstrained_group_lookup_skips_the_network() {
		let spaces = provider();
		let groups = spaces
			.resolve_groups(&AccessToken::new("spaces-token"))
			.await
			.expect("No space constraint means no lookup.");

		assert!(groups.groups.is_empty());
	}
}
