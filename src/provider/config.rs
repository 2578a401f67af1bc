//! Operator settings, built-in defaults, and the validated configuration they resolve into.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ScopeValidationError},
	policy::PolicyConstraint,
};

/// `approval_prompt` value used when the operator does not set one.
pub const DEFAULT_APPROVAL_PROMPT: &str = "force";

/// Errors raised while resolving provider settings.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderConfigError {
	/// The OAuth client identifier is required to build login URLs.
	#[error("Missing client ID.")]
	MissingClientId,
	/// Endpoints must be absolute http(s) URLs.
	#[error("The {endpoint} URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A built-in default URL failed to parse.
	#[error("The default {endpoint} URL is invalid.")]
	InvalidDefault {
		/// Which endpoint default failed to parse.
		endpoint: &'static str,
	},
	/// The resolved scope is empty.
	#[error("Scope must name at least one permission.")]
	EmptyScope,
	/// The operator-supplied scope contains a malformed entry.
	#[error("The configured scope is invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// The provider cannot enforce the requested constraint.
	#[error("The {provider} provider does not support a {constraint} constraint.")]
	UnsupportedConstraint {
		/// Provider name.
		provider: &'static str,
		/// Constraint field that was set.
		constraint: &'static str,
	},
}

/// Built-in values a provider falls back to for unset settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderDefaults {
	/// Authorization endpoint.
	pub login_url: &'static str,
	/// Code exchange endpoint.
	pub redeem_url: &'static str,
	/// Base URL for identity and group API calls.
	pub validate_url: &'static str,
	/// Space-delimited default scope.
	pub scope: &'static str,
}

/// Operator-supplied provider settings. Every field is optional; empty values fall back to the
/// provider's defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
	/// OAuth client identifier.
	pub client_id: String,
	/// Authorization endpoint override.
	pub login_url: Option<Url>,
	/// Code exchange endpoint override.
	pub redeem_url: Option<Url>,
	/// API base URL override.
	pub validate_url: Option<Url>,
	/// Space-delimited scope override.
	pub scope: Option<String>,
	/// `approval_prompt` override.
	pub approval_prompt: Option<String>,
	/// Team and group restrictions.
	#[serde(flatten)]
	pub policy: PolicyConstraint,
}
impl ProviderSettings {
	/// Creates settings for `client_id` with everything else defaulted.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), ..Default::default() }
	}

	/// Points every endpoint at `base`.
	///
	/// Login and redeem URLs then share the API base, which only suits mock servers and
	/// single-host test doubles. Real deployments set each endpoint explicitly.
	pub fn with_base_url(mut self, base: &Url) -> Self {
		self.login_url = Some(base.clone());
		self.redeem_url = Some(base.clone());
		self.validate_url = Some(base.clone());

		self
	}

	/// Replaces the policy constraint.
	pub fn with_policy(mut self, policy: PolicyConstraint) -> Self {
		self.policy = policy;

		self
	}

	/// Resolves the settings against `defaults`.
	pub fn resolve(
		&self,
		defaults: &ProviderDefaults,
	) -> Result<ProviderConfig, ProviderConfigError> {
		let mut builder = ProviderConfig::builder(self.client_id.clone());

		if let Some(url) = &self.login_url {
			builder = builder.login_url(url.clone());
		}
		if let Some(url) = &self.redeem_url {
			builder = builder.redeem_url(url.clone());
		}
		if let Some(url) = &self.validate_url {
			builder = builder.validate_url(url.clone());
		}
		if let Some(scope) = self.scope.as_deref().filter(|scope| !scope.trim().is_empty()) {
			builder = builder.scope(ScopeSet::from_str(scope)?);
		}
		if let Some(prompt) = self.approval_prompt.as_deref().filter(|prompt| !prompt.is_empty())
		{
			builder = builder.approval_prompt(prompt);
		}

		builder.build(defaults)
	}
}

/// Immutable, validated provider configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// Authorization endpoint.
	pub login_url: Url,
	/// Code exchange endpoint, used by the proxy's own token redemption.
	pub redeem_url: Url,
	/// Base URL for API calls.
	pub validate_url: Url,
	/// Base scope requested on the first login.
	pub scope: ScopeSet,
	/// `approval_prompt` sent on every login URL.
	pub approval_prompt: String,
}
impl ProviderConfig {
	/// Creates a new builder for `client_id`.
	pub fn builder(client_id: impl Into<String>) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(client_id)
	}
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	/// OAuth client identifier.
	pub client_id: String,
	/// Optional authorization endpoint.
	pub login_url: Option<Url>,
	/// Optional code exchange endpoint.
	pub redeem_url: Option<Url>,
	/// Optional API base URL.
	pub validate_url: Option<Url>,
	/// Optional base scope.
	pub scope: Option<ScopeSet>,
	/// Optional `approval_prompt`.
	pub approval_prompt: Option<String>,
}
impl ProviderConfigBuilder {
	/// Creates a new builder seeded with the client identifier.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			login_url: None,
			redeem_url: None,
			validate_url: None,
			scope: None,
			approval_prompt: None,
		}
	}

	/// Sets the authorization endpoint.
	pub fn login_url(mut self, url: Url) -> Self {
		self.login_url = Some(url);

		self
	}

	/// Sets the code exchange endpoint.
	pub fn redeem_url(mut self, url: Url) -> Self {
		self.redeem_url = Some(url);

		self
	}

	/// Sets the API base URL.
	pub fn validate_url(mut self, url: Url) -> Self {
		self.validate_url = Some(url);

		self
	}

	/// Sets the base scope.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Sets the `approval_prompt` value.
	pub fn approval_prompt(mut self, prompt: impl Into<String>) -> Self {
		self.approval_prompt = Some(prompt.into());

		self
	}

	/// Consumes the builder, filling gaps from `defaults`, and validates the result.
	pub fn build(self, defaults: &ProviderDefaults) -> Result<ProviderConfig, ProviderConfigError> {
		let config = ProviderConfig {
			client_id: self.client_id,
			login_url: or_default(self.login_url, "login", defaults.login_url)?,
			redeem_url: or_default(self.redeem_url, "redeem", defaults.redeem_url)?,
			validate_url: or_default(self.validate_url, "validate", defaults.validate_url)?,
			scope: self.scope.unwrap_or_else(|| ScopeSet::parse_list(defaults.scope)),
			approval_prompt: self
				.approval_prompt
				.unwrap_or_else(|| DEFAULT_APPROVAL_PROMPT.to_owned()),
		};

		config.validate()?;

		Ok(config)
	}
}

impl ProviderConfig {
	fn validate(&self) -> Result<(), ProviderConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ProviderConfigError::MissingClientId);
		}
		if self.scope.is_empty() {
			return Err(ProviderConfigError::EmptyScope);
		}

		validate_endpoint("login", &self.login_url)?;
		validate_endpoint("redeem", &self.redeem_url)?;
		validate_endpoint("validate", &self.validate_url)?;

		Ok(())
	}
}

fn or_default(
	url: Option<Url>,
	endpoint: &'static str,
	default: &'static str,
) -> Result<Url, ProviderConfigError> {
	match url {
		Some(url) => Ok(url),
		None => Url::parse(default).map_err(|_| ProviderConfigError::InvalidDefault { endpoint }),
	}
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(ProviderConfigError::UnsupportedScheme { endpoint, url: url.to_string() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DEFAULTS: ProviderDefaults = ProviderDefaults {
		login_url: "https://provider.test/oauth/authorize",
		redeem_url: "https://provider.test/oauth/token",
		validate_url: "https://provider.test/api",
		scope: "profile email",
	};

	#[test]
	fn unset_fields_fall_back_to_defaults() {
		let config = ProviderSettings::new("client-1")
			.resolve(&DEFAULTS)
			.expect("Defaults should produce a valid config.");

		assert_eq!(config.login_url.as_str(), DEFAULTS.login_url);
		assert_eq!(config.redeem_url.as_str(), DEFAULTS.redeem_url);
		assert_eq!(config.validate_url.as_str(), DEFAULTS.validate_url);
		assert_eq!(config.scope.normalized(), "email profile");
		assert_eq!(config.approval_prompt, DEFAULT_APPROVAL_PROMPT);
	}

	#[test]
	fn empty_overrides_are_ignored() {
		let settings = ProviderSettings {
			scope: Some("  ".into()),
			approval_prompt: Some(String::new()),
			..ProviderSettings::new("client-1")
		};
		let config = settings.resolve(&DEFAULTS).expect("Empty overrides should fall back.");

		assert_eq!(config.scope, ScopeSet::parse_list(DEFAULTS.scope));
		assert_eq!(config.approval_prompt, "force");
	}

	#[test]
	fn validation_rejects_bad_settings() {
		assert_eq!(
			ProviderSettings::default().resolve(&DEFAULTS),
			Err(ProviderConfigError::MissingClientId)
		);

		let ftp = Url::parse("ftp://provider.test/api").expect("Fixture URL should parse.");
		let err = ProviderConfig::builder("client-1")
			.validate_url(ftp)
			.build(&DEFAULTS)
			.expect_err("Non-http schemes should be rejected.");

		assert!(matches!(err, ProviderConfigError::UnsupportedScheme { endpoint: "validate", .. }));
	}

	#[test]
	fn base_url_overrides_every_endpoint() {
		let base = Url::parse("http://127.0.0.1:9000/api").expect("Fixture URL should parse.");
		let config = ProviderSettings::new("client-1")
			.with_base_url(&base)
			.resolve(&DEFAULTS)
			.expect("Mock base URL should be valid.");

		assert_eq!(config.login_url, base);
		assert_eq!(config.redeem_url, base);
		assert_eq!(config.validate_url, base);
	}

	#[test]
	fn comma_separated_scope_is_rejected() {
		let settings = ProviderSettings {
			scope: Some("profile:read,spaces:read".into()),
			..ProviderSettings::new("client-1")
		};
		let err = settings.resolve(&DEFAULTS).expect_err("Scopes are space-delimited.");

		assert!(matches!(
			err,
			ProviderConfigError::InvalidScope(ScopeValidationError::ContainsSeparator { .. })
		));

		let settings =
			ProviderSettings { scope: Some("spaces:read  profile:read".into()), ..settings };
		let config = settings.resolve(&DEFAULTS).expect("Repeated spaces should be tolerated.");

		assert_eq!(config.scope.len(), 2);
	}

	#[test]
	fn settings_deserialize_with_flattened_policy() {
		let settings: ProviderSettings = serde_json::from_str(
			r#"{"client_id":"c","validate_url":"http://127.0.0.1:9000/api","team_id":"T1"}"#,
		)
		.expect("Settings should deserialize.");

		assert_eq!(settings.policy.team_id(), Some("T1"));
		assert_eq!(settings.policy.group_id(), None);
		assert_eq!(
			settings.validate_url.as_ref().map(Url::as_str),
			Some("http://127.0.0.1:9000/api")
		);
	}
}
