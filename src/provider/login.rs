//! Authorization URL construction.

// self
use crate::{_prelude::*, auth::ScopeSet, provider::ProviderConfig};

/// Builds the authorization URL a user is redirected to.
///
/// Query parameters already present on the configured login URL are kept; `extra` pairs are
/// appended last. `scope` is rendered in its normalized (sorted, space-delimited) form, so the
/// order an operator listed scopes in is not preserved.
pub fn build_login_url(
	config: &ProviderConfig,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
	extra: &[(&str, &str)],
) -> Url {
	let mut url = config.login_url.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if !scope.is_empty() {
		pairs.append_pair("scope", &scope.normalized());
	}

	pairs.append_pair("state", state);
	pairs.append_pair("approval_prompt", &config.approval_prompt);
	pairs.extend_pairs(extra);

	drop(pairs);

	url
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;
	use crate::provider::{ProviderDefaults, ProviderSettings};

	const DEFAULTS: ProviderDefaults = ProviderDefaults {
		login_url: "https://provider.test/oauth/authorize?audience=proxy",
		redeem_url: "https://provider.test/oauth/token",
		validate_url: "https://provider.test/api",
		scope: "identity.basic identity.email",
	};

	#[test]
	fn login_url_carries_every_parameter() {
		let config = ProviderSettings::new("client-1")
			.resolve(&DEFAULTS)
			.expect("Defaults should produce a valid config.");
		let redirect = Url::parse("https://proxy.test/oauth2/callback")
			.expect("Redirect fixture should parse.");
		let url = build_login_url(&config, &redirect, &config.scope, "abc123", &[("team", "T1")]);
		let query = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(url.path(), "/oauth/authorize");
		assert_eq!(query["audience"], "proxy");
		assert_eq!(query["response_type"], "code");
		assert_eq!(query["client_id"], "client-1");
		assert_eq!(query["redirect_uri"], "https://proxy.test/oauth2/callback");
		assert_eq!(query["scope"], "identity.basic identity.email");
		assert_eq!(query["state"], "abc123");
		assert_eq!(query["approval_prompt"], "force");
		assert_eq!(query["team"], "T1");
	}

	#[test]
	fn scope_parameter_is_sorted() {
		let config = ProviderSettings {
			scope: Some("users:read identity.email".into()),
			..ProviderSettings::new("client-1")
		}
		.resolve(&DEFAULTS)
		.expect("Scope override should be valid.");
		let redirect = Url::parse("https://proxy.test/cb").expect("Redirect fixture should parse.");
		let url = build_login_url(&config, &redirect, &config.scope, "s", &[]);
		let query = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(query["scope"], "identity.email users:read");
	}
}
