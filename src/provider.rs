//! Identity providers and their configuration.
//!
//! [`IdentityProvider`] is the seam between the gatekeeper façade and a concrete provider's API.
//! Each implementation composes an [`EndpointClient`](crate::endpoint::EndpointClient) with a
//! validated [`ProviderConfig`] and an immutable [`PolicyConstraint`]; none of them holds mutable
//! state, so one instance serves every request.
//!
//! - [`SlackProvider`]: `token` query credential, `users.identity` + `groups.list`, granted scopes
//!   read from the `x-oauth-scopes` header of `auth.test`.
//! - [`SpacesProvider`]: bearer credential, `users/me/profile`, space membership via
//!   `spaces/{id}`, granted scopes taken from configuration.

pub mod config;
pub mod login;
pub mod slack;
pub mod spaces;

pub use config::*;
pub use login::*;
pub use slack::*;
pub use spaces::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	identity::{GroupList, IdentityEnvelope},
	policy::PolicyConstraint,
};

/// Boxed future returned by [`IdentityProvider`] calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Provider-specific identity, group, and scope lookups.
///
/// Every call performs at most one upstream request and never retries. Failures are returned as
/// [`Error`] values; the façade treats all of them as "deny".
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Stable provider label used in logs and metrics.
	fn name(&self) -> &'static str;

	/// Validated configuration.
	fn config(&self) -> &ProviderConfig;

	/// Team and group restrictions fixed at construction.
	fn policy(&self) -> &PolicyConstraint;

	/// Scope that grants group visibility, when the provider distinguishes one.
	fn group_read_scope(&self) -> Option<&ScopeSet>;

	/// Scope requested by the retry login after a token came back without group-read access.
	///
	/// Defaults to the group-read scope alone, for providers that grant one scope category per
	/// consent.
	fn escalation_scope(&self) -> Option<ScopeSet> {
		self.group_read_scope().cloned()
	}

	/// Fetches the identity behind `token`.
	fn resolve_identity<'a>(&'a self, token: &'a AccessToken)
	-> ProviderFuture<'a, IdentityEnvelope>;

	/// Fetches the groups visible to `token`, scoped to the configured group where the provider
	/// cannot list memberships.
	fn resolve_groups<'a>(&'a self, token: &'a AccessToken) -> ProviderFuture<'a, GroupList>;

	/// Determines which scopes `token` was actually granted.
	fn granted_scopes<'a>(&'a self, token: &'a AccessToken) -> ProviderFuture<'a, ScopeSet>;

	/// Builds the authorization URL requesting `scope`.
	fn login_url(&self, redirect_uri: &Url, scope: &ScopeSet, state: &str) -> Url {
		build_login_url(self.config(), redirect_uri, scope, state, &[])
	}
}
