//! Verification façade used by the proxy.
//!
//! [`Gatekeeper::get_email_address`] is the single admission decision: it resolves the identity
//! behind a session's token, enforces the team constraint, then (only if that passed) the group
//! constraint, and yields the email. Every error means "deny".
//!
//! The login helpers drive a per-user [`LoginSequence`] through the provider's scope escalation.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SessionState},
	escalation::{LoginSequence, UpgradeDecision},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	policy,
	provider::IdentityProvider,
};

/// Shared, stateless verification entry point for one provider.
#[derive(Clone)]
pub struct Gatekeeper {
	provider: Arc<dyn IdentityProvider>,
}
impl Gatekeeper {
	/// Wraps a configured provider.
	pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
		Self { provider }
	}

	/// Provider this gatekeeper verifies against.
	pub fn provider(&self) -> &dyn IdentityProvider {
		self.provider.as_ref()
	}

	/// Resolves the session's email address, enforcing team then group policy.
	///
	/// The group listing is only requested when a group is configured and the team check passed.
	/// An empty email is returned as `Ok("")`; callers decide whether that admits the user.
	pub async fn get_email_address(&self, session: &SessionState) -> Result<String> {
		const KIND: FlowKind = FlowKind::Verification;

		let provider = self.provider.as_ref();
		let name = provider.name();
		let token = &session.access_token;
		let span = FlowSpan::new(KIND, "get_email_address", name, token);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let constraint = provider.policy();
				let identity = provider
					.resolve_identity(token)
					.await
					.inspect_err(|e| obs::trace_failure(name, "identity", e))?;

				policy::enforce_team(&identity, constraint).map_err(|denial| {
					obs::trace_policy_denial(name, &denial);

					Error::from(denial)
				})?;

				if constraint.group_id().is_some() {
					let groups = provider
						.resolve_groups(token)
						.await
						.inspect_err(|e| obs::trace_failure(name, "groups", e))?;

					policy::enforce_group(&groups, constraint).map_err(|denial| {
						obs::trace_policy_denial(name, &denial);

						Error::from(denial)
					})?;
				}

				let email = identity.user.email;

				if email.is_empty() {
					obs::trace_empty_email(name);
				}

				Ok(email)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Starts a login sequence requesting the provider's base scope.
	pub fn begin_login(&self) -> LoginSequence {
		let provider = self.provider.as_ref();
		let sequence = LoginSequence::new(
			provider.config().scope.clone(),
			provider.group_read_scope().cloned(),
			provider.policy().group_id().is_some(),
		);

		match provider.escalation_scope() {
			Some(scope) => sequence.with_retry_scope(scope),
			None => sequence,
		}
	}

	/// Authorization URL for the sequence's current scope and anti-forgery state.
	pub fn login_url(&self, sequence: &LoginSequence, redirect_uri: &Url) -> Url {
		self.provider.login_url(redirect_uri, sequence.login_scope(), sequence.csrf_state())
	}

	/// Records that `session` came back from a login and decides whether to escalate.
	///
	/// Granted scopes are only probed while the answer can change the outcome; a probe failure is
	/// returned as an error and leaves the sequence awaiting the check.
	pub async fn attempt_upgrade(
		&self,
		sequence: &mut LoginSequence,
		session: &SessionState,
	) -> Result<UpgradeDecision> {
		const KIND: FlowKind = FlowKind::ScopeUpgrade;

		sequence.token_received();

		if !sequence.needs_scope_check() {
			return Ok(sequence.attempt_upgrade(&ScopeSet::default()));
		}

		let provider = self.provider.as_ref();
		let name = provider.name();
		let token = &session.access_token;
		let span = FlowSpan::new(KIND, "attempt_upgrade", name, token);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				provider
					.granted_scopes(token)
					.await
					.inspect_err(|e| obs::trace_failure(name, "granted_scopes", e))
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		Ok(sequence.attempt_upgrade(&result?))
	}
}
impl Debug for Gatekeeper {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gatekeeper").field("provider", &self.provider.name()).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::AccessToken,
		identity::{GroupList, GroupRecord, IdentityEnvelope, TeamRecord, UserRecord},
		policy::{PolicyConstraint, PolicyDenial},
		provider::{ProviderConfig, ProviderDefaults, ProviderFuture, ProviderSettings},
	};

	const DEFAULTS: ProviderDefaults = ProviderDefaults {
		login_url: "https://provider.test/oauth/authorize",
		redeem_url: "https://provider.test/oauth/token",
		validate_url: "https://provider.test/api",
		scope: "identity.basic",
	};

	struct ScriptedProvider {
		config: ProviderConfig,
		policy: PolicyConstraint,
		group_read: ScopeSet,
		envelope: IdentityEnvelope,
		identity_status: Option<u16>,
		groups: Vec<&'static str>,
		granted: &'static str,
		group_calls: AtomicUsize,
		scope_calls: AtomicUsize,
	}
	impl ScriptedProvider {
		fn new(policy: PolicyConstraint, team_id: &str, email: &str) -> Self {
			Self {
				config: ProviderSettings::new("client-1")
					.resolve(&DEFAULTS)
					.expect("Scripted config should resolve."),
				policy,
				group_read: ScopeSet::parse_list("groups:read"),
				envelope: IdentityEnvelope {
					ok: true,
					user: UserRecord { id: "U1".into(), name: "alice".into(), email: email.into() },
					team: TeamRecord { id: team_id.into(), name: "Acme".into() },
					error: None,
				},
				identity_status: None,
				groups: Vec::new(),
				granted: "",
				group_calls: AtomicUsize::new(0),
				scope_calls: AtomicUsize::new(0),
			}
		}
	}
	impl IdentityProvider for ScriptedProvider {
		fn name(&self) -> &'static str {
			"scripted"
		}

		fn config(&self) -> &ProviderConfig {
			&self.config
		}

		fn policy(&self) -> &PolicyConstraint {
			&self.policy
		}

		fn group_read_scope(&self) -> Option<&ScopeSet> {
			Some(&self.group_read)
		}

		fn resolve_identity<'a>(
			&'a self,
			_token: &'a AccessToken,
		) -> ProviderFuture<'a, IdentityEnvelope> {
			Box::pin(async move {
				match self.identity_status {
					Some(status) => Err(Error::UpstreamStatus {
						endpoint: "users.identity".into(),
						status,
						body: String::new(),
					}),
					None => Ok(self.envelope.clone()),
				}
			})
		}

		fn resolve_groups<'a>(&'a self, _token: &'a AccessToken) -> ProviderFuture<'a, GroupList> {
			Box::pin(async move {
				self.group_calls.fetch_add(1, Ordering::SeqCst);

				Ok(GroupList {
					ok: true,
					groups: self
						.groups
						.iter()
						.map(|id| GroupRecord { id: (*id).into(), name: String::new() })
						.collect(),
					error: None,
				})
			})
		}

		fn granted_scopes<'a>(&'a self, _token: &'a AccessToken) -> ProviderFuture<'a, ScopeSet> {
			Box::pin(async move {
				self.scope_calls.fetch_add(1, Ordering::SeqCst);

				Ok(ScopeSet::parse_list(self.granted))
			})
		}
	}

	fn gatekeeper(provider: ScriptedProvider) -> (Gatekeeper, Arc<ScriptedProvider>) {
		let provider = Arc::new(provider);

		(Gatekeeper::new(provider.clone()), provider)
	}

	#[tokio::test]
	async fn team_mismatch_skips_group_lookup() {
		let policy = PolicyConstraint::default().with_team_id("T2").with_group_id("G1");
		let (gatekeeper, provider) =
			gatekeeper(ScriptedProvider::new(policy, "T1", "alice@example.com"));
		let err = gatekeeper
			.get_email_address(&SessionState::new("xoxp-1"))
			.await
			.expect_err("Team mismatch should deny.");

		assert!(matches!(err, Error::PolicyDenied(PolicyDenial::TeamMismatch { .. })));
		assert_eq!(provider.group_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn group_membership_admits_user() {
		let policy = PolicyConstraint::default().with_team_id("T1").with_group_id("G9");
		let mut scripted = ScriptedProvider::new(policy, "T1", "alice@example.com");

		scripted.groups = vec!["G1", "G9"];

		let (gatekeeper, provider) = gatekeeper(scripted);
		let email = gatekeeper
			.get_email_address(&SessionState::new("xoxp-1"))
			.await
			.expect("Member of the configured group should be admitted.");

		assert_eq!(email, "alice@example.com");
		assert_eq!(provider.group_calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn identity_failure_is_returned_not_swallowed() {
		let mut scripted =
			ScriptedProvider::new(PolicyConstraint::unconstrained(), "T1", "alice@example.com");

		scripted.identity_status = Some(500);

		let (gatekeeper, _) = gatekeeper(scripted);
		let err = gatekeeper
			.get_email_address(&SessionState::new("xoxp-1"))
			.await
			.expect_err("Identity failures should deny.");

		assert!(matches!(err, Error::UpstreamStatus { status: 500, .. }));
	}

	#[tokio::test]
	async fn empty_email_is_success_with_empty_value() {
		let (gatekeeper, _) =
			gatekeeper(ScriptedProvider::new(PolicyConstraint::unconstrained(), "T1", ""));
		let email = gatekeeper
			.get_email_address(&SessionState::new("xoxp-1"))
			.await
			.expect("Empty email should not be an error.");

		assert!(email.is_empty());
	}

	#[tokio::test]
	async fn upgrade_probes_only_when_constrained() {
		let (open, provider) = gatekeeper(ScriptedProvider::new(
			PolicyConstraint::unconstrained(),
			"T1",
			"alice@example.com",
		));
		let mut sequence = open.begin_login();
		let decision = open
			.attempt_upgrade(&mut sequence, &SessionState::new("xoxp-1"))
			.await
			.expect("Unconstrained upgrade should not fail.");

		assert_eq!(decision, UpgradeDecision::NoRetryNeeded);
		assert_eq!(provider.scope_calls.load(Ordering::SeqCst), 0);

		let (constrained, provider) = gatekeeper(ScriptedProvider::new(
			PolicyConstraint::default().with_group_id("G1"),
			"T1",
			"alice@example.com",
		));
		let mut sequence = constrained.begin_login();
		let session = SessionState::new("xoxp-1");
		let decision = constrained
			.attempt_upgrade(&mut sequence, &session)
			.await
			.expect("Scope probe should succeed.");

		assert_eq!(decision, UpgradeDecision::RetryWith(ScopeSet::parse_list("groups:read")));

		let redirect = Url::parse("https://proxy.test/cb").expect("Redirect fixture should parse.");
		let retry_url = constrained.login_url(&sequence, &redirect);

		assert!(
			retry_url.query_pairs().any(|(key, value)| key == "scope" && value == "groups:read")
		);

		let decision = constrained
			.attempt_upgrade(&mut sequence, &session)
			.await
			.expect("Escalated sequence should settle without probing.");

		assert_eq!(decision, UpgradeDecision::NoRetryNeeded);
		assert_eq!(provider.scope_calls.load(Ordering::SeqCst), 1);
	}
}
