//! Per-login scope escalation.
//!
//! Some providers only grant group-read access when asked for it on its own. A
//! [`LoginSequence`] starts with the provider's base scope, checks what was granted once a token
//! arrives, and asks for the group-read scope at most once. Every sequence belongs to exactly one
//! end-user login; nothing here is shared between users.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	endpoint::EndpointClient,
	http::ApiHttpClient,
	identity::{self, Envelope},
	obs,
};

const STATE_LEN: usize = 32;

/// Progress of a single login sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EscalationState {
	/// Login URL requests the base scope.
	Initial,
	/// A token arrived; its granted scopes have not been checked yet.
	AwaitingScopeCheck,
	/// A retry login requesting the group-read scope was issued.
	Escalated,
	/// No further login is required.
	Satisfied,
}
impl EscalationState {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			EscalationState::Initial => "initial",
			EscalationState::AwaitingScopeCheck => "awaiting_scope_check",
			EscalationState::Escalated => "escalated",
			EscalationState::Satisfied => "satisfied",
		}
	}
}
impl Display for EscalationState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome of [`LoginSequence::attempt_upgrade`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeDecision {
	/// The current token is sufficient.
	NoRetryNeeded,
	/// Send the user through login again requesting these scopes.
	RetryWith(ScopeSet),
}
impl UpgradeDecision {
	/// Returns true when another login round is required.
	pub fn retry_needed(&self) -> bool {
		matches!(self, Self::RetryWith(_))
	}
}

/// How a provider reports the scopes actually granted to a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeDetection {
	/// GET `endpoint` and read the comma or space separated scope list from `header`.
	ResponseHeader {
		/// Lightweight auth-check endpoint, relative to the validation URL.
		endpoint: &'static str,
		/// Response header listing granted scopes.
		header: &'static str,
	},
	/// Treat the locally configured scope as granted.
	ConfiguredScope,
}

/// Resolves the scopes granted to `token` using the provider's detection strategy.
pub async fn detect_granted_scopes<C>(
	endpoints: &EndpointClient<C>,
	detection: &ScopeDetection,
	configured: &ScopeSet,
	token: &AccessToken,
) -> Result<ScopeSet>
where
	C: ?Sized + ApiHttpClient,
{
	match detection {
		ScopeDetection::ConfiguredScope => Ok(configured.clone()),
		ScopeDetection::ResponseHeader { endpoint, header } => {
			let decoded = endpoints.call::<ProbeEnvelope>(endpoint, token, &[]).await?;

			identity::ensure_ok(endpoint, decoded.value)?;

			let listed = decoded
				.headers
				.get_all(*header)
				.iter()
				.filter_map(|value| value.to_str().ok())
				.collect::<Vec<_>>()
				.join(",");

			Ok(ScopeSet::parse_list(&listed))
		},
	}
}

/// Scope escalation state for one end-user login.
#[derive(Clone)]
pub struct LoginSequence {
	state: EscalationState,
	base_scope: ScopeSet,
	group_read_scope: Option<ScopeSet>,
	retry_scope: Option<ScopeSet>,
	group_constrained: bool,
	csrf_state: String,
}
impl LoginSequence {
	/// Starts a sequence requesting `base_scope`.
	///
	/// Escalation is only possible when the policy constrains groups and the provider defines a
	/// group-read scope. The retry login requests the group-read scope alone unless
	/// [`LoginSequence::with_retry_scope`] says otherwise.
	pub fn new(
		base_scope: ScopeSet,
		group_read_scope: Option<ScopeSet>,
		group_constrained: bool,
	) -> Self {
		Self {
			state: EscalationState::Initial,
			base_scope,
			retry_scope: group_read_scope.clone(),
			group_read_scope,
			group_constrained,
			csrf_state: random_string(STATE_LEN),
		}
	}

	/// Overrides the scope requested by the retry login.
	pub fn with_retry_scope(mut self, scope: ScopeSet) -> Self {
		self.retry_scope = Some(scope);

		self
	}

	/// Current state.
	pub fn state(&self) -> EscalationState {
		self.state
	}

	/// Anti-forgery value to send as the login URL's `state` parameter.
	pub fn csrf_state(&self) -> &str {
		&self.csrf_state
	}

	/// Scope the next login URL should request.
	pub fn login_scope(&self) -> &ScopeSet {
		match (&self.state, &self.retry_scope) {
			(EscalationState::Escalated, Some(retry)) => retry,
			_ => &self.base_scope,
		}
	}

	/// Returns true while a granted-scope check could still change the outcome.
	pub fn needs_scope_check(&self) -> bool {
		matches!(self.state, EscalationState::Initial | EscalationState::AwaitingScopeCheck)
			&& self.escalation_possible()
	}

	/// Validates the `state` parameter returned by the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.csrf_state { Ok(()) } else { Err(Error::StateMismatch) }
	}

	/// Records that the code exchange produced a token.
	pub fn token_received(&mut self) {
		if self.state == EscalationState::Initial {
			self.transition(EscalationState::AwaitingScopeCheck);
		}
	}

	/// Decides whether another login round is needed given the scopes granted so far.
	///
	/// At most one [`UpgradeDecision::RetryWith`] is ever returned per sequence.
	pub fn attempt_upgrade(&mut self, granted: &ScopeSet) -> UpgradeDecision {
		match self.state {
			EscalationState::Initial | EscalationState::AwaitingScopeCheck => {
				let satisfied = match &self.group_read_scope {
					Some(group_read) if self.group_constrained => granted.contains_all(group_read),
					_ => true,
				};

				if satisfied {
					self.transition(EscalationState::Satisfied);

					return UpgradeDecision::NoRetryNeeded;
				}

				self.transition(EscalationState::Escalated);
				self.csrf_state = random_string(STATE_LEN);

				UpgradeDecision::RetryWith(self.login_scope().clone())
			},
			EscalationState::Escalated => {
				self.transition(EscalationState::Satisfied);

				UpgradeDecision::NoRetryNeeded
			},
			EscalationState::Satisfied => UpgradeDecision::NoRetryNeeded,
		}
	}

	fn escalation_possible(&self) -> bool {
		self.group_constrained && self.group_read_scope.is_some()
	}

	fn transition(&mut self, to: EscalationState) {
		obs::trace_escalation(self.state.as_str(), to.as_str());

		self.state = to;
	}
}
impl Debug for LoginSequence {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginSequence")
			.field("state", &self.state)
			.field("base_scope", &self.base_scope)
			.field("group_read_scope", &self.group_read_scope)
			.field("retry_scope", &self.retry_scope)
			.field("group_constrained", &self.group_constrained)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProbeEnvelope {
	ok: bool,
	error: Option<String>,
}
impl Envelope for ProbeEnvelope {
	fn is_ok(&self) -> bool {
		self.ok
	}

	fn error_code(&self) -> Option<&str> {
		self.error.as_deref()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
