//! Optional observability helpers for verification flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth2_gatekeeper.flow` with the `flow`, `stage`, and
//!   `provider` fields, plus audit events for policy denials and upstream failures. Access tokens
//!   are only ever recorded as [`AccessToken::fingerprint`](crate::auth::AccessToken::fingerprint).
//! - Enable `metrics` to increment the `oauth2_gatekeeper_flow_total` counter for every
//!   attempt/success/denial/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gatekeeper flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Email resolution with policy enforcement.
	Verification,
	/// Granted-scope probe and escalation decision.
	ScopeUpgrade,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Verification => "verification",
			FlowKind::ScopeUpgrade => "scope_upgrade",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a gatekeeper flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Identity resolved but policy refused it.
	Denied,
	/// Upstream, transport, or configuration failure.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Denied => "denied",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a flow result onto its terminal outcome.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(err) if err.is_policy_denial() => FlowOutcome::Denied,
			Err(_) => FlowOutcome::Failure,
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::policy::PolicyDenial;

	#[test]
	fn outcome_classifies_results() {
		let ok: Result<()> = Ok(());
		let denied: Result<()> = Err(
			PolicyDenial::GroupMissing { expected: "G1".into(), available: Vec::new() }.into(),
		);
		let failed: Result<()> = Err(Error::ProviderRejected {
			endpoint: "groups.list".into(),
			reason: None,
		});

		assert_eq!(FlowOutcome::of(&ok), FlowOutcome::Success);
		assert_eq!(FlowOutcome::of(&denied), FlowOutcome::Denied);
		assert_eq!(FlowOutcome::of(&failed), FlowOutcome::Failure);
	}
}
