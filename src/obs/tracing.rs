// self
use crate::{_prelude::*, auth::AccessToken, obs::FlowKind, policy::PolicyDenial};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by gatekeeper flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the flow kind, stage, provider, and token fingerprint.
	pub fn new(kind: FlowKind, stage: &'static str, provider: &str, token: &AccessToken) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_gatekeeper.flow",
				flow = kind.as_str(),
				stage,
				provider,
				token = %token.fingerprint(),
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, provider, token);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for every provider response, successful or not.
pub fn trace_upstream_response(endpoint: &str, status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(endpoint, status, "Provider endpoint responded.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, status);
	}
}

/// Emits the audit record for a policy denial, including the mismatched identifiers.
pub fn trace_policy_denial(provider: &str, denial: &PolicyDenial) {
	#[cfg(feature = "tracing")]
	{
		match denial {
			PolicyDenial::TeamMismatch { expected, actual } => tracing::warn!(
				provider,
				expected_team = %expected,
				actual_team = %actual,
				"Team ID does not match the configured team."
			),
			PolicyDenial::GroupMissing { expected, available } => tracing::warn!(
				provider,
				expected_group = %expected,
				available_groups = ?available,
				"Group ID is not among the user's groups."
			),
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (provider, denial);
	}
}

/// Emits a warning for a non-policy failure. Upstream bodies are never recorded.
pub fn trace_failure(provider: &str, stage: &'static str, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		match err {
			Error::UpstreamStatus { endpoint, status, .. } => tracing::warn!(
				provider,
				stage,
				kind = err.kind().as_str(),
				endpoint = %endpoint,
				status,
				"Provider endpoint returned a non-200 status."
			),
			Error::ProviderRejected { endpoint, reason } => tracing::warn!(
				provider,
				stage,
				kind = err.kind().as_str(),
				endpoint = %endpoint,
				reason = reason.as_deref().unwrap_or("unspecified"),
				"Provider envelope reported failure."
			),
			_ => tracing::warn!(
				provider,
				stage,
				kind = err.kind().as_str(),
				error = %err,
				"Identity verification failed."
			),
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (provider, stage, err);
	}
}

/// Emits a warning when the provider verified the user but returned no email.
pub fn trace_empty_email(provider: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(provider, "Provider returned an identity without an email address.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = provider;
	}
}

/// Emits a debug event for a scope-escalation state change.
pub fn trace_escalation(from: &'static str, to: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(from, to, "Scope escalation state changed.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (from, to);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_accept_all_variants_without_subscriber() {
		let denial = PolicyDenial::TeamMismatch { expected: "T2".into(), actual: "T1".into() };

		trace_policy_denial("slack", &denial);
		trace_failure("slack", "identity", &Error::from(denial));
		trace_upstream_response("users.identity", 200);
		trace_empty_email("slack");
		trace_escalation("initial", "awaiting_scope_check");
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let token = AccessToken::new("xoxp-span");
		let span =
			FlowSpan::new(FlowKind::Verification, "instrument_wraps_future", "slack", &token);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
