//! Read-only view of the proxy's session.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Credentials the proxy obtained upstream for one end user.
///
/// The gatekeeper only reads the access token; cookies, expiry, and refresh handling belong to
/// the proxy.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionState {
	/// Bearer credential returned by the provider's code exchange.
	pub access_token: AccessToken,
}
impl SessionState {
	/// Creates a session holding the provided access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: AccessToken::new(access_token) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_redacts_token() {
		let session = SessionState::new("xoxp-123");
		let rendered = format!("{session:?}");

		assert!(!rendered.contains("xoxp-123"));
		assert!(rendered.contains("<redacted>"));
	}
}
