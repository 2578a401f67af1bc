//! Response envelopes returned by provider identity and group endpoints.
//!
//! Envelopes carry their own `ok` flag; an HTTP 200 with `ok: false` is still a failure. Missing
//! fields decode to empty strings so that a sparse but successful response is not mistaken for a
//! malformed one.

// self
use crate::_prelude::*;

/// Response wrapper whose success flag is authoritative over the HTTP status.
pub trait Envelope {
	/// Provider-reported success flag.
	fn is_ok(&self) -> bool;

	/// Provider-reported error code, when the envelope carries one.
	fn error_code(&self) -> Option<&str>;
}

/// Checks the envelope's own success flag, converting `ok: false` into
/// [`Error::ProviderRejected`].
pub fn ensure_ok<E>(endpoint: &str, envelope: E) -> Result<E>
where
	E: Envelope,
{
	if envelope.is_ok() {
		Ok(envelope)
	} else {
		Err(Error::ProviderRejected {
			endpoint: endpoint.to_owned(),
			reason: envelope.error_code().map(str::to_owned),
		})
	}
}

/// User portion of an identity response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
	/// Provider user identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Email address; empty when the provider did not return one.
	pub email: String,
}

/// Team (workspace) portion of an identity response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
	/// Provider team identifier.
	pub id: String,
	/// Team display name.
	pub name: String,
}

/// Result of a provider's "who am I" endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityEnvelope {
	/// Provider success flag.
	pub ok: bool,
	/// Authenticated user.
	pub user: UserRecord,
	/// Team the token was issued for.
	pub team: TeamRecord,
	/// Provider error code on failure (e.g. `invalid_auth`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl Envelope for IdentityEnvelope {
	fn is_ok(&self) -> bool {
		self.ok
	}

	fn error_code(&self) -> Option<&str> {
		self.error.as_deref()
	}
}

/// One entry of a group listing. Only the identifier matters for policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupRecord {
	/// Provider group identifier.
	pub id: String,
	/// Group display name.
	pub name: String,
}

/// Result of a provider's group-listing endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupList {
	/// Provider success flag.
	pub ok: bool,
	/// Groups visible to the token, in provider order.
	pub groups: Vec<GroupRecord>,
	/// Provider error code on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl GroupList {
	/// Identifiers of every listed group, in provider order.
	pub fn ids(&self) -> Vec<String> {
		self.groups.iter().map(|group| group.id.clone()).collect()
	}
}
impl Envelope for GroupList {
	fn is_ok(&self) -> bool {
		self.ok
	}

	fn error_code(&self) -> Option<&str> {
		self.error.as_deref()
	}
}
