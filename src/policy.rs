//! Team and group membership policy.
//!
//! The constraint is fixed when a provider is constructed. Checks are pure functions over data
//! already fetched; the façade decides when to fetch (team first, group only if the team check
//! passed).

// self
use crate::{
	_prelude::*,
	identity::{GroupList, IdentityEnvelope},
};

/// Operator-configured restriction on who may sign in.
///
/// An absent or empty identifier leaves that dimension unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConstraint {
	/// Required team identifier.
	pub team_id: Option<String>,
	/// Required group identifier.
	pub group_id: Option<String>,
}
impl PolicyConstraint {
	/// Constraint that admits every authenticated user.
	pub fn unconstrained() -> Self {
		Self::default()
	}

	/// Requires membership of `team_id`. An empty value clears the requirement.
	pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
		self.team_id = non_empty(team_id.into());

		self
	}

	/// Requires membership of `group_id`. An empty value clears the requirement.
	pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
		self.group_id = non_empty(group_id.into());

		self
	}

	/// Configured team requirement, if any.
	pub fn team_id(&self) -> Option<&str> {
		self.team_id.as_deref().filter(|value| !value.is_empty())
	}

	/// Configured group requirement, if any.
	pub fn group_id(&self) -> Option<&str> {
		self.group_id.as_deref().filter(|value| !value.is_empty())
	}
}

/// Policy decision against an otherwise valid identity.
///
/// The fields are for audit logs. The `Display` text deliberately names only the kind of
/// mismatch so it can be shown without exposing account details.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PolicyDenial {
	/// The identity belongs to a different team.
	#[error("Team does not match the configured team.")]
	TeamMismatch {
		/// Configured team identifier.
		expected: String,
		/// Team identifier reported by the provider.
		actual: String,
	},
	/// None of the listed groups is the configured group.
	#[error("User is not a member of the configured group.")]
	GroupMissing {
		/// Configured group identifier.
		expected: String,
		/// Group identifiers reported by the provider.
		available: Vec<String>,
	},
}

/// Returns true iff no team is required or the envelope's team ID equals it exactly.
pub fn check_team(envelope: &IdentityEnvelope, constraint: &PolicyConstraint) -> bool {
	match constraint.team_id() {
		None => true,
		Some(team_id) => envelope.team.id == team_id,
	}
}

/// Returns true iff no group is required or the list contains an entry with that ID.
pub fn check_group(groups: &GroupList, constraint: &PolicyConstraint) -> bool {
	match constraint.group_id() {
		None => true,
		Some(group_id) => groups.groups.iter().any(|group| group.id == group_id),
	}
}

/// [`check_team`] that reports the mismatched identifiers on failure.
pub fn enforce_team(
	envelope: &IdentityEnvelope,
	constraint: &PolicyConstraint,
) -> Result<(), PolicyDenial> {
	if check_team(envelope, constraint) {
		return Ok(());
	}

	Err(PolicyDenial::TeamMismatch {
		expected: constraint.team_id().unwrap_or_default().to_owned(),
		actual: envelope.team.id.clone(),
	})
}

/// [`check_group`] that reports the mismatched identifiers on failure.
pub fn enforce_group(
	groups: &GroupList,
	constraint: &PolicyConstraint,
) -> Result<(), PolicyDenial> {
	if check_group(groups, constraint) {
		return Ok(());
	}

	Err(PolicyDenial::GroupMissing {
		expected: constraint.group_id().unwrap_or_default().to_owned(),
		available: groups.ids(),
	})
}

fn non_empty(value: String) -> Option<String> {
	if value.is_empty() { None } else { Some(value) }
}
