//! Gatekeeper error taxonomy shared by endpoints, providers, and the façade.
//!
//! Every variant means "no verified email". Proxies must deny access on any [`Error`] and must
//! never forward its fields (upstream bodies in particular) to the end user; the data exists for
//! operator diagnostics and audit logs only.

// self
use crate::{_prelude::*, policy::PolicyDenial};

/// Gatekeeper-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gatekeeper error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider answered with a status other than 200.
	#[error("Provider endpoint `{endpoint}` returned HTTP {status}.")]
	UpstreamStatus {
		/// Endpoint path relative to the validation base URL.
		endpoint: String,
		/// HTTP status code.
		status: u16,
		/// Bounded preview of the response body, kept for diagnostics only.
		body: String,
	},
	/// Provider answered 200 with a body that is not the expected JSON.
	#[error("Provider endpoint `{endpoint}` returned malformed JSON.")]
	Decode {
		/// Endpoint path relative to the validation base URL.
		endpoint: String,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Well-formed envelope whose own success flag is false.
	#[error("Provider endpoint `{endpoint}` rejected the request.")]
	ProviderRejected {
		/// Endpoint path relative to the validation base URL.
		endpoint: String,
		/// Provider-supplied error code, if any.
		reason: Option<String>,
	},
	/// Identity resolved but the configured team or group policy does not admit it.
	#[error(transparent)]
	PolicyDenied(#[from] PolicyDenial),
	/// Authorization redirect returned a `state` that this login sequence did not issue.
	#[error("Authorization state mismatch.")]
	StateMismatch,
}
impl Error {
	/// Returns a stable label suitable for log fields or metric labels.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::Transport(_) => ErrorKind::Transport,
			Self::UpstreamStatus { .. } => ErrorKind::UpstreamStatus,
			Self::Decode { .. } => ErrorKind::Decode,
			Self::ProviderRejected { .. } => ErrorKind::ProviderRejected,
			Self::PolicyDenied(_) => ErrorKind::PolicyDenied,
			Self::StateMismatch => ErrorKind::StateMismatch,
		}
	}

	/// Returns true when the failure is a policy decision rather than an upstream problem.
	pub fn is_policy_denial(&self) -> bool {
		matches!(self, Self::PolicyDenied(_))
	}
}

/// Coarse classification of [`Error`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::Config`].
	Config,
	/// See [`Error::Transport`].
	Transport,
	/// See [`Error::UpstreamStatus`].
	UpstreamStatus,
	/// See [`Error::Decode`].
	Decode,
	/// See [`Error::ProviderRejected`].
	ProviderRejected,
	/// See [`Error::PolicyDenied`].
	PolicyDenied,
	/// See [`Error::StateMismatch`].
	StateMismatch,
}
impl ErrorKind {
	/// Returns the label used in spans and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Config => "config",
			ErrorKind::Transport => "transport",
			ErrorKind::UpstreamStatus => "upstream_status",
			ErrorKind::Decode => "decode",
			ErrorKind::ProviderRejected => "provider_rejected",
			ErrorKind::PolicyDenied => "policy_denied",
			ErrorKind::StateMismatch => "state_mismatch",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider settings failed validation.
	#[error(transparent)]
	Provider(#[from] crate::provider::ProviderConfigError),
	/// Endpoint URL could not be derived from the validation base URL.
	#[error("Endpoint `{endpoint}` cannot be joined onto the validation URL.")]
	InvalidEndpoint {
		/// Endpoint path that failed to resolve.
		endpoint: String,
	},
	/// Access token cannot be carried in an HTTP header.
	#[error("Access token contains characters that are not valid in an HTTP header.")]
	InvalidTokenHeader,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider API.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured error.
	#[error("HTTP client error occurred while calling the provider API: {message}.")]
	Other {
		/// Client-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
