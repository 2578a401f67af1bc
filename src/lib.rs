//! Identity verification for OAuth 2.0 gated reverse proxies: resolve the signed-in email,
//! enforce team and group policy, and escalate scopes when a provider needs a second consent.
//!
//! The proxy hands a [`auth::SessionState`] to [`gatekeeper::Gatekeeper::get_email_address`]
//! and receives either the verified email or an [`error::Error`] that must be treated as
//! "access denied". Provider differences (credential placement, endpoint shapes, scope
//! detection) live behind [`provider::IdentityProvider`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod escalation;
pub mod gatekeeper;
pub mod http;
pub mod identity;
pub mod obs;
pub mod policy;
pub mod provider;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
