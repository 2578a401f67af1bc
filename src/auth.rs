//! Auth-domain scope sets, redacted access tokens, and the proxy-owned session view.

pub mod scope;
pub mod secret;
pub mod session;

pub use scope::*;
pub use secret::*;
pub use session::*;
