//! Builds a Slack gatekeeper from environment variables, prints the login URL, and verifies an
//! access token when one is supplied.
//!
//! ```sh
//! SLACK_CLIENT_ID=... SLACK_TEAM_ID=T123 SLACK_ACCESS_TOKEN=xoxp-... \
//! 	cargo run --example verify_session
//! ```

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use oauth2_gatekeeper::{
	auth::SessionState,
	escalation::UpgradeDecision,
	gatekeeper::Gatekeeper,
	policy::PolicyConstraint,
	provider::{ProviderSettings, SlackProvider},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let policy = PolicyConstraint::default()
		.with_team_id(env::var("SLACK_TEAM_ID").unwrap_or_default())
		.with_group_id(env::var("SLACK_GROUP_ID").unwrap_or_default());
	let settings = ProviderSettings::new(env::var("SLACK_CLIENT_ID")?).with_policy(policy);
	let gatekeeper = Gatekeeper::new(Arc::new(SlackProvider::with_shared_client(&settings)?));
	let redirect_uri = Url::parse("https://proxy.example.com/oauth2/callback")?;
	let mut sequence = gatekeeper.begin_login();

	println!("Send your user to {}.", gatekeeper.login_url(&sequence, &redirect_uri));

	let Ok(token) = env::var("SLACK_ACCESS_TOKEN") else {
		println!("Set SLACK_ACCESS_TOKEN to verify a session.");

		return Ok(());
	};
	let session = SessionState::new(token);

	if let UpgradeDecision::RetryWith(scope) =
		gatekeeper.attempt_upgrade(&mut sequence, &session).await?
	{
		let retry_url = gatekeeper.login_url(&sequence, &redirect_uri);

		println!("Token lacks `{scope}`; send the user to {retry_url}.");

		return Ok(());
	}

	match gatekeeper.get_email_address(&session).await {
		Ok(email) if email.is_empty() => println!("Verified, but Slack returned no email."),
		Ok(email) => println!("Verified {email}."),
		Err(e) => eprintln!("Access denied ({}): {e}.", e.kind()),
	}

	Ok(())
}
