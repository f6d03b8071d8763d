//! Authenticate command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authfetch::ResponseTokens;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct AuthenticateArgs {
    /// Access token sent as the bearer credential
    #[arg(long, env = "AUTHFETCH_ACCESS_TOKEN")]
    pub access_token: String,

    /// Refresh token used to obtain new access tokens
    #[arg(long, env = "AUTHFETCH_REFRESH_TOKEN")]
    pub refresh_token: String,
}

pub async fn run(api: &ApiArgs, args: AuthenticateArgs) -> Result<()> {
    let store = session::open_store(api)?;
    let path = store.path().to_path_buf();
    let session = session::session_from_store(store, api)?;

    session
        .authenticate(ResponseTokens::new(args.access_token, args.refresh_token))
        .context("Failed to save tokens")?;

    output::success("Tokens stored");
    output::field("Store", &path.display().to_string());

    Ok(())
}
