//! Refresh command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(api: &ApiArgs, _args: RefreshArgs) -> Result<()> {
    let client = session::open_client(api)?;

    if client.session().refresh_token().is_none() {
        bail!("No refresh token stored. Run 'authfetch authenticate' first.");
    }

    eprintln!("{}", "Refreshing access token...".dimmed());

    client.refresh().await.context("Failed to refresh tokens")?;

    output::success("Access token refreshed");
    Ok(())
}
