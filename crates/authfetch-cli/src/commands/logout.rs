//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(api: &ApiArgs, _args: LogoutArgs) -> Result<()> {
    let session = session::open_session(api)?;

    if !session.is_authenticated() {
        output::warning("No stored session");
        return Ok(());
    }

    session
        .clear_tokens()
        .context("Failed to remove stored tokens")?;

    output::success("Logged out");
    Ok(())
}
