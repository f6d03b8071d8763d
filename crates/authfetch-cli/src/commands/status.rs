//! Status command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(api: &ApiArgs, args: StatusArgs) -> Result<()> {
    let store = session::open_store(api)?;
    let path = store.path().display().to_string();
    let session = session::session_from_store(store, api)?;

    let authenticated = session.is_authenticated();
    let has_refresh = session.refresh_token().is_some();

    if args.json {
        return output::json_pretty(&json!({
            "authenticated": authenticated,
            "refreshable": has_refresh,
            "base_url": session.config().base_url().as_str(),
            "store": path,
        }));
    }

    output::field("Authenticated", if authenticated { "yes" } else { "no" });
    output::field("Refresh token", if has_refresh { "present" } else { "absent" });
    output::field("Base URL", session.config().base_url().as_str());
    output::field("Store", &path);

    Ok(())
}
