//! Post command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

use super::{RequestArgs, parse_body};

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Path relative to the base URL
    pub path: String,

    /// JSON body
    #[arg(long, short)]
    pub body: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub async fn run(api: &ApiArgs, args: PostArgs) -> Result<()> {
    let client = session::open_client(api)?;
    let body = parse_body(args.body.as_deref())?;

    let payload = client
        .post(&args.path, body.as_ref(), args.request.options()?)
        .await
        .with_context(|| format!("POST to '{}' failed", args.path))?;

    output::payload(payload, args.request.output.as_deref())
}
