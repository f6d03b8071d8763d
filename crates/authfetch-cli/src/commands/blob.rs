//! Blob command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authfetch::Payload;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

use super::{RequestArgs, parse_body};

#[derive(Args, Debug)]
pub struct BlobArgs {
    /// Path relative to the base URL
    pub path: String,

    /// JSON body sent with the request
    #[arg(long, short)]
    pub body: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub async fn run(api: &ApiArgs, args: BlobArgs) -> Result<()> {
    let client = session::open_client(api)?;
    let body = parse_body(args.body.as_deref())?;

    let bytes = client
        .post_blob(&args.path, body.as_ref(), args.request.options()?)
        .await
        .with_context(|| format!("Download from '{}' failed", args.path))?;

    output::payload(Payload::Binary(bytes), args.request.output.as_deref())
}
