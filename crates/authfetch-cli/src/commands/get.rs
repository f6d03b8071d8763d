//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use authfetch::{Method, ResponseType};

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

use super::RequestArgs;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Path relative to the base URL
    pub path: String,

    /// HTTP method to use instead of GET
    #[arg(long, short = 'X', value_parser = parse_method)]
    pub method: Option<Method>,

    /// Return the body as raw bytes instead of decoding JSON
    #[arg(long)]
    pub binary: bool,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub async fn run(api: &ApiArgs, args: GetArgs) -> Result<()> {
    let client = session::open_client(api)?;

    let mut opts = args.request.options()?;
    if let Some(method) = args.method {
        opts = opts.method(method);
    }
    if args.binary {
        opts = opts.response_type(ResponseType::Binary);
    }

    let payload = client
        .fetch(&args.path, opts)
        .await
        .with_context(|| format!("Request to '{}' failed", args.path))?;

    output::payload(payload, args.request.output.as_deref())
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}
