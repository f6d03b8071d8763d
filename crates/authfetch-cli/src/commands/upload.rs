//! Upload command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

use super::RequestArgs;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Path relative to the base URL
    pub path: String,

    /// File whose bytes are sent as the body
    pub file: PathBuf,

    /// Content-Type of the body
    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub async fn run(api: &ApiArgs, args: UploadArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let client = session::open_client(api)?;
    let opts = args
        .request
        .options()?
        .header("Content-Type", args.content_type.as_str());

    let payload = client
        .upload_file(&args.path, bytes, opts)
        .await
        .with_context(|| format!("Upload to '{}' failed", args.path))?;

    output::payload(payload, args.request.output.as_deref())
}
