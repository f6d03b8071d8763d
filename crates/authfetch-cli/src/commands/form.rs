//! Form command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use authfetch::FormData;

use crate::cli::ApiArgs;
use crate::output;
use crate::session;

use super::RequestArgs;

#[derive(Args, Debug)]
pub struct FormArgs {
    /// Path relative to the base URL
    pub path: String,

    /// Text field (repeatable)
    #[arg(long = "field", short = 'F', value_name = "NAME=VALUE")]
    pub fields: Vec<String>,

    /// File field (repeatable)
    #[arg(long = "file", value_name = "NAME=PATH")]
    pub files: Vec<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub async fn run(api: &ApiArgs, args: FormArgs) -> Result<()> {
    let mut form = FormData::new();

    for field in &args.fields {
        let (name, value) = split_pair(field)?;
        form = form.text(name, value);
    }
    for file in &args.files {
        let (name, path) = split_pair(file)?;
        let path = PathBuf::from(path);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        form = form.file(name, file_name, bytes);
    }

    if form.is_empty() {
        bail!("A form needs at least one --field or --file");
    }

    let client = session::open_client(api)?;
    let payload = client
        .post_form_data(&args.path, form, args.request.options()?)
        .await
        .with_context(|| format!("Form POST to '{}' failed", args.path))?;

    output::payload(payload, args.request.output.as_deref())
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("'{raw}' must look like NAME=VALUE"),
    }
}
