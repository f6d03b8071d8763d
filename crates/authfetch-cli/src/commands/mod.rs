//! Subcommand implementations.

mod authenticate;
mod blob;
mod form;
mod get;
mod logout;
mod post;
mod refresh;
mod status;
mod upload;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use authfetch::RequestOptions;

use crate::cli::ApiArgs;
use crate::session::parse_header;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store an access/refresh token pair
    Authenticate(authenticate::AuthenticateArgs),

    /// Clear the stored tokens
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),

    /// Send a GET (or other method) request
    Get(get::GetArgs),

    /// POST a JSON body merged with the default parameters
    Post(post::PostArgs),

    /// POST a multipart form
    Form(form::FormArgs),

    /// POST the raw contents of a file
    Upload(upload::UploadArgs),

    /// Download a binary resource
    Blob(blob::BlobArgs),
}

pub async fn handle(api: &ApiArgs, command: Command) -> Result<()> {
    match command {
        Command::Authenticate(args) => authenticate::run(api, args).await,
        Command::Logout(args) => logout::run(api, args).await,
        Command::Status(args) => status::run(api, args).await,
        Command::Refresh(args) => refresh::run(api, args).await,
        Command::Get(args) => get::run(api, args).await,
        Command::Post(args) => post::run(api, args).await,
        Command::Form(args) => form::run(api, args).await,
        Command::Upload(args) => upload::run(api, args).await,
        Command::Blob(args) => blob::run(api, args).await,
    }
}

/// Per-request options shared by the request commands.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Query string appended to the path (e.g. "page=1&size=10")
    #[arg(long, short)]
    pub query: Option<String>,

    /// Extra header (repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Do not merge the default parameters into this request
    #[arg(long)]
    pub ignore_defaults: bool,

    /// Write the response body to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl RequestArgs {
    pub fn options(&self) -> Result<RequestOptions> {
        let mut opts = RequestOptions::new();
        if let Some(query) = &self.query {
            opts = opts.query(query.as_str());
        }
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            opts = opts.header(name, value);
        }
        if self.ignore_defaults {
            opts = opts.ignore_defaults();
        }
        Ok(opts)
    }
}

/// Parse a `--body` argument as JSON.
fn parse_body(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    raw.map(|raw| serde_json::from_str(raw).context("Request body is not valid JSON"))
        .transpose()
}
