//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::commands::Command;

/// Call token-protected HTTP APIs with stored credentials.
#[derive(Parser, Debug)]
#[command(name = "authfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub api: ApiArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection and storage settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// API base URL
    #[arg(
        long,
        env = "AUTHFETCH_BASE_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    pub base_url: String,

    /// Token file (defaults to the platform data directory)
    #[arg(long, env = "AUTHFETCH_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Store tokens under accessToken/refreshToken instead of token/refresh
    #[arg(long, global = true)]
    pub camel_case_keys: bool,

    /// Default parameter added to query strings and JSON bodies (repeatable).
    /// Values that parse as JSON keep their type.
    #[arg(long = "default-param", value_name = "KEY=VALUE", global = true)]
    pub default_params: Vec<String>,

    /// Default header sent with every request (repeatable)
    #[arg(long = "default-header", value_name = "NAME:VALUE", global = true)]
    pub default_headers: Vec<String>,

    /// Path of the refresh endpoint, relative to the base URL
    #[arg(long, default_value = authfetch::config::DEFAULT_REFRESH_PATH, global = true)]
    pub refresh_path: String,
}
