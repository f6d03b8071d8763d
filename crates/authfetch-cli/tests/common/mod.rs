use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// An isolated token file plus the base URL the CLI should talk to.
pub struct CliEnv {
    pub dir: TempDir,
    pub base_url: String,
}

impl CliEnv {
    pub fn new(base_url: &str) -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            base_url: base_url.to_string(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("tokens.json")
    }

    /// Run the CLI binary with arguments.
    pub fn run(&self, args: &[&str]) -> Output {
        run_cli(args, &self.store_path(), &self.base_url)
    }

    /// Run the CLI and expect success.
    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI and expect failure.
    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Parsed contents of the token file.
    pub fn stored(&self) -> serde_json::Map<String, serde_json::Value> {
        match std::fs::read_to_string(self.store_path()) {
            Ok(raw) => serde_json::from_str(&raw).expect("Token file is not JSON"),
            Err(_) => serde_json::Map::new(),
        }
    }
}

fn run_cli(args: &[&str], store: &Path, base_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_authfetch"));
    cmd.args(args);
    cmd.env("AUTHFETCH_STORE", store);
    cmd.env("AUTHFETCH_BASE_URL", base_url);
    cmd.env_remove("AUTHFETCH_ACCESS_TOKEN");
    cmd.env_remove("AUTHFETCH_REFRESH_TOKEN");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}
