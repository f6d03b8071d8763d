//! Output formatting helpers.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use authfetch::Payload;

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a response payload: JSON pretty-printed, binary written raw to
/// `output` or stdout.
pub fn payload(payload: Payload, output: Option<&Path>) -> Result<()> {
    match (payload, output) {
        (payload, Some(path)) => {
            let bytes = payload.into_bytes();
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            success(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
            Ok(())
        }
        (Payload::Json(value), None) => json_pretty(&value),
        (Payload::Binary(bytes), None) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
