//! Building the token store, session and client from the global flags.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use authfetch::{ApiClient, ApiConfig, AuthSession, BaseUrl, FileTokenStore, TokenKeys};

use crate::cli::ApiArgs;
use crate::output;

/// Open the token file named by `--store`, or the default one.
pub fn open_store(args: &ApiArgs) -> Result<FileTokenStore> {
    match &args.store {
        Some(path) => Ok(FileTokenStore::new(path)),
        None => FileTokenStore::new_default().context("Could not determine data directory"),
    }
}

/// Build the API configuration from the global flags.
pub fn api_config(args: &ApiArgs) -> Result<ApiConfig> {
    let base_url = BaseUrl::new(&args.base_url).context("Invalid base URL")?;

    let keys = if args.camel_case_keys {
        TokenKeys::camel_case()
    } else {
        TokenKeys::default()
    };

    let mut config = ApiConfig::new(base_url)
        .with_token_keys(keys)
        .with_refresh_path(args.refresh_path.as_str())
        .on_error(|response| match response {
            Some(response) => tracing::debug!(
                status = response.status,
                url = %response.url,
                "Request failed"
            ),
            None => tracing::debug!("Request failed before a response arrived"),
        })
        .on_logout(|| output::warning("Session cleared; authenticate again"));

    for param in &args.default_params {
        let (key, value) = parse_default_param(param)?;
        config = config.with_default_param(key, value);
    }
    for header in &args.default_headers {
        let (name, value) = parse_header(header)?;
        config = config.with_default_header(name, value);
    }

    Ok(config)
}

/// Restore the session from the configured store.
pub fn open_session(args: &ApiArgs) -> Result<AuthSession> {
    session_from_store(open_store(args)?, args)
}

/// Restore a session backed by an already opened store.
pub fn session_from_store(store: FileTokenStore, args: &ApiArgs) -> Result<AuthSession> {
    tracing::debug!(path = %store.path().display(), "Using token store");
    Ok(AuthSession::restored(Arc::new(store), api_config(args)?))
}

/// Restore the session and wrap it in a client.
pub fn open_client(args: &ApiArgs) -> Result<ApiClient> {
    let session = open_session(args)?;
    ApiClient::new(session).context("Failed to build HTTP client")
}

/// Parse `KEY=VALUE`. A value that parses as JSON keeps its JSON type;
/// anything else is a string.
fn parse_default_param(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Default parameter '{raw}' must look like KEY=VALUE");
    };
    if key.is_empty() {
        bail!("Default parameter '{raw}' has an empty key");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Parse `NAME:VALUE`, trimming whitespace around the value.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Header '{raw}' must look like NAME:VALUE");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Header '{raw}' has an empty name");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_keep_json_types() {
        assert_eq!(
            parse_default_param("page=2").unwrap(),
            ("page".to_string(), Value::from(2))
        );
        assert_eq!(
            parse_default_param("lang=en").unwrap(),
            ("lang".to_string(), Value::from("en"))
        );
        assert_eq!(
            parse_default_param("flag=true").unwrap(),
            ("flag".to_string(), Value::Bool(true))
        );
        assert_eq!(
            parse_default_param("q=a=b").unwrap(),
            ("q".to_string(), Value::from("a=b"))
        );
    }

    #[test]
    fn malformed_default_params_are_rejected() {
        assert!(parse_default_param("novalue").is_err());
        assert!(parse_default_param("=1").is_err());
    }

    #[test]
    fn headers_split_on_first_colon() {
        assert_eq!(
            parse_header("X-Trace: a:b").unwrap(),
            ("X-Trace".to_string(), "a:b".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }
}
