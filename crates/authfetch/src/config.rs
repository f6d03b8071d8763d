//! Client configuration carried by a session.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, InvalidInputError};
use crate::store::TokenKeys;

/// Path of the refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "token/refresh";

/// A validated API base URL.
///
/// Must be an absolute `http` or `https` URL without query or fragment.
///
/// # Example
///
/// ```
/// use authfetch::BaseUrl;
///
/// let base = BaseUrl::new("https://api.example.com/v1").unwrap();
/// assert_eq!(base.join("users"), "https://api.example.com/v1/users");
/// assert_eq!(base.join("/users"), "https://api.example.com/v1/users");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Parse and validate a base URL.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::BaseUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;
        Ok(Self(url))
    }

    /// Append `path` with exactly one `/` between the base and the path.
    pub fn join(&self, path: &str) -> String {
        let base = self.0.as_str();
        if path.is_empty() {
            return base.to_string();
        }
        match (base.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", base, &path[1..]),
            (false, false) => format!("{}/{}", base, path),
            _ => format!("{}{}", base, path),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::BaseUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("must use http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("must have a host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not contain a query or fragment"));
        }
        Ok(())
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BaseUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BaseUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Snapshot of a failed response handed to the error handler.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: u16,
    pub url: String,
    pub headers: HeaderMap,
}

/// Notification hook for failed calls. Receives `None` for network failures.
pub type ErrorHandler = Arc<dyn Fn(Option<&ErrorResponse>) + Send + Sync>;

/// Invoked once per `clear_tokens` call.
pub type LogoutCallback = Arc<dyn Fn() + Send + Sync>;

/// Configuration supplied when a session is constructed.
///
/// The session stores it and hands it to the fetch layer untouched.
#[derive(Clone)]
pub struct ApiConfig {
    pub(crate) base_url: BaseUrl,
    pub(crate) token_keys: TokenKeys,
    pub(crate) refresh_path: String,
    pub(crate) default_params: Map<String, Value>,
    pub(crate) default_headers: Vec<(String, String)>,
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) logout_callback: Option<LogoutCallback>,
}

impl ApiConfig {
    pub fn new(base_url: BaseUrl) -> Self {
        Self {
            base_url,
            token_keys: TokenKeys::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            default_params: Map::new(),
            default_headers: Vec::new(),
            error_handler: None,
            logout_callback: None,
        }
    }

    pub fn with_token_keys(mut self, keys: TokenKeys) -> Self {
        self.token_keys = keys;
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Replace the default query/body parameters.
    pub fn with_default_params(mut self, params: Map<String, Value>) -> Self {
        self.default_params = params;
        self
    }

    pub fn with_default_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }

    pub fn with_default_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&ErrorResponse>) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_logout<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.logout_callback = Some(Arc::new(callback));
        self
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn token_keys(&self) -> &TokenKeys {
        &self.token_keys
    }

    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    pub fn default_params(&self) -> &Map<String, Value> {
        &self.default_params
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    pub(crate) fn notify_error(&self, response: Option<&ErrorResponse>) {
        if let Some(handler) = &self.error_handler {
            handler(response);
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token_keys", &self.token_keys)
            .field("refresh_path", &self.refresh_path)
            .field("default_params", &self.default_params)
            .field("default_headers", &self.default_headers)
            .field("error_handler", &self.error_handler.is_some())
            .field("logout_callback", &self.logout_callback.is_some())
            .finish()
    }
}
