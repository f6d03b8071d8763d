//! Request construction: URL composition, headers and bodies.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::BaseUrl;
use crate::error::{Error, InvalidInputError};
use crate::tokens::AccessToken;

/// How a successful response body should be returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Decode as JSON; an undecodable body becomes an empty object.
    #[default]
    Json,
    /// Return the raw bytes.
    Binary,
}

/// Per-call options.
///
/// # Example
///
/// ```
/// use authfetch::RequestOptions;
///
/// let opts = RequestOptions::new()
///     .query("page=2")
///     .header("X-Trace", "abc")
///     .ignore_defaults();
/// assert!(opts.ignores_defaults());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) method: Option<Method>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query: Option<String>,
    pub(crate) ignore_defaults: bool,
    pub(crate) response_type: ResponseType,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the HTTP method chosen by the helper.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header. Caller headers win over defaults and computed headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set an already-encoded query string, e.g. `"a=1&b=2"`.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the query string from key/value pairs, form-encoding them.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.query = Some(encoded);
        self
    }

    /// Skip the configured default parameters for this call.
    pub fn ignore_defaults(mut self) -> Self {
        self.ignore_defaults = true;
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn ignores_defaults(&self) -> bool {
        self.ignore_defaults
    }
}

/// A multipart form body.
///
/// Parts are kept as owned data so the body can be rebuilt when a request
/// is retried after a token refresh.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: None,
        });
        self
    }

    pub fn file_with_mime(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: Some(mime.into()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn to_multipart(&self) -> Result<Form, Error> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| InvalidInputError::Header {
                            name: "content-type".to_string(),
                            reason: e.to_string(),
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request body, owned so it can be sent more than once.
#[derive(Debug, Clone)]
pub(crate) enum RequestBody {
    None,
    Json(String),
    Form(FormData),
    Bytes(Vec<u8>),
}

/// A fully composed request, minus the authorization header which is
/// computed at send time from the current session.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json_content_type: bool,
    pub body: RequestBody,
    pub response_type: ResponseType,
}

/// Compose the final URL.
///
/// Explicit query parameters come first, then the default parameters unless
/// `ignore_defaults` is set. The first separator is `?` unless the URL
/// already carries a query.
pub(crate) fn compose_url(
    base: &BaseUrl,
    path: &str,
    query: Option<&str>,
    defaults: &Map<String, Value>,
    ignore_defaults: bool,
) -> String {
    let mut url = base.join(path);
    let query = query.filter(|q| !q.is_empty());
    let defaults = (!ignore_defaults && !defaults.is_empty()).then(|| encode_params(defaults));

    for part in [query.map(str::to_string), defaults].into_iter().flatten() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&part);
    }
    url
}

/// Form-encode a flat parameter object the way a browser's
/// `URLSearchParams` would.
pub(crate) fn encode_params(params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            Value::String(s) => serializer.append_pair(key, s),
            other => serializer.append_pair(key, &other.to_string()),
        };
    }
    serializer.finish()
}

/// Serialize a JSON body, merging in the default parameters.
///
/// Defaults are skipped for arrays, when `ignore_defaults` is set, or when
/// there are none. Body keys win over default keys. Returns `None` when
/// there is nothing to send.
pub(crate) fn merge_json_body(
    body: Option<Value>,
    defaults: &Map<String, Value>,
    ignore_defaults: bool,
) -> Result<Option<String>, Error> {
    let use_defaults = !ignore_defaults && !defaults.is_empty();

    let merged = match body {
        Some(Value::Object(fields)) if use_defaults => {
            let mut merged = defaults.clone();
            merged.extend(fields);
            Some(Value::Object(merged))
        }
        None if use_defaults => Some(Value::Object(defaults.clone())),
        other => other,
    };

    merged
        .map(|value| serde_json::to_string(&value))
        .transpose()
        .map_err(|e| {
            InvalidInputError::Body {
                reason: e.to_string(),
            }
            .into()
        })
}

/// Build the header map for one attempt.
///
/// Precedence, lowest first: computed `Authorization` and JSON
/// `Content-Type`, default headers, caller headers.
pub(crate) fn build_headers(
    access_token: Option<&AccessToken>,
    json_content_type: bool,
    defaults: &[(String, String)],
    caller: &[(String, String)],
) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    if let Some(token) = access_token.filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(|e| {
            InvalidInputError::Header {
                name: AUTHORIZATION.to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
    }
    if json_content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in defaults.iter().chain(caller) {
        headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
    }
    Ok(headers)
}

fn parse_header_name(name: &str) -> Result<HeaderName, Error> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
        InvalidInputError::Header {
            name: name.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| {
        InvalidInputError::Header {
            name: name.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> BaseUrl {
        BaseUrl::new("https://api.example.com").unwrap()
    }

    fn defaults() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("b".to_string(), json!(2));
        map
    }

    #[test]
    fn query_then_defaults() {
        let url = compose_url(&base(), "items", Some("a=1"), &defaults(), false);
        assert_eq!(url, "https://api.example.com/items?a=1&b=2");
    }

    #[test]
    fn defaults_only() {
        let url = compose_url(&base(), "items", None, &defaults(), false);
        assert_eq!(url, "https://api.example.com/items?b=2");
    }

    #[test]
    fn ignore_defaults_keeps_explicit_query() {
        let url = compose_url(&base(), "items", Some("a=1"), &defaults(), true);
        assert_eq!(url, "https://api.example.com/items?a=1");
    }

    #[test]
    fn nothing_to_append() {
        let url = compose_url(&base(), "items", None, &Map::new(), false);
        assert_eq!(url, "https://api.example.com/items");

        let url = compose_url(&base(), "items", None, &defaults(), true);
        assert_eq!(url, "https://api.example.com/items");
    }

    #[test]
    fn path_with_existing_query_gets_ampersand() {
        let url = compose_url(&base(), "items?x=0", Some("a=1"), &defaults(), false);
        assert_eq!(url, "https://api.example.com/items?x=0&a=1&b=2");
    }

    #[test]
    fn default_params_are_form_encoded() {
        let mut params = Map::new();
        params.insert("q".to_string(), json!("a b&c"));
        params.insert("flag".to_string(), json!(true));
        assert_eq!(encode_params(&params), "flag=true&q=a+b%26c");
    }

    #[test]
    fn query_pairs_are_encoded() {
        let opts = RequestOptions::new().query_pairs([("name", "a b")]);
        assert_eq!(opts.query.as_deref(), Some("name=a+b"));
    }

    #[test]
    fn body_merges_defaults_with_body_winning() {
        let mut defaults = defaults();
        defaults.insert("lang".to_string(), json!("en"));

        let body = merge_json_body(Some(json!({"b": 3, "c": 4})), &defaults, false)
            .unwrap()
            .unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({"b": 3, "c": 4, "lang": "en"}));
    }

    #[test]
    fn arrays_and_ignored_defaults_are_sent_verbatim() {
        let body = merge_json_body(Some(json!([1, 2])), &defaults(), false)
            .unwrap()
            .unwrap();
        assert_eq!(body, "[1,2]");

        let body = merge_json_body(Some(json!({"c": 4})), &defaults(), true)
            .unwrap()
            .unwrap();
        assert_eq!(body, r#"{"c":4}"#);
    }

    #[test]
    fn missing_body_becomes_defaults_or_nothing() {
        let body = merge_json_body(None, &defaults(), false).unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"b":2}"#));

        assert!(merge_json_body(None, &defaults(), true).unwrap().is_none());
        assert!(merge_json_body(None, &Map::new(), false).unwrap().is_none());
    }

    #[test]
    fn header_precedence() {
        let token = AccessToken::new("abc");
        let defaults = vec![("X-Client".to_string(), "default".to_string())];
        let caller = vec![
            ("x-client".to_string(), "caller".to_string()),
            ("Content-Type".to_string(), "text/plain".to_string()),
        ];

        let headers = build_headers(Some(&token), true, &defaults, &caller).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers["x-client"], "caller");
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn authorization_omitted_without_token() {
        let headers = build_headers(None, false, &[], &[]).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());

        let empty = AccessToken::new("");
        let headers = build_headers(Some(&empty), false, &[], &[]).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let caller = vec![("bad header".to_string(), "x".to_string())];
        assert!(build_headers(None, false, &[], &caller).is_err());
    }
}
