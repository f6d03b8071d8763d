//! Response decoding.

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{ApiConfig, ErrorResponse};
use crate::error::{DecodeError, Error, ErrorBody, HttpError};

use super::request::ResponseType;

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded JSON; an empty or undecodable body is an empty object.
    Json(Value),
    /// Raw bytes of a binary response.
    Binary(Vec<u8>),
}

impl Payload {
    /// Deserialize a JSON payload into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value).map_err(DecodeError::from)?),
            Payload::Binary(bytes) => {
                Err(DecodeError::UnexpectedBinary { len: bytes.len() }.into())
            }
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary(_) => None,
        }
    }

    /// Returns the body bytes; JSON payloads are re-serialized.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }
}

/// Media type without parameters, lowercased.
fn essence(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
}

fn is_json(essence: &str) -> bool {
    essence == "application/json" || essence.ends_with("+json")
}

fn is_text(essence: &str) -> bool {
    essence.starts_with("text/")
}

fn is_binary(essence: &str) -> bool {
    essence == "blob" || essence == "application/octet-stream"
}

/// Returns true if the request headers mark the exchange as binary.
///
/// Only the `blob` marker counts here; an `application/octet-stream`
/// request body says nothing about the shape of the reply.
pub(crate) fn declares_binary(headers: &HeaderMap) -> bool {
    essence(headers).is_some_and(|e| e == "blob")
}

/// Turn a response into a payload or an [`HttpError`].
///
/// The error handler is notified before a non-success body is read.
/// Failure to read a success body is a transport error.
pub(crate) async fn decode(
    response: reqwest::Response,
    config: &ApiConfig,
    response_type: ResponseType,
    request_is_binary: bool,
) -> Result<Payload, Error> {
    let status = response.status();
    let content_type = essence(response.headers());
    trace!(status = %status, content_type = ?content_type, "Response received");

    if !status.is_success() {
        config.notify_error(Some(&ErrorResponse {
            status: status.as_u16(),
            url: response.url().to_string(),
            headers: response.headers().clone(),
        }));
        let body = error_body(response, content_type.as_deref()).await;
        debug!(status = status.as_u16(), "Request failed");
        return Err(HttpError::new(status.as_u16(), body).into());
    }

    let binary = request_is_binary
        || response_type == ResponseType::Binary
        || content_type.as_deref().is_some_and(is_binary);

    let bytes = response.bytes().await?;
    if binary {
        return Ok(Payload::Binary(bytes.to_vec()));
    }

    // A success with no (or malformed) JSON body still resolves.
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new()));
    Ok(Payload::Json(value))
}

async fn error_body(response: reqwest::Response, content_type: Option<&str>) -> ErrorBody {
    match content_type {
        Some(ct) if is_json(ct) => match response.json::<Value>().await {
            Ok(value) => ErrorBody::Json(value),
            Err(_) => ErrorBody::Empty,
        },
        Some(ct) if is_text(ct) => match response.text().await {
            Ok(text) => ErrorBody::Text(text),
            Err(_) => ErrorBody::Empty,
        },
        _ => ErrorBody::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn content_type_parameters_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        let ct = essence(&headers).unwrap();
        assert!(is_json(&ct));
        assert!(is_json("application/problem+json"));
        assert!(is_text("text/plain"));
    }

    #[test]
    fn blob_request_header_is_binary() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("blob"));
        assert!(declares_binary(&headers));
        assert!(!declares_binary(&HeaderMap::new()));
    }

    #[test]
    fn octet_stream_request_header_is_not_binary() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        assert!(!declares_binary(&headers));
        assert!(is_binary("application/octet-stream"));
    }

    #[test]
    fn json_payload_decodes_into_type() {
        #[derive(Deserialize)]
        struct User {
            name: String,
        }
        let user: User = Payload::Json(json!({"name": "ada"})).into_json().unwrap();
        assert_eq!(user.name, "ada");
    }

    #[test]
    fn binary_payload_is_not_json() {
        let err = Payload::Binary(vec![1, 2, 3])
            .into_json::<Value>()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnexpectedBinary { len: 3 })
        ));
    }
}
