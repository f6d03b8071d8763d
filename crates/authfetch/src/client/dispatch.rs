//! Sending a single attempt of a prepared request.

use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::Error;
use crate::tokens::AccessToken;

use super::request::{PreparedRequest, RequestBody, build_headers};
use super::response::{self, Payload};

/// Send one attempt, without any refresh handling.
///
/// Transport failures notify the error handler with no response.
#[instrument(skip_all, fields(method = %request.method, url = %request.url))]
pub(crate) async fn send(
    http: &reqwest::Client,
    config: &ApiConfig,
    request: &PreparedRequest,
    access_token: Option<&AccessToken>,
) -> Result<Payload, Error> {
    let result = attempt(http, config, request, access_token).await;
    if let Err(Error::Transport(err)) = &result {
        debug!(error = %err, "Transport failure");
        config.notify_error(None);
    }
    result
}

async fn attempt(
    http: &reqwest::Client,
    config: &ApiConfig,
    request: &PreparedRequest,
    access_token: Option<&AccessToken>,
) -> Result<Payload, Error> {
    let headers = build_headers(
        access_token,
        request.json_content_type,
        &config.default_headers,
        &request.headers,
    )?;
    let request_is_binary = response::declares_binary(&headers);

    let builder = http
        .request(request.method.clone(), &request.url)
        .headers(headers);
    let builder = match &request.body {
        RequestBody::None => builder,
        RequestBody::Json(body) => builder.body(body.clone()),
        RequestBody::Form(form) => builder.multipart(form.to_multipart()?),
        RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
    };

    debug!(authenticated = access_token.is_some(), "Sending request");
    let response = builder.send().await?;

    response::decode(response, config, request.response_type, request_is_binary).await
}
