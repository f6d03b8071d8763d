//! Bearer-authenticated HTTP client with refresh-on-401.

mod dispatch;
mod refresh;
mod request;
mod response;

use std::sync::Arc;

use futures_util::FutureExt;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::BaseUrl;
use crate::error::{AuthError, Error, InvalidInputError, TransportError};
use crate::session::AuthSession;

pub use request::{FormData, RequestOptions, ResponseType};
pub use response::Payload;

use refresh::{RefreshCoordinator, refresh_tokens};
use request::{PreparedRequest, RequestBody, compose_url, merge_json_body};

/// HTTP client that attaches the session's access token and recovers from
/// an expired token by refreshing once and retrying.
///
/// Clones share the HTTP connection pool, the session and the refresh
/// coordinator, so concurrent 401s across clones trigger a single refresh.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use authfetch::{ApiClient, ApiConfig, AuthSession, BaseUrl, MemoryTokenStore, RequestOptions};
///
/// # async fn example() -> Result<(), authfetch::Error> {
/// let config = ApiConfig::new(BaseUrl::new("https://api.example.com")?)
///     .with_default_param("lang", "en");
/// let session = AuthSession::restored(Arc::new(MemoryTokenStore::new()), config);
/// let client = ApiClient::new(session)?;
///
/// let me: serde_json::Value = client.fetch_json("me", RequestOptions::new()).await?;
/// println!("{me}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
    base_url_override: Option<BaseUrl>,
}

struct ClientInner {
    http: reqwest::Client,
    session: AuthSession,
    refresh: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client for the given session.
    pub fn new(session: AuthSession) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("authfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::from)?;
        Ok(Self::with_http_client(session, http))
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http_client(session: AuthSession, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                session,
                refresh: Arc::new(RefreshCoordinator::default()),
            }),
            base_url_override: None,
        }
    }

    /// A client that sends requests to `base_url` instead of the configured
    /// base URL. Token refreshes still go to the configured base URL.
    pub fn with_base_url_override(&self, base_url: BaseUrl) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            base_url_override: Some(base_url),
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    /// Base URL used for regular requests.
    pub fn base_url(&self) -> &BaseUrl {
        self.base_url_override
            .as_ref()
            .unwrap_or(&self.inner.session.config().base_url)
    }

    /// Generic request. The method defaults to GET.
    #[instrument(skip(self, opts))]
    pub async fn fetch(&self, path: &str, opts: RequestOptions) -> Result<Payload, Error> {
        let request = self.prepare(path, &opts, Method::GET, false, RequestBody::None);
        self.execute(request).await
    }

    /// Generic request decoded into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<T, Error> {
        self.fetch(path, opts).await?.into_json()
    }

    /// POST a JSON body merged with the default parameters.
    #[instrument(skip(self, body, opts))]
    pub async fn post<B>(
        &self,
        path: &str,
        body: Option<&B>,
        opts: RequestOptions,
    ) -> Result<Payload, Error>
    where
        B: Serialize + ?Sized,
    {
        let defaults = &self.inner.session.config().default_params;
        let body = merge_json_body(to_value(body)?, defaults, opts.ignore_defaults)?;
        let body = body.map_or(RequestBody::None, RequestBody::Json);

        let request = self.prepare(path, &opts, Method::POST, true, body);
        self.execute(request).await
    }

    /// POST a JSON body and decode the response into `T`.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        opts: RequestOptions,
    ) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, body, opts).await?.into_json()
    }

    /// POST a multipart form. The body is sent unmodified.
    #[instrument(skip(self, form, opts), fields(parts = form.len()))]
    pub async fn post_form_data(
        &self,
        path: &str,
        form: FormData,
        opts: RequestOptions,
    ) -> Result<Payload, Error> {
        let request = self.prepare(path, &opts, Method::POST, false, RequestBody::Form(form));
        self.execute(request).await
    }

    /// Fetch a binary resource, sending an optional JSON body with
    /// `Content-Type: blob`. The method defaults to GET.
    #[instrument(skip(self, body, opts))]
    pub async fn post_blob<B>(
        &self,
        path: &str,
        body: Option<&B>,
        opts: RequestOptions,
    ) -> Result<Vec<u8>, Error>
    where
        B: Serialize + ?Sized,
    {
        let body = to_value(body)?
            .map(|value| serde_json::to_string(&value))
            .transpose()
            .map_err(|e| InvalidInputError::Body {
                reason: e.to_string(),
            })?
            .map_or(RequestBody::None, RequestBody::Json);

        let opts = opts
            .header("Content-Type", "blob")
            .response_type(ResponseType::Binary);
        let request = self.prepare(path, &opts, Method::GET, false, body);
        Ok(self.execute(request).await?.into_bytes())
    }

    /// POST raw bytes. Set a `Content-Type` header through `opts` if needed.
    #[instrument(skip(self, bytes, opts), fields(len = bytes.len()))]
    pub async fn upload_file(
        &self,
        path: &str,
        bytes: Vec<u8>,
        opts: RequestOptions,
    ) -> Result<Payload, Error> {
        let request = self.prepare(path, &opts, Method::POST, false, RequestBody::Bytes(bytes));
        self.execute(request).await
    }

    /// Refresh the access token now.
    ///
    /// Joins a refresh already in flight instead of starting another. On
    /// failure the session is cleared.
    pub async fn refresh(&self) -> Result<(), Error> {
        let http = self.inner.http.clone();
        let session = self.inner.session.clone();

        let outcome = self
            .inner
            .refresh
            .join_or_start(move || {
                async move {
                    match refresh_tokens(&http, &session).await {
                        Ok(()) => Ok(()),
                        Err(err) => {
                            warn!(error = %err, "Token refresh failed; clearing session");
                            if let Err(clear_err) = session.clear_tokens() {
                                warn!(error = %clear_err, "Failed to clear stored tokens");
                            }
                            Err(Arc::new(err))
                        }
                    }
                }
                .boxed()
            })
            .await;

        outcome.map_err(|err| {
            AuthError::RefreshFailed {
                reason: err.to_string(),
            }
            .into()
        })
    }

    fn prepare(
        &self,
        path: &str,
        opts: &RequestOptions,
        default_method: Method,
        json_content_type: bool,
        body: RequestBody,
    ) -> PreparedRequest {
        let config = self.inner.session.config();
        PreparedRequest {
            method: opts.method.clone().unwrap_or(default_method),
            url: compose_url(
                self.base_url(),
                path,
                opts.query.as_deref(),
                &config.default_params,
                opts.ignore_defaults,
            ),
            headers: opts.headers.clone(),
            json_content_type,
            body,
            response_type: opts.response_type,
        }
    }

    /// Send a request, refreshing and retrying once on 401.
    async fn execute(&self, request: PreparedRequest) -> Result<Payload, Error> {
        let session = &self.inner.session;
        let sent_with = session.access_token();

        let err = match self.send(&request, sent_with.as_ref()).await {
            Err(err) if err.is_unauthorized() => err,
            other => return other,
        };

        let current = session.access_token();
        if current.is_some() && current != sent_with {
            debug!("Access token changed while the request was in flight; retrying");
        } else if let Err(refresh_err) = self.refresh().await {
            debug!(error = %refresh_err, "Returning original error after failed refresh");
            return Err(err);
        }

        let token = session.access_token();
        self.send(&request, token.as_ref()).await
    }

    async fn send(
        &self,
        request: &PreparedRequest,
        access_token: Option<&crate::tokens::AccessToken>,
    ) -> Result<Payload, Error> {
        dispatch::send(
            &self.inner.http,
            self.inner.session.config(),
            request,
            access_token,
        )
        .await
    }
}

fn to_value<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<serde_json::Value>, Error> {
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|e| {
            InvalidInputError::Body {
                reason: e.to_string(),
            }
            .into()
        })
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", self.base_url())
            .field("session", &self.inner.session)
            .finish()
    }
}
