//! Token refresh and its single-flight coordination.
//!
//! The first caller that needs a refresh creates a shared future and parks
//! it in the coordinator's slot. Callers arriving while it runs clone and
//! await the same future. The future empties the slot when it finishes, so
//! the next 401 starts a fresh refresh.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{AuthError, Error, InvalidInputError};
use crate::session::AuthSession;
use crate::tokens::ResponseTokens;

use super::dispatch;
use super::request::{PreparedRequest, RequestBody, ResponseType, compose_url};

/// Outcome shared between every waiter of one refresh.
pub(crate) type RefreshOutcome = Result<(), Arc<Error>>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Request body for the refresh endpoint.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from the refresh endpoint.
///
/// Only `access_token` is relied upon; everything else is optional.
#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub access_token_expiration: Option<i64>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Holds at most one in-flight refresh.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    /// Join the running refresh, or start one with `start`.
    pub(crate) fn join_or_start<F>(self: &Arc<Self>, start: F) -> SharedRefresh
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.as_ref() {
            debug!("Joining in-flight token refresh");
            return running.clone();
        }

        let coordinator: Weak<Self> = Arc::downgrade(self);
        let refresh = start();
        let shared = async move {
            let outcome = refresh.await;
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
            }
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }

    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Exchange the session's refresh token for a new access token.
///
/// On success the session is re-authenticated with the new access token
/// (or the previous one if the response omits it) and the reissued refresh
/// token (or the current one).
#[instrument(skip_all)]
pub(crate) async fn refresh_tokens(
    http: &reqwest::Client,
    session: &AuthSession,
) -> Result<(), Error> {
    let refresh_token = session
        .refresh_token()
        .ok_or(AuthError::MissingRefreshToken)?;
    let previous_access = session.access_token();
    let config = session.config();

    let body = serde_json::to_string(&RefreshRequest {
        refresh_token: refresh_token.as_str(),
    })
    .map_err(|e| InvalidInputError::Body {
        reason: e.to_string(),
    })?;

    let request = PreparedRequest {
        method: reqwest::Method::POST,
        url: compose_url(
            &config.base_url,
            &config.refresh_path,
            None,
            &config.default_params,
            false,
        ),
        headers: Vec::new(),
        json_content_type: true,
        body: RequestBody::Json(body),
        response_type: ResponseType::Json,
    };

    info!("Refreshing access token");
    let response: RefreshResponse = dispatch::send(http, config, &request, previous_access.as_ref())
        .await?
        .into_json()?;

    let access_token = response
        .access_token
        .filter(|t| !t.is_empty())
        .or_else(|| previous_access.map(|t| t.as_str().to_string()))
        .unwrap_or_default();
    let refresh_token = response
        .refresh_token
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| refresh_token.as_str().to_string());

    // The in-memory session holds the new pair even if persisting fails,
    // so a store error does not fail the refresh.
    if let Err(err) = session.authenticate(ResponseTokens {
        access_token,
        refresh_token,
        token_type: response.token_type,
    }) {
        debug!(error = %err, "Refreshed tokens were not persisted");
    }

    debug!("Access token refreshed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::default());
        let starts = Arc::new(AtomicUsize::new(0));

        let start = |starts: Arc<AtomicUsize>| {
            move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<(), Arc<Error>>(())
                }
                .boxed()
            }
        };

        let a = coordinator.join_or_start(start(starts.clone()));
        let b = coordinator.join_or_start(start(starts.clone()));
        let (ra, rb) = tokio::join!(a, b);

        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_idle());

        // A later refresh starts afresh.
        coordinator.join_or_start(start(starts.clone())).await.unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_is_shared_and_slot_is_cleared() {
        let coordinator = Arc::new(RefreshCoordinator::default());
        let failing = || {
            async { Err::<(), _>(Arc::new(Error::from(AuthError::MissingRefreshToken))) }.boxed()
        };

        let a = coordinator.join_or_start(failing);
        let b = coordinator.join_or_start(|| async { Ok::<(), Arc<Error>>(()) }.boxed());
        let (ra, rb) = tokio::join!(a, b);

        assert!(ra.is_err());
        assert!(rb.is_err());
        assert!(coordinator.is_idle());
    }

    #[test]
    fn refresh_response_fields_are_optional() {
        let response: RefreshResponse = serde_json::from_str(r#"{"token_type":"Bearer"}"#).unwrap();
        assert!(response.access_token.is_none());
        assert_eq!(response.token_type.as_deref(), Some("Bearer"));
    }
}
