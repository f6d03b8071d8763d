//! Authentication session.
//!
//! The session is the single source of truth for the current tokens. It is
//! hydrated once from a [`TokenStore`], mutated only by
//! [`AuthSession::authenticate`] and [`AuthSession::clear_tokens`], and
//! broadcasts every change over a `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ApiConfig;
use crate::error::Error;
use crate::store::TokenStore;
use crate::tokens::{AccessToken, RefreshToken, ResponseTokens, Tokens};

/// A point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// `None` before hydration or when nothing was stored; the cleared
    /// sentinel pair after a logout.
    pub tokens: Option<Tokens>,
    /// True until the initial restore has run.
    pub is_loading: bool,
}

impl SessionState {
    fn initializing() -> Self {
        Self {
            tokens: None,
            is_loading: true,
        }
    }

    /// Both `None` and the cleared sentinel count as anonymous.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.as_ref().is_some_and(|t| !t.is_cleared())
    }
}

/// Shared authentication state.
///
/// Sessions are cheap to clone (they use internal `Arc`); every clone sees
/// the same state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use authfetch::{ApiConfig, AuthSession, BaseUrl, MemoryTokenStore, ResponseTokens};
///
/// let config = ApiConfig::new(BaseUrl::new("https://api.example.com").unwrap());
/// let session = AuthSession::new(Arc::new(MemoryTokenStore::new()), config);
/// session.restore();
/// assert!(!session.is_authenticated());
///
/// session.authenticate(ResponseTokens::new("access", "refresh")).unwrap();
/// assert!(session.is_authenticated());
/// ```
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn TokenStore>,
    config: ApiConfig,
    state: watch::Sender<SessionState>,
    restored: AtomicBool,
}

impl AuthSession {
    /// Create a session in the initializing state. Call [`restore`](Self::restore)
    /// to hydrate it from the store.
    pub fn new(store: Arc<dyn TokenStore>, config: ApiConfig) -> Self {
        let (state, _) = watch::channel(SessionState::initializing());
        Self {
            inner: Arc::new(SessionInner {
                store,
                config,
                state,
                restored: AtomicBool::new(false),
            }),
        }
    }

    /// Create a session and hydrate it immediately.
    pub fn restored(store: Arc<dyn TokenStore>, config: ApiConfig) -> Self {
        let session = Self::new(store, config);
        session.restore();
        session
    }

    /// Hydrate the session from the token store.
    ///
    /// Only the first call has any effect. A missing access token is read as
    /// an empty string as long as a refresh token is present. Tokens already
    /// set by `authenticate` or `clear_tokens` are left alone.
    #[instrument(skip(self))]
    pub fn restore(&self) {
        if self.inner.restored.swap(true, Ordering::SeqCst) {
            return;
        }

        let keys = &self.inner.config.token_keys;
        let restored = self.inner.store.get(&keys.refresh).map(|refresh| {
            let access = self.inner.store.get(&keys.access).unwrap_or_default();
            Tokens::new(access, refresh)
        });

        match &restored {
            Some(_) => info!("Restored session from token store"),
            None => debug!("No stored refresh token; session is anonymous"),
        }

        self.inner.state.send_modify(|state| {
            if state.tokens.is_none() {
                state.tokens = restored;
            }
            state.is_loading = false;
        });
    }

    /// Store a freshly issued token pair and mark the session authenticated.
    ///
    /// The in-memory state is updated even if persisting fails; the store
    /// error is returned afterwards.
    #[instrument(skip(self, tokens))]
    pub fn authenticate(&self, tokens: ResponseTokens) -> Result<(), Error> {
        let keys = &self.inner.config.token_keys;
        let persisted = self
            .inner
            .store
            .set(&keys.access, &tokens.access_token)
            .and_then(|()| self.inner.store.set(&keys.refresh, &tokens.refresh_token));

        let tokens = Tokens::from(tokens);
        self.inner.state.send_if_modified(|state| {
            let changed = state.tokens.as_ref() != Some(&tokens) || state.is_loading;
            state.tokens = Some(tokens);
            state.is_loading = false;
            changed
        });
        info!("Session authenticated");

        persisted.map_err(|err| {
            warn!(error = %err, "Failed to persist tokens");
            err.into()
        })
    }

    /// Forget the current tokens and invoke the logout callback.
    ///
    /// The session always ends up anonymous and the callback always runs,
    /// even if removing the stored entries fails.
    #[instrument(skip(self))]
    pub fn clear_tokens(&self) -> Result<(), Error> {
        self.inner.state.send_modify(|state| {
            state.tokens = Some(Tokens::cleared());
            state.is_loading = false;
        });

        let keys = &self.inner.config.token_keys;
        let access = self.inner.store.remove(&keys.access);
        let refresh = self.inner.store.remove(&keys.refresh);

        if let Some(callback) = &self.inner.config.logout_callback {
            callback();
        }
        info!("Session cleared");

        access.and(refresh).map_err(|err| {
            warn!(error = %err, "Failed to remove stored tokens");
            err.into()
        })
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn tokens(&self) -> Option<Tokens> {
        self.inner.state.borrow().tokens.clone()
    }

    /// The current access token, or `None` when absent or cleared.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner
            .state
            .borrow()
            .tokens
            .as_ref()
            .map(|t| t.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    /// The current refresh token, or `None` when absent or cleared.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.inner
            .state
            .borrow()
            .tokens
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the initial restore has completed.
    pub async fn loaded(&self) -> SessionState {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("AuthSession")
            .field("base_url", &self.inner.config.base_url)
            .field("authenticated", &state.is_authenticated())
            .field("is_loading", &state.is_loading)
            .finish()
    }
}
