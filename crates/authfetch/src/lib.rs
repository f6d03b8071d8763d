//! authfetch - bearer-token HTTP client with persistent tokens.
//!
//! Three layers, leaf first:
//!
//! - [`TokenStore`]: durable string key/value storage for the access and
//!   refresh tokens ([`MemoryTokenStore`], [`FileTokenStore`]).
//! - [`AuthSession`]: the single source of truth for the current tokens,
//!   hydrated once from the store and observable through a `watch` channel.
//! - [`ApiClient`]: sends requests with `Authorization: Bearer <token>`,
//!   decodes responses uniformly and, on a 401, runs a single shared
//!   refresh before retrying the request once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authfetch::{ApiClient, ApiConfig, AuthSession, BaseUrl, FileTokenStore, RequestOptions};
//!
//! # async fn example() -> Result<(), authfetch::Error> {
//! let config = ApiConfig::new(BaseUrl::new("https://api.example.com/")?)
//!     .on_logout(|| eprintln!("logged out"));
//! let store = Arc::new(FileTokenStore::new_default()?);
//! let session = AuthSession::restored(store, config);
//! let client = ApiClient::new(session)?;
//!
//! let items = client
//!     .fetch("items", RequestOptions::new().query("page=1"))
//!     .await?;
//! println!("{:?}", items);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod tokens;

// Re-export primary types at crate root for convenience
pub use client::{ApiClient, FormData, Payload, RequestOptions, ResponseType};
pub use config::{ApiConfig, BaseUrl, ErrorResponse};
pub use error::Error;
pub use session::{AuthSession, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenKeys, TokenStore};
pub use tokens::{AccessToken, RefreshToken, ResponseTokens, Tokens};

pub use reqwest::Method;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
