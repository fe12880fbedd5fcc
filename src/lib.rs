//! Client core for the pharmatrack obligation tracker.
//!
//! This crate talks to the pharmatrack REST API, which manages
//! pharmacovigilance agreements (PVAs), the obligations they impose, the
//! tasks that discharge those obligations, and the audit trail behind all
//! of it.
//!
//! The two central pieces are:
//!
//! - [`auth::SessionStore`] - owns the JWT access/refresh token pair and the
//!   cached user profile, persists them across restarts, and implements the
//!   login / refresh / logout lifecycle.
//! - [`api::ApiClient`] - wraps every outbound request with bearer-token
//!   attachment and a single transparent refresh-and-retry on HTTP 401,
//!   and exposes typed methods for each API resource.
//!
//! Wiring the pieces together:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pharmatrack::api::{ApiClient, ReqwestTransport};
//! use pharmatrack::auth::{FileStorage, SessionStore};
//! use pharmatrack::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let base_url = config.resolve_api_url()?;
//!
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let storage = Arc::new(FileStorage::new(Config::session_dir()?));
//! let session = Arc::new(SessionStore::new(&base_url, transport.clone(), storage));
//!
//! if !session.is_authenticated() {
//!     session.login("alice", "secret").await?;
//! }
//!
//! let client = ApiClient::new(&base_url, transport, session);
//! let tasks = client.assigned_tasks().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, SessionStore};
pub use config::Config;
