//! REST API client module for the pharmatrack service.
//!
//! This module provides the `ApiClient` for communicating with the
//! pharmatrack API: tasks, obligations, PVAs, reference dictionaries,
//! users, and the audit log.
//!
//! The API uses JWT bearer token authentication; the client transparently
//! refreshes the access token once when a request is rejected with 401.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{HttpTransport, ReqwestTransport};
