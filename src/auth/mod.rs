//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the JWT access/refresh token pair and cached profile,
//!   with login / refresh / logout operations and derived expiry predicates
//! - `SessionStorage`: durable client-side storage for the session fields,
//!   with file, OS-keychain, and in-memory backends
//! - `token`: expiry inspection of the JWT `exp` claim
//!
//! The session survives a restart: each field is persisted as its own
//! storage entry and rehydrated when the store is constructed.

pub mod error;
pub mod session;
pub mod storage;
pub mod token;

pub use error::AuthError;
pub use session::SessionStore;
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionKey, SessionStorage};
