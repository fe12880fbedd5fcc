use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the session operations.
///
/// `fetch_profile` never surfaces an error; everything else maps onto one
/// of these variants.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Token refresh rejected")]
    RefreshFailed,

    #[error("Authentication server error (status {0})")]
    ServerError(StatusCode),

    #[error("Authentication request failed: {0}")]
    Unknown(String),
}
