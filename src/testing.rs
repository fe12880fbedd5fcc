//! Shared test doubles for session and pipeline tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use reqwest::StatusCode;

use crate::api::transport::{HttpTransport, RequestParts, ResponseParts, TransportError};

/// Transport that replays a scripted queue of responses and records every
/// request it was asked to send. An empty queue answers 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<ResponseParts, TransportError>>>,
    requests: Mutex<Vec<RequestParts>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(ResponseParts {
                status: StatusCode::from_u16(status).expect("valid status code"),
                body: body.to_string(),
            }));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(TransportError::Other(message.to_string())));
    }

    pub fn requests(&self) -> Vec<RequestParts> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many recorded requests hit a URL containing `fragment`.
    pub fn requests_to(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: RequestParts) -> Result<ResponseParts, TransportError> {
        // Suspend once so concurrent callers interleave like real I/O
        tokio::task::yield_now().await;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ResponseParts {
                    status: StatusCode::NOT_FOUND,
                    body: String::new(),
                })
            })
    }
}

/// Mint an unsigned JWT whose payload carries the given `exp` claim.
pub fn make_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

pub fn valid_jwt() -> String {
    make_jwt(Utc::now().timestamp() + 3600)
}

pub fn expired_jwt() -> String {
    make_jwt(Utc::now().timestamp() - 3600)
}
