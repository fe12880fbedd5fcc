//! Authenticated request pipeline for the pharmatrack REST API.
//!
//! `ApiClient` decorates an [`HttpTransport`] with two stages:
//!
//! - pre-request: attach the session's access token as a bearer credential,
//!   but only while it is present and unexpired
//! - post-response: on HTTP 401, refresh the access token once and replay
//!   the identical request; on refresh failure, log out and surface the
//!   original error
//!
//! The retry marker is an explicit flag local to the pipeline, so a
//! replayed request that 401s again is never retried a second time.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::models::{
    AuditLogEntry, Comment, MedicinalProduct, Obligation, ObligationPayload, Pva, PvaPayload,
    ResponsibilityType, Task, TaskFilter, TaskPayload, User,
};

use super::error::ApiError;
use super::transport::{HttpTransport, RequestParts, ResponseParts};

/// API client bound to one base URL and one shared session.
/// Clone is cheap - transport and session are shared behind `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            session,
        }
    }

    /// The session this client attaches credentials from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    // ===== Pipeline =====

    /// Send a request through the credential-attachment and 401-retry
    /// stages.
    async fn execute(&self, request: RequestParts) -> Result<ResponseParts, ApiError> {
        let mut retried = false;
        let mut bearer = self.session.bearer_for_request();

        loop {
            let outgoing = request.clone().with_bearer(bearer.clone());
            let response = self.transport.send(outgoing).await?;
            if response.status.is_success() {
                return Ok(response);
            }

            let error = ApiError::from_status(response.status, &response.body);
            if response.status != StatusCode::UNAUTHORIZED || retried {
                return Err(error);
            }

            if !self.session.has_usable_refresh_token() {
                // Nothing left that could mint a new access token; drop to
                // a clean anonymous state and surface the original error.
                self.session.logout();
                return Err(error);
            }

            retried = true;
            if let Err(e) = self.session.refresh().await {
                warn!(error = %e, "Token refresh after 401 failed");
                self.session.logout();
                return Err(error);
            }

            debug!(url = %request.url, "Replaying request with renewed access token");
            bearer = self.session.access_token();
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        request: RequestParts,
    ) -> Result<T, ApiError> {
        let url = request.url.clone();
        let response = self.execute(request).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(RequestParts::new(Method::GET, self.endpoint(path)))
            .await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request_json(RequestParts::new(Method::POST, self.endpoint(path)).with_body(body))
            .await
    }

    async fn put_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request_json(RequestParts::new(Method::PUT, self.endpoint(path)).with_body(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(RequestParts::new(Method::DELETE, self.endpoint(path)))
            .await?;
        Ok(())
    }

    fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to serialize body: {}", e)))
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let request = RequestParts::new(Method::GET, self.endpoint("api/tasks/"))
            .with_query(filter.to_query());
        self.request_json(request).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.get_json(&format!("api/tasks/{}/", id)).await
    }

    pub async fn create_task(&self, task: &TaskPayload) -> Result<Task, ApiError> {
        self.post_json("api/tasks/", Self::to_body(task)?).await
    }

    pub async fn update_task(&self, id: i64, task: &TaskPayload) -> Result<Task, ApiError> {
        self.put_json(&format!("api/tasks/{}/", id), Self::to_body(task)?)
            .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("api/tasks/{}/", id)).await
    }

    /// Open tasks assigned to the current user, most urgent deadline first.
    pub async fn assigned_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get_json("api/tasks/assigned/").await
    }

    /// Audit trail of a single task.
    pub async fn task_changelog(&self, id: i64) -> Result<Vec<AuditLogEntry>, ApiError> {
        self.get_json(&format!("api/tasks/{}/changelog/", id)).await
    }

    pub async fn task_comments(&self, id: i64) -> Result<Vec<Comment>, ApiError> {
        self.get_json(&format!("api/tasks/{}/comments/", id)).await
    }

    pub async fn add_task_comment(&self, id: i64, text: &str) -> Result<Comment, ApiError> {
        self.post_json(
            &format!("api/tasks/{}/comments/", id),
            serde_json::json!({ "text": text }),
        )
        .await
    }

    // ===== Obligations =====

    pub async fn list_obligations(&self) -> Result<Vec<Obligation>, ApiError> {
        self.get_json("api/obligations/").await
    }

    pub async fn get_obligation(&self, id: i64) -> Result<Obligation, ApiError> {
        self.get_json(&format!("api/obligations/{}/", id)).await
    }

    pub async fn create_obligation(
        &self,
        obligation: &ObligationPayload,
    ) -> Result<Obligation, ApiError> {
        self.post_json("api/obligations/", Self::to_body(obligation)?)
            .await
    }

    pub async fn update_obligation(
        &self,
        id: i64,
        obligation: &ObligationPayload,
    ) -> Result<Obligation, ApiError> {
        self.put_json(
            &format!("api/obligations/{}/", id),
            Self::to_body(obligation)?,
        )
        .await
    }

    pub async fn delete_obligation(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("api/obligations/{}/", id)).await
    }

    /// Tasks discharging a given obligation.
    pub async fn obligation_tasks(&self, id: i64) -> Result<Vec<Task>, ApiError> {
        self.get_json(&format!("api/obligations/{}/tasks/", id))
            .await
    }

    // ===== PVAs =====

    pub async fn list_pvas(&self) -> Result<Vec<Pva>, ApiError> {
        self.get_json("api/pvas/").await
    }

    pub async fn get_pva(&self, id: i64) -> Result<Pva, ApiError> {
        self.get_json(&format!("api/pvas/{}/", id)).await
    }

    pub async fn create_pva(&self, pva: &PvaPayload) -> Result<Pva, ApiError> {
        self.post_json("api/pvas/", Self::to_body(pva)?).await
    }

    pub async fn update_pva(&self, id: i64, pva: &PvaPayload) -> Result<Pva, ApiError> {
        self.put_json(&format!("api/pvas/{}/", id), Self::to_body(pva)?)
            .await
    }

    pub async fn delete_pva(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("api/pvas/{}/", id)).await
    }

    /// Obligations imposed by a given PVA.
    pub async fn pva_obligations(&self, id: i64) -> Result<Vec<Obligation>, ApiError> {
        self.get_json(&format!("api/pvas/{}/obligations/", id)).await
    }

    // ===== Reference dictionaries =====

    pub async fn list_responsibility_types(&self) -> Result<Vec<ResponsibilityType>, ApiError> {
        self.get_json("api/responsibility-types/").await
    }

    pub async fn create_responsibility_type(
        &self,
        title: &str,
    ) -> Result<ResponsibilityType, ApiError> {
        self.post_json(
            "api/responsibility-types/",
            serde_json::json!({ "title": title }),
        )
        .await
    }

    pub async fn delete_responsibility_type(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("api/responsibility-types/{}/", id))
            .await
    }

    pub async fn list_medicinal_products(&self) -> Result<Vec<MedicinalProduct>, ApiError> {
        self.get_json("api/medicinal-products/").await
    }

    pub async fn create_medicinal_product(
        &self,
        title: &str,
        description: &str,
    ) -> Result<MedicinalProduct, ApiError> {
        self.post_json(
            "api/medicinal-products/",
            serde_json::json!({ "title": title, "description": description }),
        )
        .await
    }

    pub async fn delete_medicinal_product(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("api/medicinal-products/{}/", id)).await
    }

    // ===== Users =====

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("api/users/").await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        self.get_json(&format!("api/users/{}/", id)).await
    }

    /// Update the mutable profile fields of a user. `username` and the
    /// staff/active flags are read-only on the server.
    pub async fn update_user(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, ApiError> {
        let request = RequestParts::new(
            Method::PATCH,
            self.endpoint(&format!("api/users/{}/", id)),
        )
        .with_body(serde_json::json!({
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
        }));
        self.request_json(request).await
    }

    // ===== Audit log =====

    /// The global audit trail, newest first.
    pub async fn audit_log(&self) -> Result<Vec<AuditLogEntry>, ApiError> {
        self.get_json("api/auditlog/").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::api::transport::{TransportError, ResponseParts};
    use crate::auth::storage::{MemoryStorage, SessionKey, SessionStorage};
    use crate::testing::{expired_jwt, valid_jwt, FakeTransport};

    const BASE: &str = "https://pharma.example.org";

    const TASK_JSON: &str = r#"{
        "id": 5,
        "title": "Submit PSUR",
        "status": "NOT_STARTED",
        "deadline": "2026-09-01T12:00:00Z",
        "obligation": 3,
        "created_by": 1
    }"#;

    struct Harness {
        transport: Arc<FakeTransport>,
        storage: Arc<MemoryStorage>,
        client: ApiClient,
    }

    fn harness(access: Option<&str>, refresh: Option<&str>) -> Harness {
        let transport = Arc::new(FakeTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        if let Some(access) = access {
            storage.store(SessionKey::AccessToken, access).unwrap();
        }
        if let Some(refresh) = refresh {
            storage.store(SessionKey::RefreshToken, refresh).unwrap();
        }
        let session = Arc::new(SessionStore::new(
            BASE,
            transport.clone(),
            storage.clone(),
        ));
        let client = ApiClient::new(BASE, transport.clone(), session);
        Harness {
            transport,
            storage,
            client,
        }
    }

    #[tokio::test]
    async fn test_valid_access_token_is_attached() {
        let access = valid_jwt();
        let h = harness(Some(&access), Some(&valid_jwt()));
        h.transport.push_response(200, TASK_JSON);

        let task = h.client.get_task(5).await.unwrap();
        assert_eq!(task.id, 5);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, format!("{}/api/tasks/5/", BASE));
        assert_eq!(requests[0].bearer.as_deref(), Some(access.as_str()));
    }

    #[tokio::test]
    async fn test_expired_access_token_is_not_attached() {
        let h = harness(Some(&expired_jwt()), None);
        h.transport.push_response(200, "[]");

        h.client.list_obligations().await.unwrap();
        assert_eq!(h.transport.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_replays_with_new_token() {
        let old_access = valid_jwt();
        let refresh = valid_jwt();
        let new_access = valid_jwt();

        let h = harness(Some(&old_access), Some(&refresh));
        h.transport.push_response(401, "");
        h.transport
            .push_response(200, &format!(r#"{{"access":"{}"}}"#, new_access));
        h.transport.push_response(200, TASK_JSON);

        let task = h.client.get_task(5).await.unwrap();
        assert_eq!(task.id, 5);

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].url, format!("{}/api/token/refresh", BASE));
        // Replay hits the same URL with the renewed token
        assert_eq!(requests[2].url, requests[0].url);
        assert_eq!(requests[2].bearer.as_deref(), Some(new_access.as_str()));

        // Refresh token itself is untouched by the renewal
        assert_eq!(
            h.client.session().access_token().as_deref(),
            Some(new_access.as_str())
        );
        assert_eq!(
            h.client.session().refresh_token().as_deref(),
            Some(refresh.as_str())
        );
    }

    #[tokio::test]
    async fn test_replay_carries_method_and_body_unchanged() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(401, "");
        h.transport
            .push_response(200, &format!(r#"{{"access":"{}"}}"#, valid_jwt()));
        h.transport.push_response(201, TASK_JSON);

        let payload = TaskPayload {
            title: "Submit PSUR".to_string(),
            description: String::new(),
            obligation: 3,
            deadline: "2026-09-01T12:00:00Z".parse().unwrap(),
            assigned_to: Some(2),
            is_recurring: false,
            schedule: None,
            completion_evidence_link: None,
        };
        h.client.create_task(&payload).await.unwrap();

        let requests = h.transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[2].method, Method::POST);
        assert_eq!(requests[2].body, requests[0].body);
        assert_eq!(requests[2].query, requests[0].query);
    }

    #[tokio::test]
    async fn test_401_with_expired_refresh_token_logs_out() {
        let h = harness(Some(&valid_jwt()), Some(&expired_jwt()));
        h.transport.push_response(401, "");

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));

        // No refresh call, no replay, session fully cleared
        assert_eq!(h.transport.requests().len(), 1);
        assert_eq!(h.transport.requests_to("token/refresh"), 0);
        assert!(h.client.session().access_token().is_none());
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn test_401_without_refresh_token_logs_out() {
        let h = harness(Some(&valid_jwt()), None);
        h.transport.push_response(401, "");

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(h.transport.requests().len(), 1);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn test_second_401_is_not_retried_again() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(401, "");
        h.transport
            .push_response(200, &format!(r#"{{"access":"{}"}}"#, valid_jwt()));
        h.transport.push_response(401, "");

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));

        // original + refresh + replay, then no further attempts
        assert_eq!(h.transport.requests().len(), 3);
        assert_eq!(h.transport.requests_to("token/refresh"), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_original_error_and_logs_out() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(401, r#"{"detail":"expired"}"#);
        h.transport.push_response(401, r#"{"detail":"refresh not valid"}"#);

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));

        assert_eq!(h.transport.requests().len(), 2);
        assert!(h.client.session().refresh_token().is_none());
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn test_non_401_errors_propagate_without_side_effects() {
        let access = valid_jwt();
        let h = harness(Some(&access), Some(&valid_jwt()));
        h.transport.push_response(500, "boom");

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError { .. }));

        assert_eq!(h.transport.requests().len(), 1);
        assert!(h.client.session().is_authenticated());
        assert_eq!(
            h.client.session().access_token().as_deref(),
            Some(access.as_str())
        );
    }

    #[tokio::test]
    async fn test_list_tasks_sends_filter_query() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(200, "[]");

        let filter = TaskFilter {
            status: Some(crate::models::TaskStatus::InProgress),
            assigned_to_username: Some("bob".to_string()),
            ..TaskFilter::default()
        };
        h.client.list_tasks(&filter).await.unwrap();

        let request = &h.transport.requests()[0];
        assert_eq!(request.url, format!("{}/api/tasks/", BASE));
        assert!(request
            .query
            .contains(&("status".to_string(), "IN_PROGRESS".to_string())));
        assert!(request
            .query
            .contains(&("assigned_to__username__iexact".to_string(), "bob".to_string())));
    }

    #[tokio::test]
    async fn test_resource_paths() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        for _ in 0..4 {
            h.transport.push_response(200, "[]");
        }

        h.client.assigned_tasks().await.unwrap();
        h.client.task_changelog(12).await.unwrap();
        h.client.pva_obligations(1).await.unwrap();
        h.client.audit_log().await.unwrap();

        let urls: Vec<String> = h.transport.requests().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls[0], format!("{}/api/tasks/assigned/", BASE));
        assert_eq!(urls[1], format!("{}/api/tasks/12/changelog/", BASE));
        assert_eq!(urls[2], format!("{}/api/pvas/1/obligations/", BASE));
        assert_eq!(urls[3], format!("{}/api/auditlog/", BASE));
    }

    #[tokio::test]
    async fn test_delete_ignores_empty_body() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(204, "");

        h.client.delete_task(5).await.unwrap();

        let request = &h.transport.requests()[0];
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url, format!("{}/api/tasks/5/", BASE));
    }

    #[tokio::test]
    async fn test_garbage_success_body_is_invalid_response() {
        let h = harness(Some(&valid_jwt()), Some(&valid_jwt()));
        h.transport.push_response(200, "<html>not json</html>");

        let err = h.client.get_task(5).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    /// Transport that 401s anything not carrying the renewed token, and
    /// answers every refresh with that token. Used to observe concurrent
    /// 401 handling.
    struct RenewingTransport {
        new_access: String,
        requests: Mutex<Vec<RequestParts>>,
    }

    #[async_trait]
    impl crate::api::transport::HttpTransport for RenewingTransport {
        async fn send(&self, request: RequestParts) -> Result<ResponseParts, TransportError> {
            tokio::task::yield_now().await;
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            let (status, body) = if request.url.contains("token/refresh") {
                (200, format!(r#"{{"access":"{}"}}"#, self.new_access))
            } else if request.bearer.as_deref() == Some(self.new_access.as_str()) {
                (200, "[]".to_string())
            } else {
                (401, String::new())
            };
            Ok(ResponseParts {
                status: reqwest::StatusCode::from_u16(status).expect("valid status code"),
                body,
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_401s_issue_duplicate_refresh_calls() {
        let new_access = crate::testing::make_jwt(Utc::now().timestamp() + 7200);
        let transport = Arc::new(RenewingTransport {
            new_access,
            requests: Mutex::new(Vec::new()),
        });

        let storage = Arc::new(MemoryStorage::new());
        storage
            .store(SessionKey::AccessToken, &valid_jwt())
            .unwrap();
        storage
            .store(SessionKey::RefreshToken, &valid_jwt())
            .unwrap();

        let session = Arc::new(SessionStore::new(BASE, transport.clone(), storage));
        let client = ApiClient::new(BASE, transport.clone(), session);

        let (a, b) = futures::join!(client.audit_log(), client.list_obligations());
        a.unwrap();
        b.unwrap();

        // No single-flight coalescing: both in-flight requests saw the 401
        // and each minted its own refresh call.
        let refresh_calls = transport
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.url.contains("token/refresh"))
            .count();
        assert_eq!(refresh_calls, 2);
    }
}
