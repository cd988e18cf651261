use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{BlockId, LessonId, TestId},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        BlockBundle, BlockTestBundle, CompleteBlockRequest, CompleteBlockResponse,
        CompleteLessonRequest, CompleteLessonResponse, DashboardBundle, DetailedProgress,
        EndSessionRequest, EndSessionResponse, LessonBundle, ProfileBundle, ProgressSummary,
        ProgressUpdateRequest, ProgressUpdateResponse, StartSessionResponse,
        SubmitBlockTestRequest, SubmitBlockTestResponse, UserSummary, VerifyTokenRequest,
        VerifyTokenResponse,
    },
};
use tracing::{debug, error, warn};

use crate::token_store::TokenStore;

pub const VERIFY_TOKEN_ENDPOINT: &str = "/verify_token/";
pub const DASHBOARD_ENDPOINT: &str = "/dashboard/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
        }
    }

    pub fn post(body: &impl Serialize) -> Result<Self, ApiException> {
        let body = serde_json::to_value(body).map_err(ApiException::malformed)?;
        Ok(Self {
            method: Method::Post,
            body: Some(body),
        })
    }

    pub fn post_empty() -> Self {
        Self {
            method: Method::Post,
            body: None,
        }
    }
}

/// One round trip to the backend. Any error means the outcome is unknown.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn call(&self, endpoint: &str, request: ApiRequest) -> Result<Value, ApiException>;
}

pub struct HttpApiClient {
    http: Client,
    api_base: String,
    csrf_token: Option<String>,
    tokens: Arc<dyn TokenStore>,
}

impl HttpApiClient {
    pub fn new(
        api_base: impl Into<String>,
        csrf_token: Option<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiException> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ApiException::transport)?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            csrf_token,
            tokens,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn auth_token(&self, endpoint: &str) -> Option<String> {
        if endpoint.contains(VERIFY_TOKEN_ENDPOINT) {
            return None;
        }
        match self.tokens.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "api: failed to read stored token, sending without it");
                None
            }
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(&self, endpoint: &str, request: ApiRequest) -> Result<Value, ApiException> {
        let url = format!("{}{}", self.api_base, endpoint);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        }
        .header(CONTENT_TYPE, "application/json")
        .header("X-Requested-With", "XMLHttpRequest");

        if let Some(csrf) = &self.csrf_token {
            builder = builder.header("X-CSRFToken", csrf);
        }
        if let Some(token) = self.auth_token(endpoint) {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            error!(endpoint, error = %err, "api: request failed");
            ApiException::transport(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ApiError>(&raw).ok();
            let err = ApiException::from_status(status.as_u16(), body);
            if err.code == ErrorCode::Unauthorized {
                if let Err(clear_err) = self.tokens.clear() {
                    warn!(error = %clear_err, "api: failed to clear rejected token");
                }
            }
            error!(endpoint, status = status.as_u16(), code = ?err.code, "api: call rejected");
            return Err(err);
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|err| ApiException::malformed(format!("{endpoint}: {err}")))?;
        debug!(endpoint, "api: call succeeded");
        Ok(value)
    }
}

/// Typed endpoint wrappers over an injected [`ApiClient`].
#[derive(Clone)]
pub struct Backend {
    client: Arc<dyn ApiClient>,
}

impl Backend {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self { client }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiException> {
        let value = self.client.call(endpoint, ApiRequest::get()).await?;
        decode(endpoint, value)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiException> {
        let value = self.client.call(endpoint, ApiRequest::post(body)?).await?;
        decode(endpoint, value)
    }

    /// Never fails: anything other than a confirmed valid token reads as invalid.
    pub async fn verify_token(&self, token: &str) -> VerifyTokenResponse {
        let request = VerifyTokenRequest {
            token: token.to_string(),
        };
        match self.post(VERIFY_TOKEN_ENDPOINT, &request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "auth: token verification failed");
                VerifyTokenResponse::default()
            }
        }
    }

    /// Cookie-session probe: the dashboard answers with a `user` for a live session.
    pub async fn session_user(&self) -> Result<Option<UserSummary>, ApiException> {
        let value = self.client.call(DASHBOARD_ENDPOINT, ApiRequest::get()).await?;
        match value.get("user") {
            Some(user) if !user.is_null() => decode(DASHBOARD_ENDPOINT, user.clone()).map(Some),
            _ => Ok(None),
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardBundle, ApiException> {
        self.get(DASHBOARD_ENDPOINT).await
    }

    pub async fn lesson_detail(&self, lesson_id: LessonId) -> Result<LessonBundle, ApiException> {
        let endpoint = format!("/lessons/{lesson_id}/");
        let value = self.client.call(&endpoint, ApiRequest::get()).await?;
        if let Ok(body) = serde_json::from_value::<ApiError>(value.clone()) {
            if body.is_locked {
                return Err(ApiException::from_status(403, Some(body)));
            }
        }
        decode(&endpoint, value)
    }

    pub async fn update_progress(
        &self,
        update: &ProgressUpdateRequest,
    ) -> Result<ProgressUpdateResponse, ApiException> {
        self.post("/progress/update/", update).await
    }

    pub async fn complete_lesson(
        &self,
        request: &CompleteLessonRequest,
    ) -> Result<CompleteLessonResponse, ApiException> {
        self.post("/lessons/complete/", request).await
    }

    pub async fn block_detail(&self, block_id: BlockId) -> Result<BlockBundle, ApiException> {
        self.get(&format!("/blocks/{block_id}/")).await
    }

    pub async fn complete_block(
        &self,
        block_id: BlockId,
    ) -> Result<CompleteBlockResponse, ApiException> {
        self.post("/blocks/complete/", &CompleteBlockRequest { block_id })
            .await
    }

    pub async fn start_block_test(
        &self,
        block_id: BlockId,
    ) -> Result<BlockTestBundle, ApiException> {
        self.get(&format!("/block-test/{block_id}/start/")).await
    }

    pub async fn submit_block_test(
        &self,
        test_id: TestId,
        request: &SubmitBlockTestRequest,
    ) -> Result<SubmitBlockTestResponse, ApiException> {
        self.post(&format!("/block-test/{test_id}/submit/"), request)
            .await
    }

    pub async fn user_profile(&self) -> Result<ProfileBundle, ApiException> {
        self.get("/user/profile/").await
    }

    pub async fn progress_detailed(&self) -> Result<DetailedProgress, ApiException> {
        self.get("/progress/detailed/").await
    }

    pub async fn progress_summary(&self) -> Result<ProgressSummary, ApiException> {
        self.get("/progress/detail/").await
    }

    pub async fn start_study_session(&self) -> Result<StartSessionResponse, ApiException> {
        let value = self
            .client
            .call("/sessions/start/", ApiRequest::post_empty())
            .await?;
        decode("/sessions/start/", value)
    }

    pub async fn end_study_session(
        &self,
        request: &EndSessionRequest,
    ) -> Result<EndSessionResponse, ApiException> {
        self.post("/sessions/end/", request).await
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ApiException> {
    serde_json::from_value(value).map_err(|err| {
        error!(endpoint, error = %err, "api: unexpected response shape");
        ApiException::malformed(format!("{endpoint}: {err}"))
    })
}
