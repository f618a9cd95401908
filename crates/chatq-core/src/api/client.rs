use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::backend::{ByteStream, ChatBackend};
use crate::api::error::ApiError;
use crate::api::types::{
    ChatRequest, ChatResponse, FeedbackRequest, HandoffRequest, HandoffTicket, HistoryMessage,
};
use crate::config::ClientConfig;

pub const TENANT_HEADER: &str = "X-Tenant-ID";
const EVENT_STREAM: &str = "text/event-stream";

/// `ChatBackend` over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: Url,
    tenant_id: String,
    auth_token: Option<String>,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            tenant_id: config.tenant_id.clone(),
            auth_token: None,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Attach a bearer token issued by the auth collaborator.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL can always carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(target: "http", %method, %url, "Backend request");

        let mut builder = self
            .http_client
            .request(method, url)
            .timeout(self.request_timeout)
            .header(TENANT_HEADER, &self.tenant_id);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let details = response.text().await.unwrap_or_default();
    Err(ApiError::status(status, details))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = ensure_success(response).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        details: e.to_string(),
    })
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError> {
        let response = self
            .request(Method::POST, &["stream"])
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ApiError::from));
        Ok(Box::pin(bytes))
    }

    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let response = self
            .request(Method::POST, &[])
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryMessage>, ApiError> {
        let response = self
            .request(Method::GET, &["history", session_id])
            .send()
            .await?;
        read_json(response).await
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &["feedback"])
            .json(request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn request_handoff(&self, request: &HandoffRequest) -> Result<HandoffTicket, ApiError> {
        let response = self
            .request(Method::POST, &["handoff"])
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpBackend {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let backend = backend("http://localhost:8080/api/chat");
        assert_eq!(
            backend.endpoint(&["stream"]).as_str(),
            "http://localhost:8080/api/chat/stream"
        );
    }

    #[test]
    fn endpoint_without_segments_is_the_base() {
        let backend = backend("http://localhost:8080/api/chat/");
        assert_eq!(backend.endpoint(&[]).as_str(), "http://localhost:8080/api/chat");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let backend = backend("http://localhost:8080/api/chat/");
        assert_eq!(
            backend.endpoint(&["history", "abc"]).as_str(),
            "http://localhost:8080/api/chat/history/abc"
        );
    }

    #[test]
    fn endpoint_escapes_session_id() {
        let backend = backend("http://localhost:8080/api/chat");
        assert_eq!(
            backend.endpoint(&["history", "a/b c"]).as_str(),
            "http://localhost:8080/api/chat/history/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let config = ClientConfig {
            base_url: "mailto:support@example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpBackend::new(&config),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn empty_auth_token_is_ignored() {
        let backend = backend("http://localhost:8080/api/chat").with_auth_token(Some(String::new()));
        assert!(backend.auth_token.is_none());
    }
}
