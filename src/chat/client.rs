//! HTTP client for the chat service

use reqwest::Client;

use super::error::ChatError;
use super::models::{ChatRequest, ChatResponse, FALLBACK_MESSAGE};

/// Chat service client
pub struct ChatClient {
    /// HTTP client
    client: Client,
    /// Endpoint accepting `{message, lessonContext}`
    endpoint: Option<String>,
}

impl ChatClient {
    /// Request timeout in seconds
    const TIMEOUT_SECS: u64 = 60;

    /// Create a client; without an endpoint every question gets the fallback reply
    pub fn new(endpoint: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(Self::TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { client, endpoint }
    }

    /// Ask a question, degrading to the fallback reply on any failure
    pub async fn ask(&self, message: &str, lesson_context: Option<&str>) -> String {
        match self.try_ask(message, lesson_context).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Ask a question, surfacing failures
    pub async fn try_ask(
        &self,
        message: &str,
        lesson_context: Option<&str>,
    ) -> Result<String, ChatError> {
        let endpoint = self.endpoint.as_deref().ok_or(ChatError::NotConfigured)?;

        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut request = ChatRequest::new(message);
        if let Some(context) = lesson_context {
            request = request.with_lesson_context(context);
        }

        let response = self.client.post(endpoint).json(&request).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ChatError::RateLimited { retry_after_seconds: retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::ServiceError { status: status.as_u16(), message });
        }

        let body = response.text().await?;
        let reply: ChatResponse = serde_json::from_str(&body)?;

        if reply.response.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(reply.response)
    }
}
