//! `LanguageModel` and `Embedder` implementations for GeminiClient.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    AiError, Embedder, LanguageModel, Message, ModelReply, ToolDefinition, ToolResponse,
};

use super::client::GeminiClient;

impl GeminiClient {
    /// POST `body` to `url` once and return the JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, AiError> {
        let response = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::ApiError(format!("HTTP {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| AiError::ParseError(e.to_string()))
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        pending: &[ToolResponse],
    ) -> Result<ModelReply, AiError> {
        let body = self.build_request_body(messages, tools, pending);
        let url = self.api_url(&self.config.model, "generateContent");

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tool_responses = pending.len(),
            "Gemini API request"
        );

        self.config
            .retry
            .run("generateContent", || async {
                let json = self.post_json(&url, &body).await?;
                self.parse_response(json)
            })
            .await
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate_content(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, AiError> {
        self.generate(messages, tools, &[]).await
    }

    async fn send_tool_response(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        responses: &[ToolResponse],
    ) -> Result<ModelReply, AiError> {
        self.generate(messages, tools, responses).await
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed_content(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let body = self.build_embed_body(text);
        let url = self.api_url(&self.config.embedding_model, "embedContent");

        debug!(model = %self.config.embedding_model, "Gemini embedding request");

        self.config
            .retry
            .run("embedContent", || async {
                let json = self.post_json(&url, &body).await?;
                self.parse_embedding(json)
            })
            .await
    }
}
