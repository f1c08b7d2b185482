//! Gemini API client struct, request building, and response parsing.

use serde_json::{json, Value};

use crate::{AiError, Message, ModelReply, Role, TokenUsage, ToolCall, ToolDefinition, ToolResponse};

use super::config::GeminiConfig;

/// Gemini API client.
pub struct GeminiClient {
    pub(crate) config: GeminiConfig,
    pub(crate) http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| AiError::NetworkError(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub(crate) fn api_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.config.api_base, model, method)
    }

    /// Build the `generateContent` body. `pending` are tool responses to
    /// append as a final user turn.
    pub(crate) fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        pending: &[ToolResponse],
    ) -> Value {
        let mut contents: Vec<Value> = messages.iter().filter_map(to_content).collect();
        if !pending.is_empty() {
            contents.push(json!({
                "role": "user",
                "parts": pending.iter().map(function_response_part).collect::<Vec<_>>(),
            }));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.config.max_tokens,
                "temperature": self.config.temperature,
            }
        });

        if !tools.is_empty() {
            let declarations: Vec<_> = tools.iter().map(to_function_declaration).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    pub(crate) fn build_embed_body(&self, text: &str) -> Value {
        json!({
            "model": format!("models/{}", self.config.embedding_model),
            "content": { "parts": [{ "text": text }] },
        })
    }

    /// Parse a `generateContent` response.
    pub(crate) fn parse_response(&self, json: Value) -> Result<ModelReply, AiError> {
        let candidates = json["candidates"]
            .as_array()
            .ok_or_else(|| AiError::ParseError("no candidates in response".to_string()))?;

        let first = candidates
            .first()
            .ok_or_else(|| AiError::ParseError("empty candidates".to_string()))?;

        let parts = first["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in &parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc["name"]
                    .as_str()
                    .ok_or_else(|| AiError::ParseError("functionCall without name".to_string()))?;
                let args = match &fc["args"] {
                    Value::Null => json!({}),
                    other => other.clone(),
                };
                tool_calls.push(ToolCall::new(name, args));
            }
        }

        let usage = TokenUsage {
            input_tokens: json["usageMetadata"]["promptTokenCount"]
                .as_u64()
                .unwrap_or(0),
            output_tokens: json["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0),
        };

        Ok(ModelReply {
            text,
            tool_calls,
            usage,
        })
    }

    pub(crate) fn parse_embedding(&self, json: Value) -> Result<Vec<f32>, AiError> {
        let values = json["embedding"]["values"]
            .as_array()
            .ok_or_else(|| AiError::ParseError("no embedding values in response".to_string()))?;
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| AiError::ParseError("non-numeric embedding value".to_string()))
            })
            .collect()
    }
}

fn to_content(msg: &Message) -> Option<Value> {
    let mut parts = Vec::new();
    if !msg.content.is_empty() {
        parts.push(json!({ "text": msg.content }));
    }
    match msg.role {
        Role::Model => parts.extend(msg.tool_calls.iter().map(|call| {
            json!({ "functionCall": { "name": call.name, "args": call.arguments } })
        })),
        Role::User => parts.extend(msg.tool_responses.iter().map(function_response_part)),
    }
    if parts.is_empty() {
        return None;
    }
    Some(json!({ "role": msg.role.as_str(), "parts": parts }))
}

fn function_response_part(response: &ToolResponse) -> Value {
    json!({
        "functionResponse": {
            "name": response.name,
            "response": { "name": response.name, "content": response.content },
        }
    })
}

fn to_function_declaration(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}
