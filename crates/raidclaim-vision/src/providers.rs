//! Vision provider implementations
//!
//! Two wire formats cover every backend:
//! - chat completions with a multimodal user message (OpenAI, Gemini, Groq,
//!   OpenRouter), reply text at `choices[0].message.content`
//! - single-input inference (Hugging Face), reply text at
//!   `[0].generated_text` or `generated_text`

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::prompts::ExtractionPrompts;
use crate::types::*;

/// Status recorded when a provider never answered
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Trait for vision providers
///
/// An implementation performs exactly one outbound call per invocation and
/// reports every outcome, including failures, as a [`ProviderCallResult`].
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Get the provider id
    fn id(&self) -> ProviderId;

    /// Run one extraction attempt
    async fn call(
        &self,
        request: &ExtractionRequest,
        credential: &ProviderCredential,
    ) -> ProviderCallResult;
}

/// Build the adapter matching a provider's wire format
pub fn provider_for(
    provider: ProviderId,
    settings: &ProviderSettings,
    client: reqwest::Client,
) -> Arc<dyn VisionProvider> {
    match provider {
        ProviderId::HuggingFace => Arc::new(InferenceProvider::with_client(
            provider,
            settings.endpoint(provider),
            client,
        )),
        _ => Arc::new(ChatCompletionProvider::with_client(
            provider,
            ChatCompletionConfig::from_settings(provider, settings),
            client,
        )),
    }
}

/// POST a JSON body and hand back the 2xx body text, or the failed call result
async fn post_json<T: Serialize + ?Sized>(
    provider: ProviderId,
    request: reqwest::RequestBuilder,
    credential: &ProviderCredential,
    body: &T,
) -> std::result::Result<(u16, String), ProviderCallResult> {
    let response = request
        .bearer_auth(&credential.secret)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(provider = %provider, error = %e, "Provider unreachable");
            ProviderCallResult::failed(
                provider,
                TRANSPORT_FAILURE_STATUS,
                FailureKind::Transport,
                format!("request failed: {}", e),
            )
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
        ProviderCallResult::failed(
            provider,
            status.as_u16(),
            FailureKind::Malformed,
            format!("failed to read {} response body: {}", provider, e),
        )
    })?;

    if !status.is_success() {
        tracing::warn!(
            provider = %provider,
            status = status.as_u16(),
            "Provider returned an error status"
        );
        return Err(ProviderCallResult::failed(
            provider,
            status.as_u16(),
            FailureKind::Upstream,
            text,
        ));
    }

    Ok((status.as_u16(), text))
}

fn malformed(provider: ProviderId, status: u16, error: serde_json::Error) -> ProviderCallResult {
    tracing::warn!(provider = %provider, error = %error, "Provider reply was not valid JSON");
    ProviderCallResult::failed(
        provider,
        status,
        FailureKind::Malformed,
        format!("failed to parse {} response: {}", provider, error),
    )
}

// ============================================================================
// Chat-completion Provider (OpenAI, Gemini, Groq, OpenRouter)
// ============================================================================

/// Configuration for a chat-completion provider
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub endpoint: String,
    pub model: String,
    /// Ask for `response_format: json_object` on structured receipt requests
    pub json_mode: bool,
    pub temperature: f32,
    pub referer: Option<String>,
}

impl ChatCompletionConfig {
    pub fn from_settings(provider: ProviderId, settings: &ProviderSettings) -> Self {
        Self {
            endpoint: settings.endpoint(provider),
            model: settings.model.clone(),
            // Free-tier router models reject response_format
            json_mode: provider != ProviderId::OpenRouter,
            temperature: 0.1,
            referer: settings.referer.clone(),
        }
    }
}

/// Vision chat model behind an OpenAI-style `/chat/completions` endpoint
pub struct ChatCompletionProvider {
    id: ProviderId,
    config: ChatCompletionConfig,
    client: reqwest::Client,
}

impl ChatCompletionProvider {
    pub fn new(id: ProviderId, config: ChatCompletionConfig) -> Self {
        Self::with_client(id, config, reqwest::Client::new())
    }

    pub fn with_client(id: ProviderId, config: ChatCompletionConfig, client: reqwest::Client) -> Self {
        Self { id, config, client }
    }

    fn build_body<'a>(&'a self, request: &ExtractionRequest) -> ChatRequest<'a> {
        let json_mode = self.config.json_mode && request.intent == Intent::StructuredReceipt;
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: ExtractionPrompts::for_intent(request.intent),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.data_url(),
                        },
                    },
                ],
            }],
            temperature: self.config.temperature,
            max_tokens: ExtractionPrompts::max_tokens(request.intent),
            response_format: json_mode.then(|| serde_json::json!({"type": "json_object"})),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    /// Usually a string; some providers send an array of text parts
    #[serde(default)]
    content: Option<serde_json::Value>,
}

impl ChatResponse {
    fn into_text(self) -> String {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        match content {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl VisionProvider for ChatCompletionProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn call(
        &self,
        request: &ExtractionRequest,
        credential: &ProviderCredential,
    ) -> ProviderCallResult {
        let body = self.build_body(request);

        tracing::debug!(
            provider = %self.id,
            model = %self.config.model,
            intent = %request.intent,
            image_bytes = request.image_bytes.len(),
            "Calling chat-completion provider"
        );

        let mut http = self.client.post(&self.config.endpoint);
        if let Some(ref referer) = self.config.referer {
            http = http.header("HTTP-Referer", referer);
        }

        let (status, text) = match post_json(self.id, http, credential, &body).await {
            Ok(reply) => reply,
            Err(failed) => return failed,
        };

        match serde_json::from_str::<ChatResponse>(&text) {
            Ok(reply) => ProviderCallResult::completed(self.id, status, reply.into_text()),
            Err(e) => malformed(self.id, status, e),
        }
    }
}

// ============================================================================
// Inference Provider (OCR-style models)
// ============================================================================

/// OCR-style model that takes the data URL as its only input
pub struct InferenceProvider {
    id: ProviderId,
    endpoint: String,
    client: reqwest::Client,
}

impl InferenceProvider {
    pub fn new(id: ProviderId, endpoint: impl Into<String>) -> Self {
        Self::with_client(id, endpoint, reqwest::Client::new())
    }

    pub fn with_client(id: ProviderId, endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest {
    inputs: String,
}

/// Reply text from `[{"generated_text": ...}]` or `{"generated_text": ...}`
fn generated_text(reply: &serde_json::Value) -> String {
    let item = match reply {
        serde_json::Value::Array(items) => items.first(),
        other => Some(other),
    };
    item.and_then(|v| v.get("generated_text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl VisionProvider for InferenceProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn call(
        &self,
        request: &ExtractionRequest,
        credential: &ProviderCredential,
    ) -> ProviderCallResult {
        let body = InferenceRequest {
            inputs: request.data_url(),
        };

        tracing::debug!(
            provider = %self.id,
            endpoint = %self.endpoint,
            image_bytes = request.image_bytes.len(),
            "Calling inference provider"
        );

        let http = self.client.post(&self.endpoint);
        let (status, text) = match post_json(self.id, http, credential, &body).await {
            Ok(reply) => reply,
            Err(failed) => return failed,
        };

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(reply) => ProviderCallResult::completed(self.id, status, generated_text(&reply)),
            Err(e) => malformed(self.id, status, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat_provider(id: ProviderId) -> ChatCompletionProvider {
        let settings = ProviderSettings::defaults_for(id);
        ChatCompletionProvider::new(id, ChatCompletionConfig::from_settings(id, &settings))
    }

    #[test]
    fn test_chat_body_embeds_prompt_and_data_url() {
        let provider = chat_provider(ProviderId::OpenAi);
        let request = ExtractionRequest::new(b"img".to_vec(), Intent::DateTime)
            .with_mime_type("image/png");

        let body = serde_json::to_value(provider.build_body(&request)).unwrap();
        let content = &body["messages"][0]["content"];

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], ExtractionPrompts::date_time());
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,aW1n");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_json_mode_only_for_structured_receipts() {
        let provider = chat_provider(ProviderId::Gemini);
        let request = ExtractionRequest::new(b"img".to_vec(), Intent::StructuredReceipt);
        let body = serde_json::to_value(provider.build_body(&request)).unwrap();
        assert_eq!(body["response_format"], json!({"type": "json_object"}));

        let router = chat_provider(ProviderId::OpenRouter);
        let body = serde_json::to_value(router.build_body(&request)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_chat_reply_text_shapes() {
        let reply: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Date: Nov 10"}}]
        }))
        .unwrap();
        assert_eq!(reply.into_text(), "Date: Nov 10");

        let reply: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}}]
        }))
        .unwrap();
        assert_eq!(reply.into_text(), "ab");

        let reply: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(reply.into_text(), "");

        let reply: ChatResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(reply.into_text(), "");
    }

    #[test]
    fn test_generated_text_shapes() {
        assert_eq!(generated_text(&json!([{"generated_text": "TOTAL 450"}])), "TOTAL 450");
        assert_eq!(generated_text(&json!({"generated_text": "TOTAL 450"})), "TOTAL 450");
        assert_eq!(generated_text(&json!([])), "");
        assert_eq!(generated_text(&json!({"error": "loading"})), "");
    }
}
