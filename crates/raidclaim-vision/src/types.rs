//! Common types for receipt extraction

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised by the provider layer itself (not per-call provider failures,
/// which are values carried in [`ProviderCallResult`])
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("No provider available for {intent} extraction")]
    NoProviderAvailable { intent: Intent },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Default mime type when the caller does not send one
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// What kind of output the caller wants from the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Date and time only, as short free text
    DateTime,
    /// Full receipt fields as a JSON object
    StructuredReceipt,
    /// Every legible line of text
    PlainText,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Intent::DateTime, Intent::StructuredReceipt, Intent::PlainText];
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateTime => write!(f, "date_time"),
            Self::StructuredReceipt => write!(f, "structured_receipt"),
            Self::PlainText => write!(f, "plain_text"),
        }
    }
}

/// Third-party backends that can look at a receipt
///
/// Serializes as its [`key`](ProviderId::key); deserializes through
/// [`from_str`](ProviderId::from_str) so configured chains accept aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    Groq,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Groq,
        ProviderId::OpenRouter,
        ProviderId::HuggingFace,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "chatgpt" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            "groq" => Some(Self::Groq),
            "openrouter" | "qwen" => Some(Self::OpenRouter),
            "huggingface" | "hugging_face" | "hf" => Some(Self::HuggingFace),
            _ => None,
        }
    }

    /// Stable key used in configuration and environment variable names
    pub fn key(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::OpenRouter => "openrouter",
            Self::HuggingFace => "huggingface",
        }
    }

    /// Human-facing name, used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
            Self::Groq => "Groq",
            Self::OpenRouter => "OpenRouter",
            Self::HuggingFace => "Hugging Face",
        }
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_str(name.trim()).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &name,
                &["openai", "gemini", "groq", "openrouter", "huggingface"],
            )
        })
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A receipt image plus what to pull out of it
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
    /// Echoed back to the caller, never sent to a provider
    pub file_name: Option<String>,
    pub intent: Intent,
}

impl ExtractionRequest {
    pub fn new(image_bytes: Vec<u8>, intent: Intent) -> Self {
        Self {
            image_bytes,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            file_name: None,
            intent,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        if !mime_type.trim().is_empty() {
            self.mime_type = mime_type;
        }
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// `data:<mime>;base64,<payload>` form expected by the providers
    pub fn data_url(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.image_bytes)
        )
    }
}

/// A secret forwarded as a bearer token to one provider
#[derive(Clone)]
pub struct ProviderCredential {
    pub provider: ProviderId,
    pub secret: String,
}

impl ProviderCredential {
    pub fn new(provider: ProviderId, secret: impl Into<String>) -> Self {
        Self {
            provider,
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("provider", &self.provider)
            .field("secret", &"***")
            .finish()
    }
}

/// Why a provider call did not yield usable text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider answered with a non-2xx status
    Upstream,
    /// Body could not be decoded where JSON was expected
    Malformed,
    /// No HTTP response at all
    Transport,
    /// Provider answered successfully but with no text
    EmptyResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Completed { raw_text: String },
    Failed { kind: FailureKind, detail: String },
}

/// Result of exactly one adapter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallResult {
    pub provider: ProviderId,
    pub http_status: u16,
    pub outcome: CallOutcome,
}

impl ProviderCallResult {
    pub fn completed(provider: ProviderId, http_status: u16, raw_text: impl Into<String>) -> Self {
        Self {
            provider,
            http_status,
            outcome: CallOutcome::Completed {
                raw_text: raw_text.into(),
            },
        }
    }

    pub fn failed(
        provider: ProviderId,
        http_status: u16,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            http_status,
            outcome: CallOutcome::Failed {
                kind,
                detail: detail.into(),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, CallOutcome::Completed { .. })
    }

    pub fn raw_text(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Completed { raw_text } => Some(raw_text),
            CallOutcome::Failed { .. } => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Completed { .. } => None,
            CallOutcome::Failed { detail, .. } => Some(detail),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            CallOutcome::Completed { .. } => None,
            CallOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Succeeded with non-blank text
    pub fn is_usable(&self) -> bool {
        self.raw_text().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Receipt fields as returned to the caller; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    /// Whole provider reply when no JSON object could be decoded from it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ReceiptFields {
    pub fn degraded(raw: impl Into<String>) -> Self {
        Self {
            raw_response: Some(raw.into()),
            ..Self::default()
        }
    }
}

/// Provider-independent output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    PlainText { extracted_text: String },
    StructuredReceipt(ReceiptFields),
}

impl ExtractionResult {
    pub fn extracted_text(&self) -> Option<&str> {
        match self {
            Self::PlainText { extracted_text } => Some(extracted_text),
            Self::StructuredReceipt(_) => None,
        }
    }

    pub fn receipt(&self) -> Option<&ReceiptFields> {
        match self {
            Self::PlainText { .. } => None,
            Self::StructuredReceipt(fields) => Some(fields),
        }
    }
}
