//! Request and response bodies

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use raidclaim_vision::{
    ChainSet, ExtractionOutcome, ExtractionRequest, ExtractionResult, Intent, ProviderId,
    ReceiptFields,
};

use crate::error::ApiError;

/// Body accepted by every extraction endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequestBody {
    /// Base64 image, optionally as a `data:<mime>;base64,` URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl ExtractRequestBody {
    pub fn into_request(self, intent: Intent) -> Result<ExtractionRequest, ApiError> {
        let image = self
            .image
            .filter(|i| !i.trim().is_empty())
            .ok_or(ApiError::MissingImage)?;

        let (url_mime, payload) = split_data_url(&image);
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact).map_err(|_| ApiError::InvalidImage)?;
        if bytes.is_empty() {
            return Err(ApiError::MissingImage);
        }

        let mut request = ExtractionRequest::new(bytes, intent);
        if let Some(mime) = self.mime_type.or(url_mime) {
            request = request.with_mime_type(mime);
        }
        if let Some(name) = self.file_name {
            request = request.with_file_name(name);
        }
        Ok(request)
    }
}

/// `data:image/png;base64,AAAA` -> (Some("image/png"), "AAAA")
fn split_data_url(image: &str) -> (Option<String>, &str) {
    let Some(rest) = image.strip_prefix("data:") else {
        return (None, image);
    };
    match rest.split_once(";base64,") {
        Some((mime, payload)) => (Some(mime.to_string()).filter(|m| !m.is_empty()), payload),
        None => (None, image),
    }
}

/// Success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReceiptFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub success: bool,
    pub provider: ProviderId,
    pub fallback: bool,
}

impl From<ExtractionOutcome> for ExtractionResponse {
    fn from(outcome: ExtractionOutcome) -> Self {
        let (extracted_text, result) = match outcome.result {
            ExtractionResult::PlainText { extracted_text } => (Some(extracted_text), None),
            ExtractionResult::StructuredReceipt(fields) => (None, Some(fields)),
        };
        Self {
            extracted_text,
            result,
            file_name: outcome.file_name,
            success: outcome.success,
            provider: outcome.provider,
            fallback: outcome.fallback,
        }
    }
}

/// Credential presence for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub id: ProviderId,
    pub name: String,
    pub model: String,
    /// "Present" or "Missing"
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderStatus>,
    pub chains: ChainSet,
}
