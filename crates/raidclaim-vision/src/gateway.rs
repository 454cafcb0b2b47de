//! Gateway - single entry point for receipt extraction

use thiserror::Error;

use crate::config::GatewayConfig;
use crate::normalize::normalize;
use crate::router::FallbackRouter;
use crate::types::*;

/// Ways a request can fail as a whole
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing image data")]
    MissingImage,

    #[error("Missing {0} API key")]
    MissingCredential(ProviderId),

    /// Every provider in the chain failed; carries the last one's diagnostics
    #[error("{message}")]
    Provider {
        provider: ProviderId,
        status: u16,
        kind: FailureKind,
        message: String,
    },

    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Canonical result plus the metadata returned to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    pub file_name: Option<String>,
    /// Mirrors whether the final provider call succeeded
    pub success: bool,
    /// Provider whose reply produced `result`
    pub provider: ProviderId,
    /// Set when `provider` is not the first one attempted
    pub fallback: bool,
}

/// Validates requests, walks the intent's chain and normalizes the reply
#[derive(Clone)]
pub struct Gateway {
    config: GatewayConfig,
    router: FallbackRouter,
}

impl Gateway {
    /// Gateway with real HTTP adapters for every configured provider
    pub fn new(config: GatewayConfig) -> Self {
        let router = FallbackRouter::from_config(&config);
        Self { config, router }
    }

    /// Gateway over an explicit set of adapters
    pub fn with_router(config: GatewayConfig, router: FallbackRouter) -> Self {
        Self { config, router }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        request: ExtractionRequest,
    ) -> std::result::Result<ExtractionOutcome, GatewayError> {
        if request.image_bytes.is_empty() {
            return Err(GatewayError::MissingImage);
        }

        let chain = self.config.chains.for_intent(request.intent);
        let credentials = self.config.resolve_credentials(chain);
        if credentials.is_empty() {
            return Err(match chain.first() {
                Some(first) => GatewayError::MissingCredential(*first),
                None => VisionError::NoProviderAvailable {
                    intent: request.intent,
                }
                .into(),
            });
        }
        for missing in chain.iter().filter(|id| self.config.credential(**id).is_none()) {
            tracing::debug!(provider = %missing, "No API key configured, provider skipped");
        }

        tracing::info!(
            intent = %request.intent,
            file_name = request.file_name.as_deref().unwrap_or("-"),
            mime_type = %request.mime_type,
            image_bytes = request.image_bytes.len(),
            "Extracting receipt"
        );

        let routed = self.router.extract(&request, &credentials).await?;
        let fallback = routed.is_fallback();
        let call = routed.call;

        let text = match &call.outcome {
            CallOutcome::Completed { raw_text } => raw_text.as_str(),
            CallOutcome::Failed {
                kind: FailureKind::EmptyResult,
                ..
            } => "",
            CallOutcome::Failed { kind, detail } => {
                tracing::error!(
                    provider = %call.provider,
                    status = call.http_status,
                    "All providers failed"
                );
                return Err(GatewayError::Provider {
                    provider: call.provider,
                    status: call.http_status,
                    kind: *kind,
                    message: format!("{} API error: {}", call.provider, detail),
                });
            }
        };

        let outcome = ExtractionOutcome {
            result: normalize(text, request.intent),
            file_name: request.file_name,
            success: call.succeeded(),
            provider: call.provider,
            fallback,
        };

        tracing::info!(
            provider = %outcome.provider,
            success = outcome.success,
            fallback = outcome.fallback,
            "Extraction finished"
        );

        Ok(outcome)
    }
}
