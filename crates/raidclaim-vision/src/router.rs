//! Fallback Router - tries providers in chain order until one yields text

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::providers::*;
use crate::types::*;

/// Final call of a chain walk, plus the provider the walk started with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCall {
    pub call: ProviderCallResult,
    /// First provider that was actually invoked
    pub first_attempted: ProviderId,
}

impl RoutedCall {
    /// The result came from a provider other than the first one invoked
    pub fn is_fallback(&self) -> bool {
        self.call.provider != self.first_attempted
    }
}

/// Holds one adapter per provider and walks fallback chains over them
#[derive(Clone, Default)]
pub struct FallbackRouter {
    providers: HashMap<ProviderId, Arc<dyn VisionProvider>>,
}

impl FallbackRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per configured provider, sharing a single HTTP client
    pub fn from_config(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::new();
        let mut router = Self::new();
        for id in ProviderId::ALL {
            if let Some(settings) = config.settings(id) {
                router = router.with_provider(provider_for(id, settings, client.clone()));
            }
        }
        router
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn with_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn provider(&self, id: ProviderId) -> Option<&Arc<dyn VisionProvider>> {
        self.providers.get(&id)
    }

    /// Try each credentialed provider once, in order.
    ///
    /// `credentials` is the chain already filtered down to providers that
    /// have a key, in priority order. Returns the first result carrying
    /// non-empty text; otherwise the last attempted result, marked failed.
    /// Providers without a registered adapter are skipped and do not count
    /// as attempts.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        credentials: &[ProviderCredential],
    ) -> Result<RoutedCall> {
        let mut first_attempted: Option<ProviderId> = None;
        let mut last: Option<ProviderCallResult> = None;
        let mut attempt = 0;

        for credential in credentials {
            let Some(provider) = self.providers.get(&credential.provider) else {
                tracing::warn!(provider = %credential.provider, "No adapter registered, skipping");
                continue;
            };
            attempt += 1;
            let first = *first_attempted.get_or_insert(credential.provider);

            let result = provider.call(request, credential).await;

            if result.is_usable() {
                if attempt > 1 {
                    tracing::info!(
                        provider = %result.provider,
                        attempt,
                        "Fallback provider succeeded"
                    );
                }
                return Ok(RoutedCall {
                    call: result,
                    first_attempted: first,
                });
            }

            tracing::warn!(
                provider = %result.provider,
                attempt,
                status = result.http_status,
                detail = result.error_detail().unwrap_or("empty response"),
                "Provider gave no usable result, trying next"
            );
            last = Some(result);
        }

        let (Some(last), Some(first_attempted)) = (last, first_attempted) else {
            return Err(VisionError::NoProviderAvailable {
                intent: request.intent,
            });
        };

        let call = match last.outcome {
            CallOutcome::Completed { .. } => ProviderCallResult::failed(
                last.provider,
                last.http_status,
                FailureKind::EmptyResult,
                format!("{} returned no text", last.provider),
            ),
            CallOutcome::Failed { .. } => last,
        };
        Ok(RoutedCall {
            call,
            first_attempted,
        })
    }
}
