//! Provider settings, credentials and fallback chains

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Ordered provider priority list for one intent
pub type FallbackChain = Vec<ProviderId>;

/// One fallback chain per intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSet {
    #[serde(default = "default_date_time_chain")]
    pub date_time: FallbackChain,
    #[serde(default = "default_structured_receipt_chain")]
    pub structured_receipt: FallbackChain,
    #[serde(default = "default_plain_text_chain")]
    pub plain_text: FallbackChain,
}

impl ChainSet {
    pub fn for_intent(&self, intent: Intent) -> &[ProviderId] {
        match intent {
            Intent::DateTime => &self.date_time,
            Intent::StructuredReceipt => &self.structured_receipt,
            Intent::PlainText => &self.plain_text,
        }
    }

    /// Every chain must name at least one provider
    pub fn validate(&self) -> Result<()> {
        for intent in Intent::ALL {
            if self.for_intent(intent).is_empty() {
                return Err(VisionError::ConfigurationError {
                    message: format!("fallback chain for {} is empty", intent),
                });
            }
        }
        Ok(())
    }
}

impl Default for ChainSet {
    fn default() -> Self {
        Self {
            date_time: default_date_time_chain(),
            structured_receipt: default_structured_receipt_chain(),
            plain_text: default_plain_text_chain(),
        }
    }
}

fn default_date_time_chain() -> FallbackChain {
    vec![ProviderId::OpenRouter, ProviderId::Groq, ProviderId::OpenAi]
}

fn default_structured_receipt_chain() -> FallbackChain {
    vec![ProviderId::Gemini, ProviderId::Groq, ProviderId::OpenAi]
}

fn default_plain_text_chain() -> FallbackChain {
    vec![ProviderId::HuggingFace, ProviderId::OpenRouter, ProviderId::OpenAi]
}

/// Connection settings for one provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    /// Chat completions URL, or the models root for Hugging Face inference
    pub base_url: String,
    pub model: String,
    /// Optional `HTTP-Referer` header (OpenRouter attribution)
    pub referer: Option<String>,
}

impl ProviderSettings {
    /// Built-in endpoint and model for a provider, no credential
    pub fn defaults_for(provider: ProviderId) -> Self {
        let (base_url, model) = match provider {
            ProviderId::OpenAi => ("https://api.openai.com/v1/chat/completions", "gpt-4o-mini"),
            ProviderId::Gemini => (
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "gemini-2.0-flash",
            ),
            ProviderId::Groq => (
                "https://api.groq.com/openai/v1/chat/completions",
                "meta-llama/llama-4-scout-17b-16e-instruct",
            ),
            ProviderId::OpenRouter => (
                "https://openrouter.ai/api/v1/chat/completions",
                "qwen/qwen2.5-vl-32b-instruct:free",
            ),
            ProviderId::HuggingFace => (
                "https://router.huggingface.co/hf-inference/models",
                "nlpcloud/vit-ocr-base-captcha-v2",
            ),
        };
        Self {
            api_key: None,
            base_url: base_url.to_string(),
            model: model.to_string(),
            referer: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// URL the adapter posts to
    ///
    /// Inference APIs address the model in the path, so the model id is
    /// appended to `base_url`; chat APIs name it in the body instead.
    pub fn endpoint(&self, provider: ProviderId) -> String {
        match provider {
            ProviderId::HuggingFace => format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                self.model.trim_start_matches('/')
            ),
            _ => self.base_url.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Environment variable holding a provider's API key
pub fn api_key_var(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAi => "OPENAI_API_KEY",
        ProviderId::Gemini => "GEMINI_API_KEY",
        ProviderId::Groq => "GROQ_API_KEY",
        ProviderId::OpenRouter => "OPENROUTER_API_KEY",
        ProviderId::HuggingFace => "HUGGINGFACE_API_KEY",
    }
}

/// Everything the gateway needs to know about the outside world.
///
/// Built once per process and injected into the gateway; credentials are
/// looked up from it on every request, so a provider without a key only
/// affects the chains that would have used it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    providers: BTreeMap<ProviderId, ProviderSettings>,
    pub chains: ChainSet,
}

impl GatewayConfig {
    /// Built-in endpoints and chains, no credentials
    pub fn new() -> Self {
        Self {
            providers: ProviderId::ALL
                .into_iter()
                .map(|id| (id, ProviderSettings::defaults_for(id)))
                .collect(),
            chains: ChainSet::default(),
        }
    }

    /// Load from the process environment
    ///
    /// Reads the provider keys (`OPENAI_API_KEY`, `GEMINI_API_KEY`,
    /// `GROQ_API_KEY`, `OPENROUTER_API_KEY`, `HUGGINGFACE_API_KEY`) and the
    /// optional `RAIDCLAIM_<PROVIDER>_BASE_URL`, `RAIDCLAIM_<PROVIDER>_MODEL`
    /// and `RAIDCLAIM_OPENROUTER_REFERER` overrides.
    pub fn from_env() -> Self {
        // Try to load .env file (ignore errors)
        let _ = dotenvy::dotenv();

        let mut config = Self::new();
        for (id, settings) in config.providers.iter_mut() {
            let prefix = format!("RAIDCLAIM_{}", id.key().to_uppercase());
            settings.api_key = non_empty_var(api_key_var(*id));
            if let Some(url) = non_empty_var(&format!("{}_BASE_URL", prefix)) {
                settings.base_url = url;
            }
            if let Some(model) = non_empty_var(&format!("{}_MODEL", prefix)) {
                settings.model = model;
            }
            if *id == ProviderId::OpenRouter {
                settings.referer = non_empty_var("RAIDCLAIM_OPENROUTER_REFERER");
            }
        }
        config
    }

    pub fn with_provider(mut self, provider: ProviderId, settings: ProviderSettings) -> Self {
        self.providers.insert(provider, settings);
        self
    }

    pub fn with_api_key(mut self, provider: ProviderId, api_key: impl Into<String>) -> Self {
        let settings = self
            .providers
            .entry(provider)
            .or_insert_with(|| ProviderSettings::defaults_for(provider));
        settings.api_key = Some(api_key.into());
        self
    }

    pub fn with_chains(mut self, chains: ChainSet) -> Self {
        self.chains = chains;
        self
    }

    pub fn settings(&self, provider: ProviderId) -> Option<&ProviderSettings> {
        self.providers.get(&provider)
    }

    /// Credential for one provider, if configured and non-blank
    pub fn credential(&self, provider: ProviderId) -> Option<ProviderCredential> {
        self.providers
            .get(&provider)
            .and_then(|s| s.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
            .map(|key| ProviderCredential::new(provider, key))
    }

    /// Credentials for every provider in `chain` that has one, in chain order
    pub fn resolve_credentials(&self, chain: &[ProviderId]) -> Vec<ProviderCredential> {
        chain.iter().filter_map(|id| self.credential(*id)).collect()
    }

    pub fn missing_credentials(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.credential(*id).is_none())
            .collect()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
