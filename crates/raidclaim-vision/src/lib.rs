//! Raidclaim Vision - receipt extraction over third-party vision models
//!
//! This crate hides several hosted providers behind one contract:
//!
//! ## Providers
//! - OpenAI, Gemini, Groq and OpenRouter through chat completions with an
//!   inline base64 image
//! - Hugging Face OCR-style inference models
//!
//! ## Flow
//!
//! [`Gateway`] validates the request and picks the intent's fallback chain,
//! [`FallbackRouter`] tries each provider once until one returns text, and
//! [`normalize`] turns that text into an [`ExtractionResult`].
//!
//! Provider failures are values ([`ProviderCallResult`]), not errors: they
//! only surface once the whole chain is exhausted.

pub mod config;
pub mod gateway;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod router;
pub mod types;

pub use config::*;
pub use gateway::*;
pub use normalize::*;
pub use prompts::*;
pub use providers::*;
pub use router::*;
pub use types::*;
