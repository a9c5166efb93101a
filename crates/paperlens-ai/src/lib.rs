//! paperlens AI: generative model backends and the enrichment client built
//! on top of them.

pub mod client;
pub mod error;
pub mod fallback;
pub mod metadata;
pub mod prompts;
pub mod provider;

pub use client::EnrichmentClient;
pub use error::{EnrichmentFailure, ModelError};
pub use metadata::RefinedMetadata;
pub use provider::{GeminiModel, GenerativeModel, UnavailableModel, model_from_config, resolve_model};
