//! Provider-agnostic vision client construction.
//!
//! [`build_client`] turns a zone's provider configuration into a boxed
//! [`VisionClient`]. Credentials are never stored in zone config; the
//! config carries the NAME of an environment variable and the key is
//! resolved here, at client build time.

use std::sync::Arc;

use async_trait::async_trait;
use zonewatch_core::zone::{Provider, ZoneConfig};

use crate::anthropic::AnthropicClient;
use crate::camera::CapturedImage;
use crate::error::VisionError;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiStyleClient;

/// A multimodal model endpoint that can look at a snapshot.
///
/// Implementations return the provider's raw reply TEXT; turning that
/// text into a verdict is the caller's job.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Short provider label for logs, e.g. `"openai"`.
    fn provider_name(&self) -> &'static str;

    /// Send one snapshot and prompt, returning the model's reply text.
    async fn query(&self, image: &CapturedImage, prompt: &str) -> Result<String, VisionError>;
}

/// A zone's provider configuration could not be turned into a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The environment variable named by `api_credential_ref` is unset.
    #[error("credential variable '{0}' is not set")]
    MissingCredential(String),

    /// No model name available (no override and no provider default).
    #[error("zone '{0}' has no model configured")]
    MissingModel(String),

    /// The custom provider needs an explicit endpoint URL.
    #[error("zone '{0}' uses the custom provider but has no base_url")]
    MissingBaseUrl(String),
}

/// Build the vision client for one zone.
///
/// The shared [`reqwest::Client`] is reused across zones for connection
/// pooling.
pub fn build_client(
    config: &ZoneConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn VisionClient>, ClientBuildError> {
    let api_key = std::env::var(&config.api_credential_ref)
        .map_err(|_| ClientBuildError::MissingCredential(config.api_credential_ref.clone()))?;

    let model = config
        .resolved_model()
        .ok_or_else(|| ClientBuildError::MissingModel(config.id.clone()))?
        .to_string();

    let client: Arc<dyn VisionClient> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiStyleClient::openai(
            http,
            model,
            api_key,
            config.base_url.clone(),
        )),
        Provider::OpenRouter => Arc::new(OpenAiStyleClient::openrouter(
            http,
            model,
            api_key,
            config.base_url.clone(),
        )),
        Provider::Custom => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| ClientBuildError::MissingBaseUrl(config.id.clone()))?;
            Arc::new(OpenAiStyleClient::custom(http, model, api_key, base_url))
        }
        Provider::Gemini => Arc::new(GeminiClient::new(
            http,
            model,
            api_key,
            config.base_url.clone(),
        )),
        Provider::Anthropic => Arc::new(AnthropicClient::new(
            http,
            model,
            api_key,
            config.base_url.clone(),
        )),
    };

    Ok(client)
}
