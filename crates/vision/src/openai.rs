//! OpenAI-compatible chat-completions client.
//!
//! One implementation covers three providers: OpenAI itself, OpenRouter
//! (same wire format, different host) and any self-hosted gateway that
//! speaks the chat-completions dialect (the `custom` provider).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::camera::CapturedImage;
use crate::client::VisionClient;
use crate::error::VisionError;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Fixed user-turn text accompanying the snapshot.
const USER_TEXT: &str = "Inspect this room and reply with the tidiness JSON.";

pub struct OpenAiStyleClient {
    provider: &'static str,
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl OpenAiStyleClient {
    pub fn openai(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            provider: "openai",
            client,
            url: base_url.unwrap_or_else(|| OPENAI_URL.to_string()),
            model,
            api_key,
        }
    }

    pub fn openrouter(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            provider: "openrouter",
            client,
            url: base_url.unwrap_or_else(|| OPENROUTER_URL.to_string()),
            model,
            api_key,
        }
    }

    pub fn custom(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: String,
    ) -> Self {
        Self {
            provider: "custom",
            client,
            url: base_url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl VisionClient for OpenAiStyleClient {
    fn provider_name(&self) -> &'static str {
        self.provider
    }

    async fn query(&self, image: &CapturedImage, prompt: &str) -> Result<String, VisionError> {
        let data_url = format!("data:{};base64,{}", image.mime, BASE64.encode(&image.bytes));

        let payload = serde_json::json!({
            "model": self.model,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": prompt},
                {"role": "user", "content": [
                    {"type": "text", "text": USER_TEXT},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ]},
            ],
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VisionError::from_transport(self.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::from_status(self.provider, status, body));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| VisionError::from_transport(self.provider, e))?;

        extract_message_content(self.provider, &data)
    }
}

/// Pull the assistant reply text out of a chat-completions envelope.
///
/// `content` is usually a string; some gateways return an array of
/// typed blocks instead, in which case the first text block wins.
fn extract_message_content(provider: &'static str, data: &Value) -> Result<String, VisionError> {
    let content = &data["choices"][0]["message"]["content"];

    if let Some(text) = content.as_str() {
        return Ok(text.to_string());
    }

    if let Some(blocks) = content.as_array() {
        if let Some(text) = blocks
            .iter()
            .find(|block| block["type"] == "text")
            .and_then(|block| block["text"].as_str())
        {
            return Ok(text.to_string());
        }
    }

    Err(VisionError::Provider {
        provider,
        detail: format!("no reply text in response: {data}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
