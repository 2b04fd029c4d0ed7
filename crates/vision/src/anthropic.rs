//! Anthropic Messages API client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::camera::CapturedImage;
use crate::client::VisionClient;
use crate::error::VisionError;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Fixed user-turn text accompanying the snapshot.
const USER_TEXT: &str = "Inspect this room and reply with the tidiness JSON.";

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            model,
            api_key,
        }
    }
}

#[async_trait]
impl VisionClient for AnthropicClient {
    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    async fn query(&self, image: &CapturedImage, prompt: &str) -> Result<String, VisionError> {
        let url = format!("{}/v1/messages", self.base_url);

        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": prompt,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image", "source": {
                        "type": "base64",
                        "media_type": image.mime,
                        "data": BASE64.encode(&image.bytes),
                    }},
                    {"type": "text", "text": USER_TEXT},
                ],
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VisionError::from_transport("anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::from_status("anthropic", status, body));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| VisionError::from_transport("anthropic", e))?;

        extract_text_block(&data)
    }
}

/// Pull the first text block out of a Messages API envelope.
fn extract_text_block(data: &Value) -> Result<String, VisionError> {
    let text = data["content"]
        .as_array()
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|block| block["type"] == "text")
                .and_then(|block| block["text"].as_str())
        });

    match text {
        Some(text) => Ok(text.to_string()),
        None => Err(VisionError::Provider {
            provider: "anthropic",
            detail: format!("no reply text in response: {data}"),
        }),
    }
}
