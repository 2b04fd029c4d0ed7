//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::camera::CapturedImage;
use crate::client::VisionClient;
use crate::error::VisionError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            model,
            api_key,
        }
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn query(&self, image: &CapturedImage, prompt: &str) -> Result<String, VisionError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let payload = serde_json::json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {"inline_data": {
                        "mime_type": image.mime,
                        "data": BASE64.encode(&image.bytes),
                    }},
                ],
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VisionError::from_transport("gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::from_status("gemini", status, body));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| VisionError::from_transport("gemini", e))?;

        extract_candidate_text(&data)
    }
}

/// Pull the first text part out of a `generateContent` envelope.
fn extract_candidate_text(data: &Value) -> Result<String, VisionError> {
    let text = data["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()));

    match text {
        Some(text) => Ok(text.to_string()),
        None => Err(VisionError::Provider {
            provider: "gemini",
            detail: format!("no reply text in response: {data}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_text_is_extracted() {
        let data = serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"inline_data": {"mime_type": "image/png", "data": "ignored"}},
                {"text": "{\"status\": \"tidy\"}"},
            ]}}]
        });
        assert_eq!(
            extract_candidate_text(&data).unwrap(),
            "{\"status\": \"tidy\"}"
        );
    }

    #[test]
    fn blocked_response_without_parts_is_a_provider_error() {
        let data = serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        });
        assert!(extract_candidate_text(&data).is_err());
    }
}
