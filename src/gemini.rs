//! Gemini API client for structured tip generation
//!
//! Sends one `generateContent` request with a declared JSON response schema
//! and returns the raw JSON text of the first candidate.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::advisor::TipGenerator;
use crate::error::SpendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
            model,
        })
    }

    /// Point the client at another endpoint, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Generate a JSON document constrained by `schema`
    pub async fn generate_json(&self, prompt: &str, schema: &Value) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(SpendError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let request = build_request(prompt, schema);

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint(), self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // Keep the API key out of logs
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                SpendError::Llm(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(SpendError::Llm(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            SpendError::Llm(format!("Gemini parse error: {}", e))
        })?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        extract_text(gemini_response)
    }
}

#[async_trait]
impl TipGenerator for GeminiClient {
    async fn generate_tips(&self, prompt: &str, schema: &Value) -> crate::Result<String> {
        self.generate_json(prompt, schema).await
    }
}

fn build_request(prompt: &str, schema: &Value) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(prompt.to_string()),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            response_mime_type: "application/json".to_string(),
            response_schema: schema.clone(),
        },
    }
}

/// Pull the first candidate's text, treating an absent or blank body as an error
fn extract_text(response: GeminiResponse) -> crate::Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| SpendError::Llm("No response from Gemini API".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        debug!(finish_reason = reason, "Gemini candidate finished");
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SpendError::Llm("Empty response from Gemini".to_string()));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i32,
    #[serde(default)]
    candidates_token_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::tip_response_schema;

    #[test]
    fn test_request_serialization() {
        let request = build_request("Help me save", &tip_response_schema());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "Help me save");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "[{\"title\":"}, {"text": "\"x\"}]"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(response).unwrap(), "[{\"title\":\"x\"}]");
    }

    #[test]
    fn test_extract_text_rejects_missing_body() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(extract_text(response).is_err());

        let response: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(extract_text(response).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let client = GeminiClient::new(String::new(), DEFAULT_MODEL.to_string()).unwrap();
        let result = client.generate_json("prompt", &tip_response_schema()).await;
        assert!(matches!(result, Err(SpendError::Llm(_))));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new("k".to_string(), "gemini-test".to_string())
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(client.endpoint(), "http://localhost:9999/gemini-test:generateContent");
    }
}
