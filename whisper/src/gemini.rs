use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{build_client, post_json};
use crate::llm::LanguageModel;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    // Thinking tokens count against this cap. Sent only when configured.
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

/// Blocking client for the Gemini `generateContent` and `embedContent` endpoints.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    embed_model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        if cfg.gemini_api_key.trim().is_empty() {
            return Err(Error::MissingConfig("GEMINI_API_KEY"));
        }
        Ok(Self {
            client: build_client(cfg.http_timeout)?,
            base_url: cfg.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.gemini_api_key.clone(),
            model: normalize_model(&cfg.model_name),
            embed_model: normalize_model(&cfg.embed_model),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}?key={}", self.base_url, model, method, self.api_key)
    }
}

impl LanguageModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let req = GenerateRequest {
            contents: [Content { parts: [Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "gemini generate");
        let res: GenerateResponse =
            post_json(&self.client, &self.url(&self.model, "generateContent"), &req, |r| r)?;
        extract_text(res)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let req = EmbedRequest {
            model: format!("models/{}", self.embed_model),
            content: Content { parts: [Part { text }] },
        };
        tracing::debug!(model = %self.embed_model, "gemini embed");
        let res: EmbedResponse =
            post_json(&self.client, &self.url(&self.embed_model, "embedContent"), &req, |r| r)?;
        res.embedding
            .map(|e| e.values)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Decode("no embedding in response".to_string()))
    }
}

fn normalize_model(model: &str) -> String {
    let trimmed = model.trim();
    trimmed.strip_prefix("models/").unwrap_or(trimmed).to_string()
}

fn extract_text(res: GenerateResponse) -> Result<String> {
    let Some(candidate) = res.candidates.into_iter().next() else {
        return Err(Error::Decode("empty completion from model".to_string()));
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        let msg = match candidate.finish_reason {
            Some(reason) => format!("empty completion from model (finish reason {})", reason),
            None => "empty completion from model".to_string(),
        };
        return Err(Error::Decode(msg));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_all_parts_of_first_candidate() {
        let raw = r##"{"candidates":[{"content":{"parts":[{"text":"# Title"},{"text":"\nbody"}]}},
                     {"content":{"parts":[{"text":"ignored"}]}}]}"##;
        let res: GenerateResponse = serde_json::from_str(raw).expect("valid response");
        assert_eq!(extract_text(res).expect("text"), "# Title\nbody");
    }

    #[test]
    fn blocked_or_empty_completion_is_an_error() {
        let res: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .expect("valid response");
        assert!(matches!(extract_text(res), Err(Error::Decode(_))));
    }

    #[test]
    fn token_cap_reply_without_parts_names_the_finish_reason() {
        let raw = r#"{"candidates":[{"content":{"role":"model"},"finishReason":"MAX_TOKENS"}]}"#;
        let res: GenerateResponse = serde_json::from_str(raw).expect("valid response");
        match extract_text(res) {
            Err(Error::Decode(msg)) => assert!(msg.contains("MAX_TOKENS"), "message was {}", msg),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn missing_key_is_rejected_up_front() {
        let cfg = Config::default();
        assert!(matches!(GeminiClient::new(&cfg), Err(Error::MissingConfig("GEMINI_API_KEY"))));
    }

    #[test]
    fn request_serializes_generation_config() {
        let req = GenerateRequest {
            contents: [Content { parts: [Part { text: "hi" }] }],
            generation_config: GenerationConfig { temperature: 0.5, max_output_tokens: Some(2048) },
        };
        let value = serde_json::to_value(&req).expect("serializable");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(normalize_model(" models/gemini-2.5-flash "), "gemini-2.5-flash");
    }

    #[test]
    fn output_cap_is_omitted_unless_configured() {
        let req = GenerateRequest {
            contents: [Content { parts: [Part { text: "hi" }] }],
            generation_config: GenerationConfig { temperature: 0.7, max_output_tokens: None },
        };
        let value = serde_json::to_value(&req).expect("serializable");
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());
        assert_eq!(Config::default().max_tokens, None);
    }
}
