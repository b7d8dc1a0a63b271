//! HTTP text-generation client for the daily prompt (Gemini REST API).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tethered_core::PromptGenerator;
use tethered_core::prompt::PromptError;

use crate::config::PromptConfig;

const INSTRUCTION: &str = "Write one short daily prompt for a family check-in app that connects \
college students with their parents. It should invite a photo, a short note, or both, be open-ended \
without being vague, suit both generations, and be at most two sentences. Reply with the prompt only.";

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
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
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

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    config: PromptConfig,
}

impl GeminiGenerator {
    pub fn new(config: PromptConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl PromptGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self) -> Result<String, PromptError> {
        if self.config.api_key.is_empty() {
            return Err(PromptError::NotConfigured);
        }
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: INSTRUCTION }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 100,
            },
        };
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptError::Request(e.without_url().to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PromptError::Request(format!("status {status}")));
        }
        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| PromptError::Request(e.without_url().to_string()))?;
        parsed.first_text().ok_or(PromptError::Empty)
    }
}
