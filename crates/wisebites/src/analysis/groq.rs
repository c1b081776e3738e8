use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AnalysisVerdict, ReviewAnalyzer};
use crate::community::ThirdPartyReview;
use crate::error::IntegrationError;

const SERVICE: &str = "groq";
const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Reviews beyond this many are left out of the prompt.
pub const MAX_PROMPT_REVIEWS: usize = 15;

const DEFAULT_SCORE: f64 = 5.0;
const DEFAULT_SUMMARY: &str = "Analysis failed.";

const SYSTEM_PROMPT: &str = "You are an expert dietician specializing in Celiac Disease and gluten safety. \
Analyze the following restaurant reviews and determine if this place is safe for someone with Celiac Disease. \
Focus on keywords like 'cross-contamination', 'dedicated fryer', 'separate prep area', and 'got sick'. \
Return a JSON object with exactly two keys: \
'score' (an integer 1-10, where 10 is perfectly safe and 1 is dangerous) and \
'summary' (a concise 2-sentence explanation of the rating).";

/// Celiac-safety analyzer backed by Groq's OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct GroqAnalyzer {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    summary: Option<String>,
}

impl GroqAnalyzer {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            endpoint: GROQ_CHAT_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the analyzer at a different chat-completions URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, reviews: &[ThirdPartyReview]) -> Result<String, IntegrationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(IntegrationError::MissingCredentials("GROQ_API_KEY"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(reviews),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: SERVICE,
                source,
            })?;

        if !status.is_success() {
            tracing::error!(%status, "groq completion failed");
            return Err(IntegrationError::Upstream {
                service: SERVICE,
                message: format!("{status}: {body}"),
            });
        }

        Ok(body)
    }
}

impl ReviewAnalyzer for GroqAnalyzer {
    async fn analyze(&self, reviews: &[ThirdPartyReview]) -> Result<AnalysisVerdict, IntegrationError> {
        let body = self.complete(reviews).await?;
        parse_completion(&body)
    }
}

/// User message listing at most [`MAX_PROMPT_REVIEWS`] review texts.
pub fn build_prompt(reviews: &[ThirdPartyReview]) -> String {
    let lines: Vec<String> = reviews
        .iter()
        .take(MAX_PROMPT_REVIEWS)
        .map(|review| format!("- {}", review.text))
        .collect();
    format!("Here are the reviews:\n{}", lines.join("\n"))
}

/// Extract the verdict from a chat-completions response body.
pub fn parse_completion(body: &str) -> Result<AnalysisVerdict, IntegrationError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|err| decode(err.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| decode("completion has no message content"))?;

    let payload: VerdictPayload =
        serde_json::from_str(&content).map_err(|err| decode(format!("verdict is not JSON: {err}")))?;

    Ok(AnalysisVerdict {
        score: Some(payload.score.unwrap_or(DEFAULT_SCORE).clamp(0.0, 10.0)),
        summary: payload
            .summary
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
    })
}

fn decode(message: impl Into<String>) -> IntegrationError {
    IntegrationError::Decode {
        service: SERVICE,
        message: message.into(),
    }
}
