//! Placeholder extraction through an external text-understanding service.
//!
//! The default client talks to an OpenAI-compatible chat completions
//! endpoint. The call is bounded by the HTTP client's timeout; there is no
//! retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docx_fill_core::descriptor::parse_extraction_reply;
use docx_fill_core::PlaceholderDescriptor;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Extraction service unavailable: {0}")]
    Unavailable(String),

    #[error("Extraction service timed out")]
    Timeout,

    #[error(transparent)]
    Protocol(#[from] docx_fill_core::Error),
}

/// Turns document text into an ordered list of placeholder descriptors.
#[async_trait]
pub trait PlaceholderExtractor: Send + Sync {
    async fn extract(&self, document_text: &str) -> Result<Vec<PlaceholderDescriptor>, ExtractError>;
}

pub type SharedExtractor = Arc<dyn PlaceholderExtractor>;

const SYSTEM_PROMPT: &str = r#"You find every fillable placeholder in a legal or business document.

A placeholder is a blank or a marked field where the reader must enter their own information. Typical forms:
1. Bracketed text: [Company Name], [Date], [Amount], [Address], [Email]
2. Dollar blanks: $[_____], $[_____________]
3. Bare underscores: _____, ____________
4. Signature block fields such as [name], [title], [Address], [Email], usually repeated once per signing party

Not placeholders: section references ("Section 2"), party labels used as headings ("INVESTOR", "COMPANY") unless bracketed, version numbers, document type labels.

Rules:
- Report placeholders in the exact order they appear, from the first line to the last.
- Copy each placeholder exactly as written, including $, brackets and underscores, without surrounding labels ("Amount: $[____]" gives "$[____]").
- Report every occurrence of a repeated placeholder separately and make each question say which one it is.

Answer with a JSON array only, for example:
[
  {"placeholder":"$[____]", "question":"What is the payment amount?"},
  {"placeholder":"[name]", "question":"What is the name of the person signing for the company?"},
  {"placeholder":"[name]", "question":"What is the name of the person signing for the investor?"}
]

Begin your response with ["#;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Extractor backed by a chat completions endpoint.
pub struct ChatCompletionsExtractor {
    http: Client,
    url: String,
    api_token: Option<String>,
    model: String,
}

impl ChatCompletionsExtractor {
    pub fn new(
        url: String,
        api_token: Option<String>,
        model: String,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            api_token,
            model,
        })
    }
}

#[async_trait]
impl PlaceholderExtractor for ChatCompletionsExtractor {
    async fn extract(&self, document_text: &str) -> Result<Vec<PlaceholderDescriptor>, ExtractError> {
        let user_prompt = format!("Document Text:\n{}", document_text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: 2500,
        };

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        debug!(
            "Requesting placeholder extraction for {} chars of text",
            document_text.len()
        );
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(ExtractError::Unavailable(format!(
                "{} returned {}: {}",
                self.url, status, body
            )));
        }

        let descriptors = descriptors_from_body(&body)?;
        info!("Extraction returned {} placeholders", descriptors.len());
        Ok(descriptors)
    }
}

fn transport_error(err: reqwest::Error) -> ExtractError {
    if err.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::Unavailable(err.to_string())
    }
}

/// Read descriptors out of a raw chat completions response body.
pub fn descriptors_from_body(body: &str) -> Result<Vec<PlaceholderDescriptor>, ExtractError> {
    if body.trim().is_empty() {
        return Err(docx_fill_core::Error::ExtractionProtocol(
            "empty response from extraction service".to_string(),
        )
        .into());
    }

    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        docx_fill_core::Error::ExtractionProtocol(format!("unreadable response: {}", e))
    })?;

    let Some(choice) = response.choices.into_iter().next() else {
        warn!("Extraction response has no choices");
        return Ok(Vec::new());
    };
    let content = choice.message.content.unwrap_or_default();
    Ok(parse_extraction_reply(&content)?)
}
