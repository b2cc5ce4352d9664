//! Chat completions wire types.
//!
//! These are the request/response structures sent over HTTP to an
//! OpenAI-compatible `/chat/completions` endpoint. They are NOT the domain
//! types from relay-types -- the gateway converts between the two.

use serde::{Deserialize, Serialize};

use relay_types::turn::Role;

/// Request body for `/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

/// A single message in the request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// The parts of a non-streaming response the relay relies on.
///
/// Unknown fields are ignored; missing required fields fail the decode.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
