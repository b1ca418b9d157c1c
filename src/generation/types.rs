use serde::{Deserialize, Serialize};

/// Message in a generation conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to the text-generation service
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Model identifier; the client fills its configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    /// Streaming is never used; responses are awaited whole.
    #[serde(default)]
    pub stream: bool,
}

impl GenerationRequest {
    /// Create a request from a single user prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            messages: vec![Message::user(prompt)],
            stream: false,
        }
    }

    /// Create a request from explicit messages
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            stream: false,
        }
    }

    /// Override the model for this request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from the text-generation service
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    /// The generated text.
    pub content: String,
    /// Raw model/usage details, when the service reports them.
    pub raw: Option<RawResponse>,
}

/// Raw model response details
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}
