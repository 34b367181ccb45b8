use serde::{Deserialize, Serialize};

use crate::types::{Message, Model};

/// Body of a `POST chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model that will complete the conversation.
    pub model: Model,

    /// Ordered role-tagged messages, system context first.
    pub messages: Vec<Message>,

    /// Whether the response is streamed as server-sent events.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a streaming request.
    pub fn new_streaming(model: Model, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            stream: true,
        }
    }
}
