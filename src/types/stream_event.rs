use serde::{Deserialize, Serialize};

use crate::types::ChatCompletionChunk;

/// An event decoded from the server-sent event stream of a chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A `data:` payload carrying a completion chunk.
    Chunk(ChatCompletionChunk),

    /// The `[DONE]` terminator.
    Done,
}

impl StreamEvent {
    /// Returns the text fragment carried by this event, if any.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Chunk(chunk) => chunk.text_delta(),
            StreamEvent::Done => None,
        }
    }
}
