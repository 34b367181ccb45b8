// Public modules
pub mod chat_completion;
pub mod chat_completion_chunk;
pub mod message;
pub mod model;
pub mod stream_event;

// Re-exports
pub use chat_completion::ChatCompletionRequest;
pub use chat_completion_chunk::{
    ApiErrorObject, ApiErrorResponse, ChatCompletionChunk, ChunkChoice, ChunkDelta,
};
pub use message::{Message, Role};
pub use model::{KnownModel, Model};
pub use stream_event::StreamEvent;
