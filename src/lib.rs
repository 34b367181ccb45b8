//! A streaming terminal chat front-end for Groq's chat-completions API.
//!
//! The crate is split into the completion client ([`Groq`], [`sse`],
//! [`completion`]), secret resolution ([`secrets`]), and the chat loop
//! ([`chat`], [`render`]).

pub mod chat;
pub mod client;
pub mod client_logger;
pub mod completion;
pub mod error;
pub mod observability;
pub mod render;
pub mod secrets;
pub mod sse;
pub mod types;

pub use client::Groq;
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use completion::{CompletionProvider, FragmentStream, GroqCompletion};
pub use error::{Error, Result};
pub use render::{BufferRenderer, PlainTextRenderer, RenderEvent, Renderer, render_history};
pub use secrets::{ConfigProvider, SecretLoader, SecretsBundle};
pub use types::*;
