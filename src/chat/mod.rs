//! Chat application module for interactive conversations.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! completion client. It supports:
//!
//! - Streaming responses with real-time fragment display
//! - Role-tagged message bubbles with avatars
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: conversation state and the per-turn state machine
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{BufferRenderer, PlainTextRenderer, RenderEvent, Renderer, render_history};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_CAPTION, DEFAULT_TITLE, PrimingPolicy};
pub use session::{ChatSession, SessionStats, TurnOutcome, TurnState};
