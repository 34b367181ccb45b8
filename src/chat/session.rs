//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! history and drives one streaming turn at a time through [`TurnState`].

use std::time::Instant;

use futures::StreamExt;

use crate::Error;
use crate::chat::config::{ChatConfig, PrimingPolicy};
use crate::completion::CompletionProvider;
use crate::error::Result;
use crate::observability::{CHAT_EMPTY_INPUTS, CHAT_TURN_DURATION, CHAT_TURN_ERRORS, CHAT_TURNS};
use crate::render::Renderer;
use crate::types::{Message, Role};

/// Where the session is within a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for input.
    #[default]
    Idle,
    /// The user message is in history and the request is being built.
    UserSubmitted,
    /// Fragments are arriving.
    Streaming,
    /// The reply was appended; the session drops back to `Idle` right away.
    Committed,
}

/// What a call to [`ChatSession::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The input was empty after trimming. Nothing was sent or stored.
    Ignored,
    /// A reply was streamed and committed to history.
    Committed(String),
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Messages typed by the user.
    pub user_messages: usize,
    /// Messages produced by the assistant, the greeting included.
    pub assistant_messages: usize,
    /// Turns that ended with a committed reply.
    pub completed_turns: u64,
    /// Turns that ended with a provider error or an empty reply.
    pub failed_turns: u64,
    /// Whether the last message still waits for a reply.
    pub awaiting_reply: bool,
}

/// A chat session that owns conversation state and talks to a provider.
///
/// The history starts with one assistant greeting. It only ever grows: user
/// messages are appended on submit and assistant messages on commit.
pub struct ChatSession<P: CompletionProvider> {
    provider: P,
    config: ChatConfig,
    history: Vec<Message>,
    state: TurnState,
    completed_turns: u64,
    failed_turns: u64,
}

impl<P: CompletionProvider> ChatSession<P> {
    /// Creates a new chat session seeded with the configured greeting.
    pub fn new(provider: P, config: ChatConfig) -> Self {
        let history = vec![Message::assistant(config.initial_response.clone())];
        Self {
            provider,
            config,
            history,
            state: TurnState::Idle,
            completed_turns: 0,
            failed_turns: 0,
        }
    }

    /// The conversation so far, in display order.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The provider replies come from.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Whether the last history entry is a user message with no reply.
    pub fn awaiting_reply(&self) -> bool {
        self.history
            .last()
            .is_some_and(|message| message.role == Role::User)
    }

    /// Append a user message to the history.
    pub fn append_user(&mut self, content: impl Into<String>) {
        self.history.push(Message::user(content));
    }

    /// Append an assistant message to the history.
    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.history.push(Message::assistant(content));
    }

    /// Build the messages sent for the next completion.
    ///
    /// The payload is the system context, then the priming turn when enabled,
    /// then the full history. It is rebuilt on every call and never stored.
    pub fn request_payload(&self) -> Vec<Message> {
        let mut payload = Vec::with_capacity(self.history.len() + 2);
        payload.push(Message::system(self.config.chat_context.clone()));
        if self.config.priming == PrimingPolicy::PrimeWithInitialMessage {
            payload.push(Message::assistant(self.config.initial_msg.clone()));
        }
        payload.extend(self.history.iter().cloned());
        payload
    }

    /// Submit one line of user input and stream the reply.
    ///
    /// Whitespace-only input is ignored without contacting the provider. On a
    /// provider error or an empty reply the user message stays in history, no
    /// assistant entry is added, the error is rendered and then returned.
    pub async fn submit(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        if input.trim().is_empty() {
            CHAT_EMPTY_INPUTS.click();
            return Ok(TurnOutcome::Ignored);
        }
        self.append_user(input);
        self.enter(TurnState::UserSubmitted, renderer);
        renderer.echo_user(input);
        self.complete_turn(renderer).await
    }

    /// Re-send the conversation when the last user message got no reply.
    ///
    /// Returns [`TurnOutcome::Ignored`] when there is nothing to retry.
    pub async fn retry(&mut self, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        if !self.awaiting_reply() {
            return Ok(TurnOutcome::Ignored);
        }
        self.enter(TurnState::UserSubmitted, renderer);
        self.complete_turn(renderer).await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let count = |role: Role| self.history.iter().filter(|m| m.role == role).count();
        SessionStats {
            message_count: self.message_count(),
            user_messages: count(Role::User),
            assistant_messages: count(Role::Assistant),
            completed_turns: self.completed_turns,
            failed_turns: self.failed_turns,
            awaiting_reply: self.awaiting_reply(),
        }
    }

    fn enter(&mut self, state: TurnState, renderer: &mut dyn Renderer) {
        self.state = state;
        renderer.turn_state(state);
    }

    async fn complete_turn(&mut self, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        CHAT_TURNS.click();
        let start = Instant::now();
        let payload = self.request_payload();
        self.enter(TurnState::Streaming, renderer);
        let result = stream_reply(&self.provider, &payload, renderer).await;
        CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                self.append_assistant(reply.clone());
                self.enter(TurnState::Committed, renderer);
                self.completed_turns += 1;
                self.enter(TurnState::Idle, renderer);
                Ok(TurnOutcome::Committed(reply))
            }
            Err(err) => {
                CHAT_TURN_ERRORS.click();
                self.failed_turns += 1;
                self.enter(TurnState::Idle, renderer);
                renderer.print_error(&err.to_string());
                Err(err)
            }
        }
    }
}

/// Forward every fragment to `renderer` and return their concatenation.
///
/// Fragments already shown are not kept when the stream fails.
async fn stream_reply<P: CompletionProvider>(
    provider: &P,
    payload: &[Message],
    renderer: &mut dyn Renderer,
) -> Result<String> {
    let mut fragments = provider.stream_completion(payload).await?;
    renderer.start_response();
    let mut reply = String::new();
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(text) => {
                renderer.print_text(&text);
                reply.push_str(&text);
            }
            Err(err) => {
                renderer.finish_response();
                return Err(err);
            }
        }
    }
    renderer.finish_response();
    if reply.is_empty() {
        return Err(Error::streaming("provider returned an empty reply", None));
    }
    Ok(reply)
}
