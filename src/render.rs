//! Output rendering for the chat display.
//!
//! This module provides a trait-based rendering abstraction. The display is a
//! full-state re-render model: [`render_history`] redraws every stored message,
//! while the `start_response`/`print_text`/`finish_response` calls drive the live
//! region for a reply that is still streaming.

use std::io::{self, Stdout, Write};

use crate::chat::TurnState;
use crate::types::{Message, Role};

/// ANSI escape code for bold text (used for the title).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for the caption).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for assistant bubbles).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Avatar shown next to assistant messages.
pub const ASSISTANT_AVATAR: &str = "🤖";

/// Avatar shown next to user messages.
pub const USER_AVATAR: &str = "🗨️";

/// Avatar for a role.
pub fn avatar(role: Role) -> &'static str {
    match role {
        Role::Assistant => ASSISTANT_AVATAR,
        Role::User => USER_AVATAR,
        Role::System => "⚙️",
    }
}

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print the page title and caption.
    fn print_header(&mut self, title: &str, caption: &str);

    /// Print one stored message as a role-tagged bubble.
    fn print_message(&mut self, message: &Message);

    /// Echo freshly submitted user input.
    ///
    /// Terminals already show what was typed, so the default does nothing.
    fn echo_user(&mut self, content: &str) {
        _ = content;
    }

    /// Observe a turn state transition.
    fn turn_state(&mut self, state: TurnState) {
        _ = state;
    }

    /// Open the live region for an assistant reply.
    fn start_response(&mut self);

    /// Print a chunk of streamed response text.
    ///
    /// This is called incrementally as fragments arrive from the provider.
    fn print_text(&mut self, text: &str);

    /// Close the live region.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Redraw the full conversation history.
///
/// System messages are never part of the visible history and are skipped.
pub fn render_history(history: &[Message], renderer: &mut dyn Renderer) {
    for message in history.iter().filter(|m| m.role != Role::System) {
        renderer.print_message(message);
    }
}

/////////////////////////////////////////// Terminal ///////////////////////////////////////////

/// Plain text renderer with optional ANSI styling.
///
/// This renderer outputs text directly to stdout; errors go to stderr.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn bubble_prefix(&self, role: Role) -> String {
        let avatar = avatar(role);
        if self.use_color && role == Role::Assistant {
            format!("{ANSI_CYAN}{avatar}{ANSI_RESET} ")
        } else {
            format!("{avatar} ")
        }
    }

    /// Writes text so that continuation lines stay aligned inside the bubble.
    fn write_in_bubble(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            if self.line_start {
                print!("   ");
            }
            print!("{line}");
            self.line_start = line.ends_with('\n');
        }
        self.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_header(&mut self, title: &str, caption: &str) {
        if self.use_color {
            println!("{ANSI_BOLD}{title}{ANSI_RESET}");
            println!("{ANSI_DIM}{caption}{ANSI_RESET}\n");
        } else {
            println!("{title}");
            println!("{caption}\n");
        }
        self.line_start = true;
        self.flush();
    }

    fn print_message(&mut self, message: &Message) {
        print!("{}", self.bubble_prefix(message.role));
        self.line_start = false;
        self.write_in_bubble(&message.content);
        if !self.line_start {
            println!();
            self.line_start = true;
        }
        self.flush();
    }

    fn start_response(&mut self) {
        print!("{}", self.bubble_prefix(Role::Assistant));
        self.line_start = false;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        self.write_in_bubble(text);
    }

    fn finish_response(&mut self) {
        if !self.line_start {
            println!();
            self.line_start = true;
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.finish_response();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.finish_response();
        println!("{info}");
        self.flush();
    }
}

//////////////////////////////////////////// Buffer ////////////////////////////////////////////

/// One call recorded by [`BufferRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// `print_header`
    Header {
        /// The title.
        title: String,
        /// The caption.
        caption: String,
    },
    /// `print_message`
    Message(Message),
    /// `echo_user`
    EchoUser(String),
    /// `turn_state`
    TurnState(TurnState),
    /// `start_response`
    StartResponse,
    /// `print_text`
    Text(String),
    /// `finish_response`
    FinishResponse,
    /// `print_error`
    Error(String),
    /// `print_info`
    Info(String),
}

/// A renderer that records every call instead of printing.
///
/// Useful for embedding the chat loop behind another display, and for tests.
#[derive(Debug, Clone, Default)]
pub struct BufferRenderer {
    events: Vec<RenderEvent>,
}

impl BufferRenderer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    /// The messages drawn with `print_message`, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Message(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Concatenation of every streamed text chunk.
    pub fn streamed_text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The error messages printed, in order.
    pub fn errors(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// The turn states entered, in order.
    pub fn turn_states(&self) -> Vec<TurnState> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::TurnState(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Renderer for BufferRenderer {
    fn print_header(&mut self, title: &str, caption: &str) {
        self.events.push(RenderEvent::Header {
            title: title.to_string(),
            caption: caption.to_string(),
        });
    }

    fn print_message(&mut self, message: &Message) {
        self.events.push(RenderEvent::Message(message.clone()));
    }

    fn echo_user(&mut self, content: &str) {
        self.events.push(RenderEvent::EchoUser(content.to_string()));
    }

    fn turn_state(&mut self, state: TurnState) {
        self.events.push(RenderEvent::TurnState(state));
    }

    fn start_response(&mut self) {
        self.events.push(RenderEvent::StartResponse);
    }

    fn print_text(&mut self, text: &str) {
        self.events.push(RenderEvent::Text(text.to_string()));
    }

    fn finish_response(&mut self) {
        self.events.push(RenderEvent::FinishResponse);
    }

    fn print_error(&mut self, error: &str) {
        self.events.push(RenderEvent::Error(error.to_string()));
    }

    fn print_info(&mut self, info: &str) {
        self.events.push(RenderEvent::Info(info.to_string()));
    }
}
