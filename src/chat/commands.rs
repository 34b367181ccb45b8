//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API. No command edits or removes history entries.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Redraw the full conversation.
    History,

    /// Re-send the last unanswered user message.
    Retry,

    /// Display session statistics.
    Stats,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use techbuddy::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/retry").is_some());
/// assert!(parse_command("How do I write a closure?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match (command.as_str(), argument) {
        ("help" | "?", _) => ChatCommand::Help,
        ("history", None) => ChatCommand::History,
        ("retry", None) => ChatCommand::Retry,
        ("stats" | "status", None) => ChatCommand::Stats,
        ("quit" | "exit" | "q", _) => ChatCommand::Quit,
        ("history" | "retry" | "stats" | "status", Some(_)) => {
            ChatCommand::Invalid(format!("/{command} takes no arguments"))
        }
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /history               Redraw the whole conversation
  /retry                 Re-send the last message if it got no reply
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
