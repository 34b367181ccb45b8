//! Interactive coding-buddy chat backed by Groq.
//!
//! Secrets are read from `.env`, then `.streamlit/secrets.toml`, then the
//! process environment. The first source with `GROQ_API_KEY` supplies every
//! value.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! buddy-chat
//!
//! # Use a bigger model and a different dotenv file
//! buddy-chat --model llama-3.3-70b-versatile --env-file prod.env
//!
//! # Disable colors and record the wire traffic
//! buddy-chat --no-color --log-file buddy.jsonl
//! ```
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/history` - Redraw the conversation
//! - `/retry` - Re-send a message that got no reply
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::borrow::Cow;
use std::sync::Arc;

use arrrg::CommandLine;
use biometrics::Collector;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use techbuddy::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command, render_history,
};
use techbuddy::observability::{register_biometrics, snapshot};
use techbuddy::render::USER_AVATAR;
use techbuddy::{Groq, GroqCompletion, JsonLinesLogger, SecretLoader};

/// Shows the placeholder text as a dimmed hint while the input line is empty.
struct PlaceholderHelper {
    placeholder: String,
    use_color: bool,
}

impl Completer for PlaceholderHelper {
    type Candidate = String;
}

impl Hinter for PlaceholderHelper {
    type Hint = String;

    fn hint(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if line.is_empty() {
            Some(self.placeholder.clone())
        } else {
            None
        }
    }
}

impl Highlighter for PlaceholderHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if self.use_color {
            Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
        } else {
            Cow::Borrowed(hint)
        }
    }
}

impl Validator for PlaceholderHelper {}

impl Helper for PlaceholderHelper {}

/// Main entry point for the buddy-chat application.
#[tokio::main]
async fn main() {
    let (args, _) = ChatArgs::from_command_line_relaxed("buddy-chat [OPTIONS]");

    let loader = SecretLoader::standard(args.env_file(), args.secrets_file());
    let secrets = match loader.resolve() {
        Ok(secrets) => secrets,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let log_file = args.log_file.clone();
    let config = ChatConfig::from(args).with_secrets(&secrets);
    let use_color = config.use_color;

    let client = match build_client(&secrets.api_key, log_file.as_deref()) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let collector = Collector::new();
    register_biometrics(&collector);

    let provider = GroqCompletion::new(client, config.model.clone());
    let mut session = ChatSession::new(provider, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);

    let mut rl: Editor<PlaceholderHelper, DefaultHistory> = match Editor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Error: cannot open the line editor: {err}");
            std::process::exit(1);
        }
    };
    rl.set_helper(Some(PlaceholderHelper {
        placeholder: session.config().initial_msg.clone(),
        use_color,
    }));

    renderer.print_header(&session.config().title, &session.config().caption);
    render_history(session.history(), &mut renderer);
    let prompt = format!("{USER_AVATAR} ");

    loop {
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = rl.add_history_entry(trimmed);
                }

                if let Some(cmd) = parse_command(trimmed) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::History => {
                            renderer.print_header(
                                &session.config().title,
                                &session.config().caption,
                            );
                            render_history(session.history(), &mut renderer);
                        }
                        ChatCommand::Retry => {
                            if session.awaiting_reply() {
                                let _ = session.retry(&mut renderer).await;
                            } else {
                                renderer.print_info("Nothing to retry.");
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                if session.submit(&line, &mut renderer).await.is_err() {
                    renderer.print_info("Type /retry to send it again.");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }
}

/// Build the client, attaching a JSON-lines logger when `log_file` is set.
fn build_client(api_key: &str, log_file: Option<&str>) -> techbuddy::Result<Groq> {
    let client = Groq::new(api_key.to_string())?;
    match log_file {
        Some(path) => Ok(client.with_logger(Arc::new(JsonLinesLogger::open(path)?))),
        None => Ok(client),
    }
}

fn print_stats(session: &ChatSession<GroqCompletion>) {
    let stats = session.stats();
    let counters = snapshot();
    println!("    Session Statistics:");
    println!("      Model: {}", session.provider().model());
    println!(
        "      Messages: {} ({} user / {} assistant)",
        stats.message_count, stats.user_messages, stats.assistant_messages
    );
    println!(
        "      Turns: {} completed / {} failed",
        stats.completed_turns, stats.failed_turns
    );
    if stats.awaiting_reply {
        println!("      Last message: awaiting reply (use /retry)");
    }
    println!(
        "      Requests: {} ({} failed)",
        counters.requests, counters.request_errors
    );
    println!(
        "      Streamed: {} events / {} fragments / {} bytes",
        counters.stream_events, counters.fragments, counters.stream_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsendable_key_is_reported() {
        let err = build_client("bad\nkey", None).unwrap_err();
        assert!(err.is_authentication());
        assert!(!err.to_string().contains("Authentication {"));
    }

    #[test]
    fn unopenable_log_file_is_reported() {
        let path = std::env::temp_dir()
            .join(format!("techbuddy-missing-{}", std::process::id()))
            .join("nested")
            .join("buddy.jsonl");
        let err = build_client("gsk_test", path.to_str()).unwrap_err();
        assert!(!err.is_provider());
    }

    #[test]
    fn client_without_log_file() {
        assert!(build_client("gsk_test", None).is_ok());
    }
}
