//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::secrets::{
    DEFAULT_CHAT_CONTEXT, DEFAULT_ENV_FILE, DEFAULT_INITIAL_MSG, DEFAULT_INITIAL_RESPONSE,
    DEFAULT_SECRETS_FILE, SecretsBundle,
};
use crate::types::Model;

/// Title printed above the conversation.
pub const DEFAULT_TITLE: &str = "Hey Buddy! 🤓";

/// Caption printed under the title.
pub const DEFAULT_CAPTION: &str = "Helping you level up your coding game";

/// Command-line arguments for the buddy-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: llama-3.1-8b-instant)", "MODEL")]
    pub model: Option<String>,

    /// Dotenv file consulted first for secrets.
    #[arrrg(optional, "Dotenv file to read secrets from (default: .env)", "PATH")]
    pub env_file: Option<String>,

    /// TOML secrets file consulted when the dotenv file has no API key.
    #[arrrg(optional, "TOML secrets file (default: .streamlit/secrets.toml)", "PATH")]
    pub secrets_file: Option<String>,

    /// Do not send the priming assistant turn ahead of the history.
    #[arrrg(flag, "Do not prime requests with INITIAL_MSG")]
    pub no_prime: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Write every request and stream event to this file as JSON lines.
    #[arrrg(optional, "Log requests and stream events to a JSON-lines file", "PATH")]
    pub log_file: Option<String>,
}

impl ChatArgs {
    /// The dotenv path, falling back to `.env`.
    pub fn env_file(&self) -> &str {
        self.env_file.as_deref().unwrap_or(DEFAULT_ENV_FILE)
    }

    /// The secrets path, falling back to `.streamlit/secrets.toml`.
    pub fn secrets_file(&self) -> &str {
        self.secrets_file.as_deref().unwrap_or(DEFAULT_SECRETS_FILE)
    }
}

/// Whether a priming assistant turn precedes the stored history in requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimingPolicy {
    /// Send `assistant(INITIAL_MSG)` right after the system context.
    #[default]
    PrimeWithInitialMessage,
    /// Send only the system context and the history.
    Omit,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and secrets with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// System context sent first on every request.
    pub chat_context: String,

    /// Greeting that seeds the history.
    pub initial_response: String,

    /// Input placeholder, also used as the priming turn.
    pub initial_msg: String,

    /// Whether requests carry the priming turn.
    pub priming: PrimingPolicy,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Title printed above the conversation.
    pub title: String,

    /// Caption printed under the title.
    pub caption: String,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            chat_context: DEFAULT_CHAT_CONTEXT.to_string(),
            initial_response: DEFAULT_INITIAL_RESPONSE.to_string(),
            initial_msg: DEFAULT_INITIAL_MSG.to_string(),
            priming: PrimingPolicy::default(),
            use_color: true,
            title: DEFAULT_TITLE.to_string(),
            caption: DEFAULT_CAPTION.to_string(),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system context.
    pub fn with_chat_context(mut self, context: impl Into<String>) -> Self {
        self.chat_context = context.into();
        self
    }

    /// Sets the greeting.
    pub fn with_initial_response(mut self, greeting: impl Into<String>) -> Self {
        self.initial_response = greeting.into();
        self
    }

    /// Sets the placeholder and priming text.
    pub fn with_initial_msg(mut self, msg: impl Into<String>) -> Self {
        self.initial_msg = msg.into();
        self
    }

    /// Sets the priming policy.
    pub fn with_priming(mut self, priming: PrimingPolicy) -> Self {
        self.priming = priming;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Take the three display strings from resolved secrets.
    ///
    /// The API key is not retained here; it belongs to the client.
    pub fn with_secrets(mut self, secrets: &SecretsBundle) -> Self {
        self.chat_context = secrets.chat_context.clone();
        self.initial_response = secrets.initial_response.clone();
        self.initial_msg = secrets.initial_msg.clone();
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or_default();
        let priming = if args.no_prime {
            PrimingPolicy::Omit
        } else {
            PrimingPolicy::PrimeWithInitialMessage
        };

        ChatConfig {
            model,
            priming,
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}
