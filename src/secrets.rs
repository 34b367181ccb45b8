//! Startup secret resolution.
//!
//! A [`SecretLoader`] queries an ordered list of [`ConfigProvider`]s. The first
//! provider that yields a non-empty `GROQ_API_KEY` wins, and the remaining values
//! of the [`SecretsBundle`] are read from that same provider, falling back to
//! built-in defaults. When no provider has the key, resolution fails with
//! [`Error::Configuration`] and the chat never starts.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Key holding the Groq API key. Required.
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
/// Key holding the greeting shown before any interaction.
pub const INITIAL_RESPONSE: &str = "INITIAL_RESPONSE";
/// Key holding the input placeholder, also used as the priming assistant turn.
pub const INITIAL_MSG: &str = "INITIAL_MSG";
/// Key holding the system-role instruction sent with every request.
pub const CHAT_CONTEXT: &str = "CHAT_CONTEXT";

/// Every key the loader understands.
pub const KNOWN_KEYS: [&str; 4] = [GROQ_API_KEY, INITIAL_RESPONSE, INITIAL_MSG, CHAT_CONTEXT];

/// Greeting used when `INITIAL_RESPONSE` is not configured.
pub const DEFAULT_INITIAL_RESPONSE: &str = "Hello!";
/// Placeholder used when `INITIAL_MSG` is not configured.
pub const DEFAULT_INITIAL_MSG: &str = "I'm ready to chat!";
/// System context used when `CHAT_CONTEXT` is not configured.
pub const DEFAULT_CHAT_CONTEXT: &str = "You are a helpful assistant.";

/// Default location of the local environment-definition file.
pub const DEFAULT_ENV_FILE: &str = ".env";
/// Default location of the hosted secret store's file.
pub const DEFAULT_SECRETS_FILE: &str = ".streamlit/secrets.toml";

/////////////////////////////////////////// Bundle ///////////////////////////////////////////

/// The four strings resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretsBundle {
    /// The Groq API key.
    pub api_key: String,
    /// Assistant greeting that seeds every new session.
    pub initial_response: String,
    /// Input placeholder and priming assistant turn.
    pub initial_msg: String,
    /// System-role instruction.
    pub chat_context: String,
}

impl SecretsBundle {
    /// Build a bundle from an API key and the defaults for everything else.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            initial_response: DEFAULT_INITIAL_RESPONSE.to_string(),
            initial_msg: DEFAULT_INITIAL_MSG.to_string(),
            chat_context: DEFAULT_CHAT_CONTEXT.to_string(),
        }
    }

    /// Build a bundle from one provider's values, or `None` without an API key.
    fn from_values(values: &HashMap<String, String>) -> Option<Self> {
        let lookup = |key: &str, default: &str| {
            values
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let api_key = values
            .get(GROQ_API_KEY)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())?;
        Some(Self {
            api_key: api_key.to_string(),
            initial_response: lookup(INITIAL_RESPONSE, DEFAULT_INITIAL_RESPONSE),
            initial_msg: lookup(INITIAL_MSG, DEFAULT_INITIAL_MSG),
            chat_context: lookup(CHAT_CONTEXT, DEFAULT_CHAT_CONTEXT),
        })
    }
}

impl fmt::Debug for SecretsBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsBundle")
            .field("api_key", &"<redacted>")
            .field("initial_response", &self.initial_response)
            .field("initial_msg", &self.initial_msg)
            .field("chat_context", &self.chat_context)
            .finish()
    }
}

////////////////////////////////////////// Providers /////////////////////////////////////////

/// A source of configuration key/value pairs.
pub trait ConfigProvider: Send + Sync {
    /// Short description used in error messages.
    fn name(&self) -> String;

    /// Load every key/value pair this provider knows about.
    fn load(&self) -> Result<HashMap<String, String>>;
}

/// Reads a dotenv-style file such as `.env`.
#[derive(Debug, Clone)]
pub struct DotenvFile {
    path: PathBuf,
}

impl DotenvFile {
    /// Read from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for DotenvFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(&self.path)? {
            let (key, value) = item?;
            values.insert(key, value);
        }
        Ok(values)
    }
}

/// Reads the hosted secret store's TOML file, e.g. `.streamlit/secrets.toml`.
///
/// Only top-level string values are used; tables and non-string values are ignored.
#[derive(Debug, Clone)]
pub struct SecretsToml {
    path: PathBuf,
}

impl SecretsToml {
    /// Read from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(contents: &str) -> Result<HashMap<String, String>> {
        let table: toml::Table = toml::from_str(contents)?;
        Ok(table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect())
    }
}

impl ConfigProvider for SecretsToml {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let contents = read_file(&self.path)?;
        Self::parse(&contents)
    }
}

/// Reads the known keys from the process environment.
///
/// Hosted deployments commonly inject secrets this way.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment;

impl ConfigProvider for ProcessEnvironment {
    fn name(&self) -> String {
        "environment".to_string()
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        Ok(KNOWN_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect())
    }
}

/// An in-memory provider.
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    name: String,
    values: HashMap<String, String>,
}

impl MapProvider {
    /// Create a provider named `name` serving `values`.
    pub fn new<K, V>(name: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigProvider for MapProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.values.clone())
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| Error::io(format!("cannot read {}: {err}", path.display()), err))
}

/////////////////////////////////////////// Loader ///////////////////////////////////////////

/// Resolves a [`SecretsBundle`] from providers in priority order.
#[derive(Default)]
pub struct SecretLoader {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl SecretLoader {
    /// A loader with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: dotenv file, then the secret store file, then the environment.
    pub fn standard(env_file: impl Into<PathBuf>, secrets_file: impl Into<PathBuf>) -> Self {
        Self::new()
            .with_provider(DotenvFile::new(env_file))
            .with_provider(SecretsToml::new(secrets_file))
            .with_provider(ProcessEnvironment)
    }

    /// Append a provider; it is consulted after every provider added before it.
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Names of the configured providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve the bundle, or fail with a configuration error.
    pub fn resolve(&self) -> Result<SecretsBundle> {
        let mut attempts = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.load() {
                Ok(values) => match SecretsBundle::from_values(&values) {
                    Some(bundle) => return Ok(bundle),
                    None => attempts.push(format!("{}: no {GROQ_API_KEY}", provider.name())),
                },
                Err(err) => attempts.push(format!("{}: {err}", provider.name())),
            }
        }
        let checked = if attempts.is_empty() {
            "no configuration providers".to_string()
        } else {
            attempts.join("; ")
        };
        Err(Error::configuration(
            format!("{GROQ_API_KEY} not found (checked {checked})"),
            Some(GROQ_API_KEY.to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("techbuddy-secrets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn first_provider_with_key_wins() {
        let bundle = SecretLoader::new()
            .with_provider(MapProvider::new("local", [(INITIAL_RESPONSE, "Yo!")]))
            .with_provider(MapProvider::new(
                "hosted",
                [(GROQ_API_KEY, "gsk_hosted"), (CHAT_CONTEXT, "Be terse.")],
            ))
            .with_provider(MapProvider::new("env", [(GROQ_API_KEY, "gsk_env")]))
            .resolve()
            .unwrap();

        assert_eq!(bundle.api_key, "gsk_hosted");
        assert_eq!(bundle.chat_context, "Be terse.");
        // Values are not merged across providers.
        assert_eq!(bundle.initial_response, DEFAULT_INITIAL_RESPONSE);
        assert_eq!(bundle.initial_msg, DEFAULT_INITIAL_MSG);
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let err = SecretLoader::new()
            .with_provider(MapProvider::new("local", [(GROQ_API_KEY, "  ")]))
            .resolve()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("local: no GROQ_API_KEY"));
    }

    #[test]
    fn missing_key_everywhere_is_configuration_error() {
        let loader = SecretLoader::new()
            .with_provider(DotenvFile::new("/nonexistent/techbuddy/.env"))
            .with_provider(MapProvider::new("hosted", [(INITIAL_MSG, "hi")]));
        let err = loader.resolve().unwrap_err();

        assert!(err.is_configuration());
        let message = err.to_string();
        assert!(message.contains("/nonexistent/techbuddy/.env"));
        assert!(message.contains("hosted: no GROQ_API_KEY"));
    }

    #[test]
    fn no_providers() {
        let err = SecretLoader::new().resolve().unwrap_err();
        assert!(err.to_string().contains("no configuration providers"));
    }

    #[test]
    fn dotenv_file_values() {
        let path = temp_file(
            "local.env",
            "GROQ_API_KEY=gsk_local\nINITIAL_RESPONSE=\"Hey there!\"\n# comment\nCHAT_CONTEXT='You teach Rust.'\n",
        );
        let bundle = SecretLoader::new()
            .with_provider(DotenvFile::new(&path))
            .resolve()
            .unwrap();

        assert_eq!(bundle.api_key, "gsk_local");
        assert_eq!(bundle.initial_response, "Hey there!");
        assert_eq!(bundle.chat_context, "You teach Rust.");
        assert_eq!(bundle.initial_msg, DEFAULT_INITIAL_MSG);
    }

    #[test]
    fn secrets_toml_values() {
        let path = temp_file(
            "secrets.toml",
            "GROQ_API_KEY = \"gsk_toml\"\nINITIAL_MSG = \"Ask away\"\nretries = 3\n\n[section]\nGROQ_API_KEY = \"nested\"\n",
        );
        let bundle = SecretLoader::new()
            .with_provider(SecretsToml::new(&path))
            .resolve()
            .unwrap();

        assert_eq!(bundle.api_key, "gsk_toml");
        assert_eq!(bundle.initial_msg, "Ask away");
    }

    #[test]
    fn broken_toml_falls_through() {
        let path = temp_file("broken.toml", "GROQ_API_KEY = \n");
        let bundle = SecretLoader::new()
            .with_provider(SecretsToml::new(&path))
            .with_provider(MapProvider::new("fallback", [(GROQ_API_KEY, "gsk_fallback")]))
            .resolve()
            .unwrap();
        assert_eq!(bundle.api_key, "gsk_fallback");
    }

    #[test]
    fn standard_chain_order() {
        let loader = SecretLoader::standard(DEFAULT_ENV_FILE, DEFAULT_SECRETS_FILE);
        assert_eq!(
            loader.provider_names(),
            vec![
                DEFAULT_ENV_FILE.to_string(),
                DEFAULT_SECRETS_FILE.to_string(),
                "environment".to_string()
            ]
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let bundle = SecretsBundle::with_api_key("gsk_very_secret");
        let debug = format!("{bundle:?}");
        assert!(!debug.contains("gsk_very_secret"));
    }
}
