//! Configuration loading.
//!
//! The API credential comes from the process environment, optionally
//! populated from an untracked `.env` file. Loading returns a [`Config`]
//! value; the process environment is never modified.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Primary environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Secondary environment variable, shared with other Google tooling.
pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable overriding the default model.
pub const MODEL_ENV: &str = "GENIMG_MODEL";

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Default location of the key/value file.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Resolved configuration for a single invocation.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// API key, if one was found.
    pub api_key: Option<String>,
    /// Default model identifier.
    pub model: Option<String>,
    /// The `.env` file that was read, if it existed.
    pub env_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the environment and `./.env`.
    pub fn load() -> Self {
        Self::load_from(DEFAULT_ENV_FILE)
    }

    /// Loads configuration from the environment and the given `.env` file.
    ///
    /// Values already present in the environment win over the file.
    pub fn load_from(env_file: impl AsRef<Path>) -> Self {
        let env_file = env_file.as_ref();
        let file_vars = match std::fs::read_to_string(env_file) {
            Ok(content) => {
                tracing::debug!(path = %env_file.display(), "loaded env file");
                Some(parse_env_file(&content))
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %env_file.display(), "could not read env file: {e}");
                }
                None
            }
        };

        let vars = merge_env(
            unicode_vars(std::env::vars_os()),
            file_vars.clone().unwrap_or_default(),
        );
        let mut config = Self::from_vars(&vars);
        if file_vars.is_some() {
            config.env_file = Some(env_file.to_path_buf());
        }
        config
    }

    /// Builds a configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            api_key: get(API_KEY_ENV).or_else(|| get(FALLBACK_API_KEY_ENV)),
            model: get(MODEL_ENV),
            env_file: None,
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the configured default model, or [`DEFAULT_MODEL`].
    pub fn default_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Parses `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is
/// accepted, and matching surrounding quotes are stripped. Later lines win.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    vars
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Overlays process variables on top of file variables.
/// Keeps the pairs whose key and value are both valid UTF-8.
fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn merge_env(
    process: impl IntoIterator<Item = (String, String)>,
    file: HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = file;
    merged.extend(process);
    merged
}
