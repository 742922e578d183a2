// src/config.rs
use std::{fmt, path::PathBuf, str::FromStr};

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set; the completion service cannot be reached")]
    MissingApiKey,

    #[error("invalid PORT value: {0}")]
    InvalidPort(String),

    #[error("invalid CHAT_MODE value: {0} (expected open, gated or echo)")]
    InvalidMode(String),
}

/// How `/chat` routes a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// Straight to the completion service.
    #[default]
    Open,
    /// Client must resolve to an enabled directory entry before the completion call.
    Gated,
    /// Directory gate, then a greeting echo with no upstream call.
    Echo,
}

impl ChatMode {
    pub fn is_gated(self) -> bool {
        !matches!(self, ChatMode::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Open => "open",
            ChatMode::Gated => "gated",
            ChatMode::Echo => "echo",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "open" | "llm" => Ok(ChatMode::Open),
            "gated" | "directory" => Ok(ChatMode::Gated),
            "echo" | "simple" => Ok(ChatMode::Echo),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Cross-origin policy. `Any` when the origin list is `*` or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub port: u16,
    pub mode: ChatMode,
    pub logs_dir: PathBuf,
    pub clients_file: PathBuf,
    pub cors_origins: CorsOrigins,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            port: DEFAULT_PORT,
            mode: ChatMode::Open,
            logs_dir: PathBuf::from("logs"),
            clients_file: PathBuf::from("clients.json"),
            cors_origins: CorsOrigins::Any,
        }
    }
}

impl AppConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable           | Default                     |
    /// |--------------------|-----------------------------|
    /// | `OPENAI_API_KEY`   | none                        |
    /// | `OPENAI_BASE_URL`  | `https://api.openai.com/v1` |
    /// | `COMPLETION_MODEL` | `gpt-3.5-turbo`             |
    /// | `PORT`             | `8000`                      |
    /// | `CHAT_MODE`        | `open`                      |
    /// | `LOGS_DIR`         | `logs`                      |
    /// | `CLIENTS_FILE`     | `clients.json`              |
    /// | `CORS_ORIGINS`     | `*`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };

        let mode = match lookup("CHAT_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        Ok(Self {
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: lookup("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: lookup("COMPLETION_MODEL").unwrap_or(defaults.model),
            port,
            mode,
            logs_dir: lookup("LOGS_DIR").map(PathBuf::from).unwrap_or(defaults.logs_dir),
            clients_file: lookup("CLIENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.clients_file),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| CorsOrigins::parse(&raw))
                .unwrap_or(defaults.cors_origins),
        })
    }

    /// Fails fast when the completion credential is absent. Echo mode never
    /// calls upstream and runs without one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
