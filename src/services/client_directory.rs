// src/services/client_directory.rs
use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_GREETING: &str = "Hello!";

/// One tenant's entry in the clients document. Keys other than `enabled` and
/// `bot_greeting` are kept as company metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip)]
    pub client_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_greeting")]
    pub bot_greeting: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            client_id: client_id.into(),
            enabled,
            bot_greeting: default_greeting(),
            metadata: Map::new(),
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.bot_greeting = greeting.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read clients document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed clients document: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Static per-client configuration lookup. `None` means unknown client, which
/// is a business outcome and never an error.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn resolve(&self, client_id: &str) -> Option<ClientConfig>;
}

/// Reads a JSON object of `client_id -> ClientConfig` on every lookup.
#[derive(Debug, Clone)]
pub struct FileClientDirectory {
    path: PathBuf,
}

impl FileClientDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing document is an empty mapping.
    pub async fn load(&self) -> Result<HashMap<String, ClientConfig>, DirectoryError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut clients: HashMap<String, ClientConfig> = serde_json::from_slice(&raw)?;
        for (id, config) in clients.iter_mut() {
            config.client_id = id.clone();
        }
        Ok(clients)
    }
}

#[async_trait]
impl ClientDirectory for FileClientDirectory {
    async fn resolve(&self, client_id: &str) -> Option<ClientConfig> {
        match self.load().await {
            Ok(mut clients) => clients.remove(client_id),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "clients document unusable, treating as empty"
                );
                None
            }
        }
    }
}

/// In-memory directory for tests and fixed deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticClientDirectory {
    clients: HashMap<String, ClientConfig>,
}

impl StaticClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, config: ClientConfig) -> Self {
        self.clients.insert(config.client_id.clone(), config);
        self
    }
}

#[async_trait]
impl ClientDirectory for StaticClientDirectory {
    async fn resolve(&self, client_id: &str) -> Option<ClientConfig> {
        self.clients.get(client_id).cloned()
    }
}
