// src/state.rs
use std::sync::Arc;

use crate::config::{AppConfig, ChatMode, ConfigError};
use crate::services::client_directory::{ClientDirectory, FileClientDirectory};
use crate::services::completion_gateway::{CompletionGateway, OpenAiGateway, UnconfiguredGateway};
use crate::services::transcript_log::{FileTranscriptStore, TranscriptStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub mode: ChatMode,
    pub directory: Arc<dyn ClientDirectory>,
    pub gateway: Arc<dyn CompletionGateway>,
    pub transcripts: Arc<dyn TranscriptStore>,
}

impl AppState {
    pub fn new(
        mode: ChatMode,
        directory: Arc<dyn ClientDirectory>,
        gateway: Arc<dyn CompletionGateway>,
        transcripts: Arc<dyn TranscriptStore>,
    ) -> Self {
        Self {
            mode,
            directory,
            gateway,
            transcripts,
        }
    }

    /// File-backed state. A missing API key is fatal unless the mode never
    /// calls upstream.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let gateway: Arc<dyn CompletionGateway> = match (config.mode, config.require_api_key()) {
            (_, Ok(key)) => Arc::new(OpenAiGateway::new(key, &config.model, &config.base_url)),
            (ChatMode::Echo, Err(_)) => Arc::new(UnconfiguredGateway),
            (_, Err(e)) => return Err(e),
        };

        Ok(Self::new(
            config.mode,
            Arc::new(FileClientDirectory::new(&config.clients_file)),
            gateway,
            Arc::new(FileTranscriptStore::new(&config.logs_dir)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_fatal_outside_echo_mode() {
        let config = AppConfig::default();
        assert!(matches!(
            AppState::from_config(&config),
            Err(ConfigError::MissingApiKey)
        ));

        let echo = AppConfig {
            mode: ChatMode::Echo,
            ..AppConfig::default()
        };
        let state = AppState::from_config(&echo).unwrap();
        assert!(!state.gateway.is_configured());
    }

    #[test]
    fn key_present_builds_configured_gateway() {
        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            ..AppConfig::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(state.gateway.is_configured());
        assert_eq!(state.mode, ChatMode::Open);
    }
}
