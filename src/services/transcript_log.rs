// src/services/transcript_log.rs
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// One exchange in a client's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub client_id: String,
    pub user_message: String,
    pub bot_reply: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl LogRecord {
    pub fn new(
        client_id: impl Into<String>,
        user_message: impl Into<String>,
        bot_reply: impl Into<String>,
        meta: Map<String, Value>,
    ) -> Self {
        Self::at(Utc::now(), client_id, user_message, bot_reply, meta)
    }

    /// Timestamp is RFC 3339 in UTC with microsecond precision.
    pub fn at(
        when: DateTime<Utc>,
        client_id: impl Into<String>,
        user_message: impl Into<String>,
        bot_reply: impl Into<String>,
        meta: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp: when.to_rfc3339_opts(SecondsFormat::Micros, true),
            client_id: client_id.into(),
            user_message: user_message.into(),
            bot_reply: bot_reply.into(),
            meta,
        }
    }
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcript serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Per-client append-only transcript storage.
///
/// Appends for the same `client_id` are applied in call order and none is
/// lost; appends for different clients do not wait on each other.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, client_id: &str, record: LogRecord) -> Result<(), TranscriptError>;

    async fn read(&self, client_id: &str) -> Result<Vec<LogRecord>, TranscriptError>;

    /// Every client's records concatenated. No ordering across clients.
    async fn list_all(&self) -> Result<Vec<LogRecord>, TranscriptError>;
}

/// Maps a client id to a file stem that stays inside the logs directory.
///
/// `[a-z0-9-]` pass through; every other byte, `_` and uppercase letters
/// included, becomes `_XX` (uppercase hex). The mapping is injective and
/// stays distinct on case-insensitive filesystems.
pub fn encode_client_id(client_id: &str) -> String {
    if client_id.is_empty() {
        return "_".to_string();
    }

    let mut stem = String::with_capacity(client_id.len());
    for byte in client_id.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => stem.push(byte as char),
            _ => stem.push_str(&format!("_{byte:02X}")),
        }
    }
    stem
}

/// One pretty-printed JSON array per client under `dir`.
#[derive(Debug, Clone)]
pub struct FileTranscriptStore {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FileTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn path_for(&self, client_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_client_id(client_id)))
    }

    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock().await;
        table.entry(key.to_string()).or_default().clone()
    }

    /// Drops the table entry once no other append holds or waits on it.
    async fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut table = self.locks.lock().await;
        // One reference in the table, one here.
        if Arc::strong_count(&lock) == 2 {
            table.remove(key);
        }
    }

    async fn append_locked(&self, client_id: &str, record: LogRecord) -> Result<(), TranscriptError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(client_id);
        let mut records = Self::load(&path).await?;
        records.push(record);
        Self::store(&path, &records).await?;

        tracing::debug!(client_id, count = records.len(), "transcript appended");
        Ok(())
    }

    /// Missing or unparseable documents read as empty.
    async fn load(path: &Path) -> Result<Vec<LogRecord>, TranscriptError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(records) => Ok(records),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "unparseable transcript, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    async fn store(path: &Path, records: &[LogRecord]) -> Result<(), TranscriptError> {
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn append(&self, client_id: &str, record: LogRecord) -> Result<(), TranscriptError> {
        let key = encode_client_id(client_id);
        let lock = self.lock_for(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(client_id, record).await
        };
        self.release_lock(&key, lock).await;
        result
    }

    async fn read(&self, client_id: &str) -> Result<Vec<LogRecord>, TranscriptError> {
        Self::load(&self.path_for(client_id)).await
    }

    async fn list_all(&self) -> Result<Vec<LogRecord>, TranscriptError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut all = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            all.extend(Self::load(&path).await?);
        }
        Ok(all)
    }
}

/// Keeps transcripts in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscriptStore {
    inner: Arc<RwLock<HashMap<String, Vec<LogRecord>>>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients with at least one record.
    pub async fn client_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn append(&self, client_id: &str, record: LogRecord) -> Result<(), TranscriptError> {
        let mut guard = self.inner.write().await;
        guard.entry(client_id.to_string()).or_default().push(record);
        Ok(())
    }

    async fn read(&self, client_id: &str) -> Result<Vec<LogRecord>, TranscriptError> {
        let guard = self.inner.read().await;
        Ok(guard.get(client_id).cloned().unwrap_or_default())
    }

    async fn list_all(&self) -> Result<Vec<LogRecord>, TranscriptError> {
        let guard = self.inner.read().await;
        Ok(guard.values().flatten().cloned().collect())
    }
}
