//! Optional file-backed context persistence.
//!
//! When enabled, contexts are saved as JSON under
//! `<base_dir>/<session>/<context>.json`, with optional bounded snapshot
//! history under `<base_dir>/<session>/snapshots/`. Ids are re-validated at
//! this boundary; anything outside the core id alphabet (including `.` and
//! `/`) is rejected before touching the filesystem. Writes go through a
//! temp file and rename.

use crate::config::StorageSettings;
use rlm_protocol::{Result, RlmError};
use rlm_session::{validate_context_id, ContextMetadata, SnapshotSink};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: u64,
    pub saved_at: u64,
}

pub struct FileContextStore {
    settings: StorageSettings,
    snapshot_seq: std::sync::atomic::AtomicU64,
}

impl FileContextStore {
    pub fn new(settings: StorageSettings) -> Result<Self> {
        fs::create_dir_all(&settings.base_dir)
            .map_err(|err| RlmError::internal(format!("storage init failed: {err}")))?;
        Ok(Self {
            settings,
            snapshot_seq: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn snapshots_enabled(&self) -> bool {
        self.settings.snapshots
    }

    /// Session and context ids share the core id alphabet.
    fn validate_component(id: &str) -> Result<()> {
        validate_context_id(id)
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.settings.base_dir.join(session_id)
    }

    fn context_path(&self, session_id: &str, context_id: &str) -> PathBuf {
        self.session_dir(session_id).join(format!("{context_id}.json"))
    }

    fn chunk_meta_path(&self, session_id: &str, context_id: &str) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("{context_id}.chunks.json"))
    }

    fn write_atomic(path: &PathBuf, bytes: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| RlmError::internal("storage path has no parent"))?;
        fs::create_dir_all(parent)
            .map_err(|err| RlmError::internal(format!("storage mkdir failed: {err}")))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .map_err(|err| RlmError::internal(format!("storage write failed: {err}")))?;
        fs::rename(&tmp, path)
            .map_err(|err| RlmError::internal(format!("storage rename failed: {err}")))?;
        Ok(())
    }

    pub fn save(
        &self,
        session_id: &str,
        context_id: &str,
        content: &str,
        metadata: &ContextMetadata,
        created_at: SystemTime,
    ) -> Result<()> {
        Self::validate_component(session_id)?;
        Self::validate_component(context_id)?;
        let stored = StoredContext {
            content: content.to_string(),
            metadata: serde_json::to_value(metadata)
                .map_err(|err| RlmError::internal(err.to_string()))?,
            created_at: rlm_protocol::unix_ms(created_at),
            saved_at: rlm_protocol::unix_ms_now(),
        };
        let bytes =
            serde_json::to_vec(&stored).map_err(|err| RlmError::internal(err.to_string()))?;
        Self::write_atomic(&self.context_path(session_id, context_id), &bytes)
    }

    pub fn load(&self, session_id: &str, context_id: &str) -> Result<Option<StoredContext>> {
        Self::validate_component(session_id)?;
        Self::validate_component(context_id)?;
        let path = self.context_path(session_id, context_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(&path).map_err(|err| RlmError::internal(format!("storage read: {err}")))?;
        let stored: StoredContext = serde_json::from_slice(&bytes)
            .map_err(|err| RlmError::internal(format!("storage decode: {err}")))?;
        Ok(Some(stored))
    }

    pub fn delete_context(&self, session_id: &str, context_id: &str) -> Result<()> {
        Self::validate_component(session_id)?;
        Self::validate_component(context_id)?;
        let path = self.context_path(session_id, context_id);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|err| RlmError::internal(format!("storage delete: {err}")))?;
        }
        self.clear_chunk_metadata(session_id, context_id)
    }

    pub fn save_snapshot(
        &self,
        session_id: &str,
        context_id: &str,
        content: &str,
        metadata: &ContextMetadata,
        created_at: SystemTime,
    ) -> Result<()> {
        Self::validate_component(session_id)?;
        Self::validate_component(context_id)?;
        let stored = StoredContext {
            content: content.to_string(),
            metadata: serde_json::to_value(metadata)
                .map_err(|err| RlmError::internal(err.to_string()))?,
            created_at: rlm_protocol::unix_ms(created_at),
            saved_at: rlm_protocol::unix_ms_now(),
        };
        let bytes =
            serde_json::to_vec(&stored).map_err(|err| RlmError::internal(err.to_string()))?;
        let dir = self.session_dir(session_id).join("snapshots");
        // Sequence suffix keeps same-millisecond snapshots distinct and in
        // mutation order.
        let seq = self
            .snapshot_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let name = format!("{context_id}-{}-{seq:06}.json", stored.saved_at);
        Self::write_atomic(&dir.join(name), &bytes)?;
        self.prune_snapshots(&dir, context_id)
    }

    fn prune_snapshots(&self, dir: &PathBuf, context_id: &str) -> Result<()> {
        let prefix = format!("{context_id}-");
        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(read) => read
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(&prefix))
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => return Ok(()),
        };
        entries.sort();
        while entries.len() > self.settings.max_snapshots {
            let oldest = entries.remove(0);
            if let Err(err) = fs::remove_file(&oldest) {
                log::debug!("snapshot prune failed for {}: {err}", oldest.display());
            }
        }
        Ok(())
    }

    /// Remove any persisted chunk metadata sidecar for a context.
    pub fn clear_chunk_metadata(&self, session_id: &str, context_id: &str) -> Result<()> {
        Self::validate_component(session_id)?;
        Self::validate_component(context_id)?;
        let path = self.chunk_meta_path(session_id, context_id);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|err| RlmError::internal(format!("storage delete: {err}")))?;
        }
        Ok(())
    }
}

impl SnapshotSink for FileContextStore {
    /// Pre-mutation hook from the registry: best-effort, never blocks the
    /// mutation on storage failure.
    fn snapshot(
        &self,
        session_id: &str,
        context_id: &str,
        content: &str,
        metadata: &ContextMetadata,
        created_at: SystemTime,
    ) {
        if !self.settings.snapshots {
            return;
        }
        if let Err(err) = self.save_snapshot(session_id, context_id, content, metadata, created_at)
        {
            log::warn!("snapshot of {session_id}/{context_id} failed: {err}");
        }
    }
}
