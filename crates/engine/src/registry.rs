//! Game registry — owns every channel's [`GameState`] and its snapshot.
//!
//! Each channel's state lives behind its own async mutex, so work in one
//! channel never waits on another. The registry also keeps the serialized
//! form of every channel; committing a state refreshes that channel's
//! record and rewrites the whole snapshot file, one writer at a time, via a
//! temporary file and a rename.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use giftbot_core::channel::ChannelId;
use giftbot_core::error::StorageError;
use giftbot_core::game::{GameSettings, GameState};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::snapshot::{self, GameRecord};

/// Shared handle to one channel's state. Holding the lock is the
/// per-channel critical section.
pub type GameHandle = Arc<tokio::sync::Mutex<GameState>>;

pub struct GameRegistry {
    path: PathBuf,
    defaults: GameSettings,
    games: RwLock<HashMap<ChannelId, GameHandle>>,
    /// Serialized view of every channel; its lock also serializes writers.
    records: Mutex<BTreeMap<String, GameRecord>>,
    durable: AtomicBool,
}

impl GameRegistry {
    /// An empty registry that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>, defaults: GameSettings) -> Self {
        Self {
            path: path.into(),
            defaults,
            games: RwLock::new(HashMap::new()),
            records: Mutex::new(BTreeMap::new()),
            durable: AtomicBool::new(true),
        }
    }

    /// Restore from the snapshot at `path`.
    ///
    /// A missing file is a fresh start. Unreadable entries are skipped; a
    /// document that is not a channel map at all is an error.
    pub fn restore(path: impl Into<PathBuf>, defaults: GameSettings) -> Result<Self, StorageError> {
        let path = path.into();
        let states = match load_snapshot(&path)? {
            Some(states) => {
                info!(count = states.len(), path = %path.display(), "Loaded game states");
                states
            }
            None => {
                info!(path = %path.display(), "No existing state file found, starting fresh");
                Vec::new()
            }
        };

        let mut games = HashMap::with_capacity(states.len());
        let mut records = BTreeMap::new();
        for state in states {
            records.insert(state.channel_id.0.clone(), GameRecord::from(&state));
            games.insert(
                state.channel_id.clone(),
                Arc::new(tokio::sync::Mutex::new(state)),
            );
        }

        Ok(Self {
            path,
            defaults,
            games: RwLock::new(games),
            records: Mutex::new(records),
            durable: AtomicBool::new(true),
        })
    }

    /// Snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings given to newly created channels.
    pub fn defaults(&self) -> GameSettings {
        self.defaults
    }

    /// The state for `channel`, if one exists.
    pub async fn get(&self, channel: &ChannelId) -> Option<GameHandle> {
        self.games.read().await.get(channel).cloned()
    }

    /// The state for `channel`, creating (and persisting) a default one on
    /// first reference.
    pub async fn get_or_create(&self, channel: &ChannelId) -> GameHandle {
        if let Some(handle) = self.get(channel).await {
            return handle;
        }

        let mut games = self.games.write().await;
        if let Some(handle) = games.get(channel) {
            return handle.clone();
        }

        let state = GameState::new(channel.clone(), self.defaults);
        debug!(channel = %channel, "Creating game state");
        self.lock_records()
            .insert(channel.0.clone(), GameRecord::from(&state));
        let handle = Arc::new(tokio::sync::Mutex::new(state));
        games.insert(channel.clone(), handle.clone());
        drop(games);

        self.persist_logged();
        handle
    }

    /// All registered channel ids.
    pub async fn channel_ids(&self) -> Vec<ChannelId> {
        self.games.read().await.keys().cloned().collect()
    }

    /// Number of registered channels.
    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    /// Whether no channel is registered.
    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }

    /// Record `state` as the channel's authoritative form and persist.
    ///
    /// Call while holding the channel's lock. A failed write is logged; the
    /// in-memory state stays authoritative.
    pub fn commit(&self, state: &GameState) {
        self.lock_records()
            .insert(state.channel_id.0.clone(), GameRecord::from(state));
        self.persist_logged();
    }

    /// Write every channel's record to the snapshot file.
    pub fn persist(&self) -> Result<(), StorageError> {
        let records = self.lock_records();
        let bytes = snapshot::encode(&records)?;
        let result = write_atomically(&self.path, &bytes);
        self.durable.store(result.is_ok(), Ordering::SeqCst);
        result
    }

    /// Whether the last snapshot write succeeded.
    pub fn is_durable(&self) -> bool {
        self.durable.load(Ordering::SeqCst)
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            error!(
                path = %self.path.display(),
                error = %e,
                "Failed to save game state; durability compromised until the next successful write"
            );
        }
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, GameRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read and decode the snapshot at `path`. `Ok(None)` when absent.
pub fn load_snapshot(path: &Path) -> Result<Option<Vec<GameState>>, StorageError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    snapshot::decode(&raw, Utc::now())
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write to a sibling temp file, sync it, then rename over `path`, so
/// readers see either the old or the new snapshot, never a partial one.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let io_err = |source: std::io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    #[cfg(unix)]
    if let Err(e) = std::fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        debug!(path = %parent.display(), "Parent directory sync failed (best-effort): {e}");
    }
    Ok(())
}
