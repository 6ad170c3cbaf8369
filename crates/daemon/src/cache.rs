//! Persistent StatusKey → DisplayRecord cache.
//!
//! The whole mapping is one pretty-printed JSON object that is rewritten on
//! every mutation, so the file is always a complete, hand-editable snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use titlecast_core::DisplayRecord;
use titlecast_lookup_client::LookupClient;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct TitleCache {
    path: PathBuf,
    entries: BTreeMap<String, DisplayRecord>,
}

impl TitleCache {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Read the local document. `Ok(None)` when no document exists yet.
    pub fn read(path: &Path) -> Result<Option<Self>, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let raw: BTreeMap<String, DisplayRecord> = serde_json::from_str(&content)?;
        let entries = raw
            .into_iter()
            .map(|(key, record)| {
                let record = record.normalized(&key);
                (key, record)
            })
            .collect();
        Ok(Some(Self {
            path: path.to_path_buf(),
            entries,
        }))
    }

    /// Load the cache: local document, else the remote seed snapshot, else
    /// empty. Never fails.
    pub async fn load(path: PathBuf, seed: Option<&LookupClient>) -> Self {
        match Self::read(&path) {
            Ok(Some(cache)) => {
                info!(
                    "Loaded {} cached titles from {}",
                    cache.len(),
                    path.display()
                );
                return cache;
            }
            Ok(None) => info!("No title cache at {}", path.display()),
            Err(e) => {
                warn!("Failed to read title cache at {}: {}", path.display(), e);
                back_up_unreadable(&path);
            }
        }

        let mut cache = Self::empty(path);
        let Some(client) = seed else {
            return cache;
        };

        match client.fetch_seed().await {
            Ok(entries) => {
                info!("Seeded title cache with {} remote entries", entries.len());
                cache.entries = entries;
                if let Err(e) = cache.flush() {
                    warn!(
                        "Failed to write seeded title cache to {}: {}",
                        cache.path.display(),
                        e
                    );
                }
            }
            Err(e) => warn!("Failed to fetch title cache seed ({}), starting empty", e),
        }
        cache
    }

    pub fn get(&self, key: &str) -> Option<&DisplayRecord> {
        self.entries.get(key)
    }

    /// Insert or overwrite `key` and rewrite the document. The in-memory entry
    /// is kept even when the write fails.
    pub fn put(&mut self, key: &str, record: DisplayRecord) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), record);
        self.flush()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_vec_pretty(&self.entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(
            "Wrote {} titles to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Move an unreadable document aside so the next flush doesn't destroy it.
fn back_up_unreadable(path: &Path) {
    if !path.exists() {
        return;
    }
    let bak = path.with_extension("json.bak");
    match std::fs::rename(path, &bak) {
        Ok(()) => warn!("Moved unreadable title cache to {}", bak.display()),
        Err(e) => warn!("Could not move unreadable title cache aside: {}", e),
    }
}
