use titlecast_core::{classify, DisplayRecord, StatusKind};
use titlecast_lookup_client::TitleLookup;
use tracing::{debug, info, warn};

use crate::cache::TitleCache;

/// Turns status keys into display records: idle short-circuit, cache, then
/// the lookup strategy chosen by [`classify`]. Never fails.
///
/// Unrecognized keys and failed lookups produce a placeholder that is not
/// cached, so the next occurrence of the key tries again.
pub struct TitleResolver<L> {
    lookup: L,
    cache: TitleCache,
}

impl<L: TitleLookup> TitleResolver<L> {
    pub fn new(lookup: L, cache: TitleCache) -> Self {
        Self { lookup, cache }
    }

    pub fn cache(&self) -> &TitleCache {
        &self.cache
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub async fn resolve(&mut self, key: &str) -> DisplayRecord {
        let kind = classify(key);
        if kind == StatusKind::Idle {
            return DisplayRecord::idle();
        }

        if let Some(record) = self.cache.get(key) {
            debug!("Title cache hit for {}", key);
            return record.clone();
        }

        if !kind.is_lookup() {
            debug!("Unrecognized status key {:?}, displaying it verbatim", key);
            return DisplayRecord::placeholder(key);
        }

        match self.lookup.lookup(kind, key).await {
            Ok(record) => {
                let record = record.normalized(key);
                info!("Resolved {} ({}) as {:?}", key, kind, record.name);
                if let Err(e) = self.cache.put(key, record.clone()) {
                    warn!(
                        "Failed to persist title cache to {}: {}",
                        self.cache.path().display(),
                        e
                    );
                }
                record
            }
            Err(e) => {
                warn!("Lookup for {} ({}) failed: {}", key, kind, e);
                DisplayRecord::placeholder(key)
            }
        }
    }
}
