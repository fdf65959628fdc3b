//! Read-through / write-through persistence of one widget's config set.

use super::{cache_key, CacheError, LayoutFields, LocalCache, RemoteError, RemoteStore};
use crate::breakpoint::Breakpoint;
use crate::config::{ConfigSet, WidgetConfig};
use crate::defaults::SmartDefaults;
use crate::identity::WidgetId;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result of a remote load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Remote records merged over the defaults.
    Found(ConfigSet),
    /// Nothing usable remotely, or the store could not be reached.
    NotFound,
}

impl LoadOutcome {
    pub fn into_option(self) -> Option<ConfigSet> {
        match self {
            LoadOutcome::Found(set) => Some(set),
            LoadOutcome::NotFound => None,
        }
    }
}

/// Errors surfaced by explicit saves and resets.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(RemoteError),
    #[error("Remote store rejected the write (HTTP {status}): {body}")]
    RemoteRejected { status: u16, body: String },
    #[error("Local cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<RemoteError> for PersistError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Status { status, body } => PersistError::RemoteRejected { status, body },
            other => PersistError::RemoteUnavailable(other),
        }
    }
}

/// Combines a remote store and a local cache for widget config sets.
///
/// The upsert in [`save`](Self::save) is check-then-act: two saves racing on
/// the same `(identity, breakpoint)` may both create, leaving duplicate remote
/// records. Loads then apply duplicates in store order, so the last one wins.
pub struct PersistenceGateway<R, C> {
    remote: Arc<R>,
    cache: Arc<C>,
    defaults: SmartDefaults,
    key_prefix: String,
}

impl<R: RemoteStore, C: LocalCache> PersistenceGateway<R, C> {
    pub fn new(remote: Arc<R>, cache: Arc<C>, defaults: SmartDefaults, key_prefix: impl Into<String>) -> Self {
        Self {
            remote,
            cache,
            defaults,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn defaults(&self) -> &SmartDefaults {
        &self.defaults
    }

    /// Load remote records merged over the smart defaults of `identity`.
    pub async fn load(&self, identity: &WidgetId) -> LoadOutcome {
        let defaults = self.defaults.resolve(identity, None);
        self.load_with_defaults(identity, &defaults).await
    }

    /// Load remote records merged over `defaults`.
    ///
    /// On success the merged set is also written to the local cache. Remote
    /// failures are logged and reported as [`LoadOutcome::NotFound`].
    pub async fn load_with_defaults(&self, identity: &WidgetId, defaults: &ConfigSet) -> LoadOutcome {
        let outcome = self.fetch_with_defaults(identity, defaults).await;
        if let LoadOutcome::Found(merged) = &outcome {
            if let Err(e) = self.cache_write(identity, merged) {
                log::warn!("Failed to cache remote layout of {identity}: {e}");
            }
        }
        outcome
    }

    /// Like [`load_with_defaults`](Self::load_with_defaults), leaving the cache untouched.
    pub async fn fetch_with_defaults(&self, identity: &WidgetId, defaults: &ConfigSet) -> LoadOutcome {
        let records = match self.remote.query(identity.as_str(), None).await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Remote load of {identity} failed: {e}");
                return LoadOutcome::NotFound;
            }
        };

        let entries: Vec<(Breakpoint, WidgetConfig)> = records
            .iter()
            .filter_map(|record| match record.fields.internal_breakpoint() {
                Some(bp) => Some((bp, record.fields.to_config())),
                None => {
                    log::warn!(
                        "Ignoring record {} of {identity}: unknown breakpoint {:?}",
                        record.document_id,
                        record.fields.breakpoint
                    );
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            log::debug!("No remote layout for {identity}");
            return LoadOutcome::NotFound;
        }

        let mut merged = defaults.clone();
        merged.overlay(entries);
        LoadOutcome::Found(merged)
    }

    /// Upsert `config` for `(identity, breakpoint)` remotely, then update the cached set.
    pub async fn save(&self, identity: &WidgetId, breakpoint: Breakpoint, config: &WidgetConfig) -> Result<(), PersistError> {
        let fields = LayoutFields::new(identity, breakpoint, config);
        let existing = self
            .remote
            .query(identity.as_str(), Some(&fields.breakpoint))
            .await
            .map_err(|e| {
                log::warn!("Remote lookup of {identity}@{breakpoint} failed: {e}");
                PersistError::RemoteUnavailable(e)
            })?;

        let result = match existing.first() {
            Some(record) => {
                log::debug!("Updating {} for {identity}@{breakpoint}", record.document_id);
                self.remote.update(&record.document_id, &fields).await
            }
            None => {
                log::debug!("Creating record for {identity}@{breakpoint}");
                self.remote.create(&fields).await
            }
        };
        if let Err(e) = result {
            log::error!("Saving {identity}@{breakpoint} failed: {e}");
            return Err(e.into());
        }

        let mut set = self
            .cache_read(identity)
            .unwrap_or_else(|| self.defaults.resolve(identity, None));
        set.set(breakpoint, *config);
        if let Err(e) = self.cache_write(identity, &set) {
            log::warn!("Saved {identity} remotely but could not update the cache: {e}");
        }
        log::info!("Saved layout of {identity}@{breakpoint}");
        Ok(())
    }

    /// Cached set of `identity`. Missing and corrupt entries both read as `None`.
    pub fn cache_read(&self, identity: &WidgetId) -> Option<ConfigSet> {
        let raw = self.cache.read(&self.key(identity))?;
        match ConfigSet::from_json(&raw) {
            Ok(set) => Some(set),
            Err(e) => {
                log::warn!("Discarding corrupt cache entry of {identity}: {e}");
                None
            }
        }
    }

    pub fn cache_write(&self, identity: &WidgetId, configs: &ConfigSet) -> Result<(), CacheError> {
        let json = configs
            .to_json()
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.write(&self.key(identity), &json)
    }

    /// Delete every remote record of `identity` and drop its cache entry.
    pub async fn reset(&self, identity: &WidgetId) -> Result<(), PersistError> {
        let records = self
            .remote
            .query(identity.as_str(), None)
            .await
            .map_err(PersistError::RemoteUnavailable)?;
        for record in &records {
            self.remote.delete(&record.document_id).await?;
        }
        self.cache.remove(&self.key(identity))?;
        log::info!("Reset layout of {identity} ({} remote records)", records.len());
        Ok(())
    }

    /// Identities with a local cache entry.
    pub fn cached_identities(&self) -> Vec<WidgetId> {
        let mut ids: Vec<WidgetId> = self
            .cache
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.key_prefix).map(WidgetId::from))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Every readable cached set, keyed by identity. Corrupt entries are skipped.
    pub fn export_cached(&self) -> BTreeMap<WidgetId, ConfigSet> {
        self.cached_identities()
            .into_iter()
            .filter_map(|identity| self.cache_read(&identity).map(|set| (identity, set)))
            .collect()
    }

    /// [`export_cached`](Self::export_cached) as one JSON document.
    pub fn export_json(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(&self.export_cached())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Write every entry to the cache, replacing existing sets. Returns how many were written.
    pub fn import_cached(&self, layouts: &BTreeMap<WidgetId, ConfigSet>) -> Result<usize, CacheError> {
        for (identity, configs) in layouts {
            self.cache_write(identity, configs)?;
        }
        log::info!("Imported {} cached layouts", layouts.len());
        Ok(layouts.len())
    }

    /// Import a document produced by [`export_json`](Self::export_json).
    pub fn import_json(&self, json: &str) -> Result<usize, CacheError> {
        let layouts: BTreeMap<WidgetId, ConfigSet> =
            serde_json::from_str(json).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.import_cached(&layouts)
    }

    fn key(&self, identity: &WidgetId) -> String {
        cache_key(&self.key_prefix, identity)
    }
}
