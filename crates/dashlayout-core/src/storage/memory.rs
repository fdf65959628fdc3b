//! In-memory storage implementations.

use super::{
    BoxFuture, CacheError, CacheResult, LayoutFields, LocalCache, PersistedRecord, RemoteError,
    RemoteResult, RemoteStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory local cache for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, key: &str) -> Option<String> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                log::warn!("Memory cache lock poisoned: {e}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Unavailable(format!("Lock error: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Unavailable(format!("Lock error: {}", e)))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// In-memory remote store.
///
/// Behaves like the HTTP store: ids are opaque strings, queries filter on
/// component and breakpoint alias. A failure can be injected to simulate an
/// unreachable or rejecting server.
#[derive(Default)]
pub struct MemoryRemoteStore {
    records: RwLock<Vec<PersistedRecord>>,
    next_id: AtomicU64,
    failure: RwLock<Option<RemoteError>>,
    queries: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryRemoteStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<RemoteError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    /// All stored records.
    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `query` calls so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `create`/`update`/`delete` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> RemoteResult<()> {
        match self.failure.read() {
            Ok(failure) => match failure.as_ref() {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            },
            Err(e) => Err(RemoteError::Transport(format!("Lock error: {}", e))),
        }
    }
}

fn lock_error(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport(format!("Lock error: {}", e))
}

impl RemoteStore for MemoryRemoteStore {
    fn query(&self, component_id: &str, breakpoint: Option<&str>) -> BoxFuture<'_, RemoteResult<Vec<PersistedRecord>>> {
        let component_id = component_id.to_string();
        let breakpoint = breakpoint.map(str::to_string);
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            let records = self.records.read().map_err(lock_error)?;
            Ok(records
                .iter()
                .filter(|r| r.fields.component_id == component_id)
                .filter(|r| breakpoint.as_deref().is_none_or(|bp| r.fields.breakpoint == bp))
                .cloned()
                .collect())
        })
    }

    fn create(&self, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        let fields = fields.clone();
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let record = PersistedRecord {
                document_id: format!("doc-{id}"),
                fields,
            };
            self.records.write().map_err(lock_error)?.push(record.clone());
            Ok(record)
        })
    }

    fn update(&self, document_id: &str, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        let document_id = document_id.to_string();
        let fields = fields.clone();
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            let mut records = self.records.write().map_err(lock_error)?;
            let record = records
                .iter_mut()
                .find(|r| r.document_id == document_id)
                .ok_or_else(|| RemoteError::Status {
                    status: 404,
                    body: format!("No record {document_id}"),
                })?;
            record.fields = fields;
            Ok(record.clone())
        })
    }

    fn delete(&self, document_id: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let document_id = document_id.to_string();
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            let mut records = self.records.write().map_err(lock_error)?;
            records.retain(|r| r.document_id != document_id);
            Ok(())
        })
    }
}
