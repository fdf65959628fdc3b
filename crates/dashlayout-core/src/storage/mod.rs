//! Storage abstraction for layout persistence.
//!
//! Two tiers back every widget: a synchronous local cache (browser storage or
//! files) and an asynchronous remote store shared by every operator.
//! [`PersistenceGateway`] combines them.

mod gateway;
mod http;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod web;

pub use gateway::{LoadOutcome, PersistError, PersistenceGateway};
pub use http::HttpRemoteStore;
pub use memory::{MemoryCache, MemoryRemoteStore};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCache;

#[cfg(target_arch = "wasm32")]
pub use web::WebStorageCache;

use crate::breakpoint::Breakpoint;
use crate::config::WidgetConfig;
use crate::identity::WidgetId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Local cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for local cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Remote store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The store answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not match the record schema.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Synchronous string key-value store.
///
/// Implementations must tolerate any key; callers build keys with
/// [`cache_key`].
#[cfg(not(target_arch = "wasm32"))]
pub trait LocalCache: Send + Sync {
    /// Stored value, or `None` when absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one.
    fn write(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> CacheResult<()>;

    /// Every stored key.
    fn keys(&self) -> Vec<String>;
}

/// Synchronous string key-value store (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait LocalCache {
    /// Stored value, or `None` when absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one.
    fn write(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> CacheResult<()>;

    /// Every stored key.
    fn keys(&self) -> Vec<String>;
}

/// Remote layout store: one record per `(componentId, breakpoint)`.
///
/// Breakpoints travel as remote aliases (`xxl`, not `2xl`).
#[cfg(not(target_arch = "wasm32"))]
pub trait RemoteStore: Send + Sync {
    /// Records for a component, optionally restricted to one breakpoint alias.
    fn query(&self, component_id: &str, breakpoint: Option<&str>) -> BoxFuture<'_, RemoteResult<Vec<PersistedRecord>>>;

    /// Create a record.
    fn create(&self, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>>;

    /// Replace the fields of an existing record.
    fn update(&self, document_id: &str, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>>;

    /// Delete a record.
    fn delete(&self, document_id: &str) -> BoxFuture<'_, RemoteResult<()>>;
}

/// Remote layout store (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait RemoteStore {
    /// Records for a component, optionally restricted to one breakpoint alias.
    fn query(&self, component_id: &str, breakpoint: Option<&str>) -> BoxFuture<'_, RemoteResult<Vec<PersistedRecord>>>;

    /// Create a record.
    fn create(&self, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>>;

    /// Replace the fields of an existing record.
    fn update(&self, document_id: &str, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>>;

    /// Delete a record.
    fn delete(&self, document_id: &str) -> BoxFuture<'_, RemoteResult<()>>;
}

/// Field set of a remote layout record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutFields {
    pub component_id: String,
    /// Remote breakpoint alias.
    pub breakpoint: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "one")]
    pub scale: f64,
    #[serde(default = "one_i32")]
    pub z_index: i32,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub rotation: f64,
}

fn one() -> f64 {
    1.0
}

fn one_i32() -> i32 {
    1
}

impl LayoutFields {
    /// Fields for storing `config` under `identity` at `breakpoint`.
    pub fn new(identity: &WidgetId, breakpoint: Breakpoint, config: &WidgetConfig) -> Self {
        Self {
            component_id: identity.to_string(),
            breakpoint: breakpoint.remote_alias().to_string(),
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            scale: config.scale,
            z_index: config.z_index,
            opacity: config.opacity,
            rotation: config.rotation,
        }
    }

    /// Internal breakpoint, or `None` for names the engine does not know.
    pub fn internal_breakpoint(&self) -> Option<Breakpoint> {
        Breakpoint::from_remote_alias(&self.breakpoint)
    }

    /// Geometry carried by the record, sanitized.
    pub fn to_config(&self) -> WidgetConfig {
        WidgetConfig {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            scale: self.scale,
            z_index: self.z_index,
            opacity: self.opacity,
            rotation: self.rotation,
        }
        .sanitized()
    }
}

/// A record as stored remotely, with its opaque store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub document_id: String,
    #[serde(flatten)]
    pub fields: LayoutFields,
}

/// Local cache key of a widget.
pub fn cache_key(prefix: &str, identity: &WidgetId) -> String {
    format!("{prefix}{identity}")
}
