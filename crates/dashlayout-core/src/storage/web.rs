//! `window.localStorage` cache for WebAssembly.

use super::{CacheError, CacheResult, LocalCache};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// Local cache backed by the browser's `localStorage`.
///
/// Note: not Send/Sync, WASM is single-threaded. The storage handle is looked up
/// on every call so a page that blocks storage degrades to cache misses.
#[derive(Default)]
pub struct WebStorageCache;

impl WebStorageCache {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> CacheResult<Storage> {
        let window = web_sys::window()
            .ok_or_else(|| CacheError::Unavailable("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| CacheError::Unavailable(js_error(&e)))?
            .ok_or_else(|| CacheError::Unavailable("localStorage not available".to_string()))
    }
}

fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl LocalCache for WebStorageCache {
    fn read(&self, key: &str) -> Option<String> {
        let storage = match Self::storage() {
            Ok(storage) => storage,
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };
        storage.get_item(key).ok().flatten()
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| CacheError::Io(format!("Failed to write {key}: {}", js_error(&e))))
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| CacheError::Io(format!("Failed to delete {key}: {}", js_error(&e))))
    }

    fn keys(&self) -> Vec<String> {
        let Ok(storage) = Self::storage() else {
            return vec![];
        };
        let len = storage.length().unwrap_or(0);
        (0..len)
            .filter_map(|i| storage.key(i).ok().flatten())
            .collect()
    }
}
