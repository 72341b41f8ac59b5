use web_sys::Storage;

use crate::error::FeedError;
use crate::storage::KeyValueStore;

/// `window.localStorage` behind the key-value seam
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    pub fn open() -> Result<Self, FeedError> {
        let window = web_sys::window().ok_or_else(|| FeedError::Storage("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| FeedError::Storage(FeedError::dom(&e).to_string()))?
            .ok_or_else(|| FeedError::Storage("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), FeedError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| FeedError::Storage(format!("{}: {}", key, FeedError::dom(&e))))
    }

    fn remove(&mut self, key: &str) -> Result<(), FeedError> {
        self.storage
            .remove_item(key)
            .map_err(|e| FeedError::Storage(format!("{}: {}", key, FeedError::dom(&e))))
    }
}
