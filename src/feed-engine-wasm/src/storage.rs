use ahash::AHashMap;

use crate::error::FeedError;

pub const QUEUE_KEY: &str = "movieshows-queue";
pub const MUTED_KEY: &str = "movieshows-muted";
pub const PLAYER_SIZE_KEY: &str = "movieshows-player-size";
pub const TEXT_LAYOUT_KEY: &str = "movieshows-text-layout";

/// Durable origin-scoped key-value storage (localStorage in the browser)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), FeedError>;
    fn remove(&mut self, key: &str) -> Result<(), FeedError>;
}

/// In-memory store for tests and non-browser hosts
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: AHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), FeedError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), FeedError> {
        self.entries.remove(key);
        Ok(())
    }
}
