use crate::error::FeedError;
use crate::storage::{KeyValueStore, QUEUE_KEY};
use crate::types::QueueEntry;

/// Outcome of adding to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyQueued,
}

/// User-curated watch list persisted under `movieshows-queue`
///
/// Every mutation is a read-modify-write of the whole list; the last writer
/// wins.
#[derive(Debug, Default, Clone)]
pub struct WatchQueue {
    entries: Vec<QueueEntry>,
}

impl WatchQueue {
    /// Load the persisted queue; a missing or corrupt value yields an empty queue
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let entries = match store.get(QUEUE_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable watch queue: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        Self { entries }
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.iter().any(|entry| entry.title == title)
    }

    /// Append unless an entry with the same title exists
    pub fn add(&mut self, entry: QueueEntry, store: &mut dyn KeyValueStore) -> Result<AddOutcome, FeedError> {
        if self.contains(&entry.title) {
            return Ok(AddOutcome::AlreadyQueued);
        }
        self.entries.push(entry);
        self.persist(store)?;
        Ok(AddOutcome::Added)
    }

    /// Remove by position, keeping the order of the rest
    pub fn remove(&mut self, index: usize, store: &mut dyn KeyValueStore) -> Result<Option<QueueEntry>, FeedError> {
        if index >= self.entries.len() {
            return Ok(None);
        }
        let removed = self.entries.remove(index);
        self.persist(store)?;
        Ok(Some(removed))
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) -> Result<(), FeedError> {
        self.entries.clear();
        self.persist(store)
    }

    fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), FeedError> {
        let json = serde_json::to_string(&self.entries)?;
        store.set(QUEUE_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn entry(title: &str) -> QueueEntry {
        QueueEntry {
            title: title.to_string(),
            year: "2024".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut store = MemoryStore::new();
        let mut queue = WatchQueue::load(&store);

        assert_eq!(queue.add(entry("A"), &mut store).unwrap(), AddOutcome::Added);
        assert_eq!(queue.add(entry("B"), &mut store).unwrap(), AddOutcome::Added);
        assert_eq!(queue.add(entry("A"), &mut store).unwrap(), AddOutcome::AlreadyQueued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut store = MemoryStore::new();
        let mut queue = WatchQueue::default();
        for title in ["A", "B", "C", "D"] {
            queue.add(entry(title), &mut store).unwrap();
        }

        let removed = queue.remove(1, &mut store).unwrap().unwrap();
        assert_eq!(removed.title, "B");

        let titles: Vec<&str> = queue.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C", "D"]);
        assert!(queue.remove(10, &mut store).unwrap().is_none());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_persisted_round_trip() {
        let mut store = MemoryStore::new();
        let mut queue = WatchQueue::default();
        queue.add(entry("A"), &mut store).unwrap();
        queue.add(entry("B"), &mut store).unwrap();

        let reloaded = WatchQueue::load(&store);
        assert_eq!(reloaded.entries(), queue.entries());

        queue.clear(&mut store).unwrap();
        assert!(WatchQueue::load(&store).is_empty());
        assert_eq!(store.get(QUEUE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_queue_is_discarded() {
        let store = MemoryStore::new().with_entry(QUEUE_KEY, "{broken");
        assert!(WatchQueue::load(&store).is_empty());
    }
}
