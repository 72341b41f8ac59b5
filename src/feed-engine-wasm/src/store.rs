use crate::error::FeedError;
use crate::types::{ContentDocument, ContentItem};

/// Catalog loaded once from the static content document
///
/// Read-only after the first successful population.
#[derive(Debug, Default)]
pub struct ContentStore {
    items: Vec<ContentItem>,
    exported: Option<String>,
    loaded: bool,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and install a content document. No-op once populated.
    ///
    /// Returns the number of items in the store.
    pub fn populate_from_json(&mut self, json: &str) -> Result<usize, FeedError> {
        if self.loaded {
            return Ok(self.items.len());
        }

        let document: ContentDocument = serde_json::from_str(json)?;
        if document.total_items != 0 && document.total_items != document.items.len() {
            log::warn!(
                "Content document declares {} items but carries {}",
                document.total_items,
                document.items.len()
            );
        }

        self.exported = Some(document.exported).filter(|e| !e.is_empty());
        Ok(self.populate(document.items))
    }

    /// Install items directly. No-op once populated.
    pub fn populate(&mut self, items: Vec<ContentItem>) -> usize {
        if !self.loaded {
            self.items = items;
            self.loaded = !self.items.is_empty();
            log::info!(
                "Content store loaded: {} items, {} playable",
                self.items.len(),
                self.playable().count()
            );
        }
        self.items.len()
    }

    /// An empty store means "not yet available"
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn exported(&self) -> Option<&str> {
        self.exported.as_deref()
    }

    /// Items that may enter the feed
    pub fn playable(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(|item| item.is_playable())
    }

    /// Exact title lookup, ignoring case
    pub fn find_by_title(&self, title: &str) -> Option<&ContentItem> {
        let needle = title.trim().to_lowercase();
        self.items
            .iter()
            .find(|item| item.title.trim().to_lowercase() == needle)
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.exported = None;
        self.loaded = false;
    }
}

/// Content document URL with a cache-busting query parameter
pub fn cache_busted_url(base: &str, now_ms: f64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}v={}", base, separator, now_ms as u64)
}
