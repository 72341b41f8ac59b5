use ahash::AHashSet;

use crate::slide::{create_slide, SlideModel};
use crate::store::ContentStore;
use crate::types::{ContentItem, EmbedSlot};

/// One rendered slide in the live feed
#[derive(Debug, Clone)]
pub struct FeedSlide {
    pub id: String,
    pub title: String,
    pub video_id: String,
    pub item: ContentItem,
    pub(crate) embed: EmbedSlot,
    /// Last source handed to the iframe, kept for in-place mute rewrites
    pub(crate) src: Option<String>,
}

impl FeedSlide {
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.embed == EmbedSlot::Loaded
    }
}

/// The live, append-only sequence of playable slides
#[derive(Debug, Default)]
pub struct Feed {
    slides: Vec<FeedSlide>,
    next_id: u64,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slides(&self) -> &[FeedSlide] {
        &self.slides
    }

    pub fn get(&self, index: usize) -> Option<&FeedSlide> {
        self.slides.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut FeedSlide> {
        self.slides.get_mut(index)
    }

    pub fn position_of_id(&self, slide_id: &str) -> Option<usize> {
        self.slides.iter().position(|slide| slide.id == slide_id)
    }

    /// Exact title match ignoring case; the first rendered copy wins
    pub fn position_of_title(&self, title: &str) -> Option<usize> {
        let needle = title.trim().to_lowercase();
        self.slides
            .iter()
            .position(|slide| slide.title.trim().to_lowercase() == needle)
    }

    /// Titles of the last `window` rendered slides
    pub fn recent_titles(&self, window: usize) -> AHashSet<&str> {
        self.slides
            .iter()
            .rev()
            .take(window)
            .map(|slide| slide.title.as_str())
            .collect()
    }

    /// Append a slide for `item`. Unplayable items are refused.
    pub fn push(
        &mut self,
        item: &ContentItem,
        load_immediately: bool,
        muted: bool,
    ) -> Option<SlideModel> {
        let id = format!("slide-{}", self.next_id);
        let model = create_slide(&id, item, load_immediately, muted)?;
        self.next_id += 1;

        self.slides.push(FeedSlide {
            id,
            title: item.title.clone(),
            video_id: model.video_id.clone(),
            item: item.clone(),
            embed: if load_immediately {
                EmbedSlot::Loaded
            } else {
                EmbedSlot::Deferred
            },
            src: model.src.clone(),
        });

        Some(model)
    }

    /// Drop every slide, returning their ids
    pub fn clear(&mut self) -> Vec<String> {
        self.slides.drain(..).map(|slide| slide.id).collect()
    }
}

/// Pick up to `count` playable items whose titles are not among the last
/// `window` rendered slides, in random order
pub fn unseen_candidates(
    feed: &Feed,
    store: &ContentStore,
    count: usize,
    window: usize,
    rng: &mut fastrand::Rng,
) -> Vec<ContentItem> {
    let recent = feed.recent_titles(window);
    let mut candidates: Vec<&ContentItem> = store
        .playable()
        .filter(|item| !recent.contains(item.title.as_str()))
        .collect();

    rng.shuffle(&mut candidates);
    candidates.into_iter().take(count).cloned().collect()
}

/// Pick up to `count` items for the next feed batch.
///
/// Prefers unseen items. When nothing unseen is left the whole playable
/// catalog is shuffled and recycled, duplicates allowed.
pub fn select_candidates(
    feed: &Feed,
    store: &ContentStore,
    count: usize,
    window: usize,
    rng: &mut fastrand::Rng,
) -> Vec<ContentItem> {
    let picked = unseen_candidates(feed, store, count, window, rng);
    if !picked.is_empty() {
        return picked;
    }

    log::debug!("No unseen candidates left, recycling the catalog");
    let mut candidates: Vec<&ContentItem> = store.playable().collect();
    rng.shuffle(&mut candidates);
    candidates.into_iter().take(count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playable(title: &str) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            trailer_url: Some(format!("https://www.youtube.com/watch?v=vid{}", title.len())),
            ..Default::default()
        }
    }

    fn store_of(titles: &[&str]) -> ContentStore {
        let mut store = ContentStore::new();
        store.populate(titles.iter().map(|t| playable(t)).collect());
        store
    }

    #[test]
    fn test_push_assigns_ids_and_slots() {
        let mut feed = Feed::new();
        let first = feed.push(&playable("A"), true, true).unwrap();
        let second = feed.push(&playable("B"), false, true).unwrap();

        assert_eq!(first.id, "slide-0");
        assert_eq!(second.id, "slide-1");
        assert!(feed.get(0).unwrap().is_loaded());
        assert_eq!(feed.get(1).unwrap().embed, EmbedSlot::Deferred);
    }

    #[test]
    fn test_push_refuses_unplayable() {
        let mut feed = Feed::new();
        let item = ContentItem {
            title: "Nope".to_string(),
            ..Default::default()
        };
        assert!(feed.push(&item, false, true).is_none());
        assert!(feed.is_empty());
    }

    #[test]
    fn test_position_of_title_is_case_insensitive() {
        let mut feed = Feed::new();
        feed.push(&playable("The Matrix"), false, true);
        assert_eq!(feed.position_of_title("the matrix"), Some(0));
        assert_eq!(feed.position_of_title("Matrix"), None);
    }

    #[test]
    fn test_select_candidates_skips_recent() {
        let titles: Vec<String> = (0..20).map(|i| format!("T{:02}", i)).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let store = store_of(&refs);

        let mut feed = Feed::new();
        for title in &refs[..10] {
            feed.push(&playable(title), false, true);
        }

        let mut rng = fastrand::Rng::with_seed(7);
        let picked = select_candidates(&feed, &store, 3, 15, &mut rng);

        assert_eq!(picked.len(), 3);
        let recent = feed.recent_titles(15);
        assert!(picked.iter().all(|item| !recent.contains(item.title.as_str())));
    }

    #[test]
    fn test_select_candidates_recycles_when_exhausted() {
        let store = store_of(&["A", "B"]);
        let mut feed = Feed::new();
        feed.push(&playable("A"), false, true);
        feed.push(&playable("B"), false, true);

        let mut rng = fastrand::Rng::with_seed(1);
        let picked = select_candidates(&feed, &store, 3, 15, &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_unseen_candidates_never_recycle() {
        let store = store_of(&["A", "B"]);
        let mut feed = Feed::new();
        feed.push(&playable("A"), false, true);

        let mut rng = fastrand::Rng::with_seed(3);
        let picked = unseen_candidates(&feed, &store, 3, usize::MAX, &mut rng);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].title, "B");

        feed.push(&playable("B"), false, true);
        assert!(unseen_candidates(&feed, &store, 3, usize::MAX, &mut rng).is_empty());
    }

    #[test]
    fn test_select_candidates_empty_store() {
        let store = ContentStore::new();
        let feed = Feed::new();
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(select_candidates(&feed, &store, 3, 15, &mut rng).is_empty());
    }
}
