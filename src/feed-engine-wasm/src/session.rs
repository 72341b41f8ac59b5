use serde::Serialize;

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::feed::{select_candidates, unseen_candidates, Feed};
use crate::ops::OperationBatcher;
use crate::panels::PanelSet;
use crate::playback::{parse_player_message, PlaybackController, PlayerEvent, PlayerState};
use crate::queue::{AddOutcome, WatchQueue};
use crate::scroll::{classify_key, KeyAction, ScrollController, ScrollIntent};
use crate::search::{SearchEngine, SearchResult};
use crate::settings::Settings;
use crate::slide::SlideAction;
use crate::storage::KeyValueStore;
use crate::store::ContentStore;
use crate::throttle::{ClickGuard, RateLimit};
use crate::types::{
    CategoryFilter, ContentItem, FeedOperation, Panel, PlayerSize, QueueEntry, TextLayout, Viewport,
};

/// Result of routing one input event
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InputOutcome {
    /// The event belongs to the feed; the caller should prevent the default
    pub handled: bool,
    pub operations: Vec<FeedOperation>,
}

impl InputOutcome {
    fn ignored() -> Self {
        Self::default()
    }

    fn handled(batch: OperationBatcher) -> Self {
        Self {
            handled: true,
            operations: batch.into_ordered(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_items: usize,
    pub playable_items: usize,
    pub slides: usize,
    pub current_index: usize,
    pub loaded_embeds: usize,
    pub deferred_embeds: usize,
    pub unloaded_embeds: usize,
    pub queue_len: usize,
}

/// State of the single active feed session
///
/// Owns the catalog, live feed, scroll index, playback, panels, queue and
/// settings. Every entry point returns the DOM operations to apply, in order.
pub struct FeedSession {
    config: FeedConfig,
    store: ContentStore,
    feed: Feed,
    scroll: ScrollController,
    playback: PlaybackController,
    panels: PanelSet,
    search: SearchEngine,
    queue: WatchQueue,
    settings: Settings,
    filter: CategoryFilter,
    last_query: String,
    storage: Box<dyn KeyValueStore>,
    rng: fastrand::Rng,
    replenish_limit: RateLimit,
    click_guard: ClickGuard,
    viewport: Viewport,
}

impl FeedSession {
    pub fn new(config: FeedConfig, storage: Box<dyn KeyValueStore>, seed: u64) -> Self {
        let settings = Settings::load(storage.as_ref());
        let queue = WatchQueue::load(storage.as_ref());

        Self {
            scroll: ScrollController::new(&config),
            playback: PlaybackController::new(
                config.visibility_threshold,
                config.auto_next,
                config.force_initial_mute,
            ),
            search: SearchEngine::new(config.search_result_cap),
            replenish_limit: RateLimit::new(config.replenish_interval_ms),
            click_guard: ClickGuard::new(config.click_guard_ms),
            store: ContentStore::new(),
            feed: Feed::new(),
            panels: PanelSet::new(),
            queue,
            settings,
            filter: CategoryFilter::All,
            last_query: String::new(),
            storage,
            rng: fastrand::Rng::with_seed(seed),
            viewport: Viewport::default(),
            config,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn queue(&self) -> &WatchQueue {
        &self.queue
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn active_panel(&self) -> Option<Panel> {
        self.panels.open_panel()
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.scroll.current_index()
    }

    pub fn current_slide_id(&self) -> Option<&str> {
        self.feed.get(self.current_index()).map(|slide| slide.id.as_str())
    }

    #[inline]
    pub fn is_scrolling(&self, now_ms: f64) -> bool {
        self.scroll.is_scrolling(now_ms)
    }

    /// Operations that bring freshly injected controls in line with the
    /// persisted settings and queue
    pub fn initial_operations(&self) -> Vec<FeedOperation> {
        let mut batch = OperationBatcher::new();
        batch.push(FeedOperation::ApplyMute {
            muted: self.settings.muted,
        });
        batch.push(FeedOperation::ApplyPlayerSize {
            size: self.settings.player_size,
        });
        batch.push(FeedOperation::ApplyTextLayout {
            layout: self.settings.text_layout,
        });
        batch.push(self.render_queue());
        batch.into_ordered()
    }

    // ---- content ---------------------------------------------------------

    /// Install the content document and fill the feed
    pub fn load_content(&mut self, json: &str) -> Result<Vec<FeedOperation>, FeedError> {
        self.store.populate_from_json(json)?;
        Ok(self.bootstrap())
    }

    /// Install items directly and fill the feed
    pub fn load_items(&mut self, items: Vec<ContentItem>) -> Vec<FeedOperation> {
        self.store.populate(items);
        self.bootstrap()
    }

    /// Back-fill the feed to the minimum length with distinct playable items.
    /// The first slide loads immediately, the rest stay deferred.
    pub fn bootstrap(&mut self) -> Vec<FeedOperation> {
        let mut batch = OperationBatcher::new();
        if !self.store.is_loaded() {
            log::debug!("Bootstrap skipped, content store not loaded yet");
            return Vec::new();
        }

        while self.feed.len() < self.config.min_feed_len {
            let needed = self.config.min_feed_len - self.feed.len();
            let picks = unseen_candidates(&self.feed, &self.store, needed, usize::MAX, &mut self.rng);
            let mut appended = 0;
            for item in &picks {
                let load_immediately = self.feed.is_empty();
                if self.append_item(item, load_immediately, &mut batch) {
                    appended += 1;
                }
            }
            if appended == 0 {
                break;
            }
        }

        log::info!(
            "Feed bootstrapped with {} slides from catalog exported {}",
            self.feed.len(),
            self.store.exported().unwrap_or("at an unknown time")
        );
        batch.into_ordered()
    }

    fn append_item(&mut self, item: &ContentItem, load_immediately: bool, batch: &mut OperationBatcher) -> bool {
        let muted = self.playback.effective_mute(self.settings.muted);
        match self.feed.push(item, load_immediately, muted) {
            Some(slide) => {
                batch.push(FeedOperation::AppendSlide { slide });
                true
            }
            None => {
                log::debug!("Skipping unplayable item {:?}", item.title);
                false
            }
        }
    }

    /// Append a batch of unseen items when the viewport nears the end
    fn replenish(&mut self, viewport: Viewport, now_ms: f64, batch: &mut OperationBatcher) -> usize {
        if !self.store.is_loaded() || viewport.viewport_height <= 0.0 {
            return 0;
        }
        let threshold = self.config.replenish_viewports * viewport.viewport_height;
        if viewport.distance_to_end(self.feed.len()) > threshold {
            return 0;
        }
        if !self.replenish_limit.try_acquire(now_ms) {
            return 0;
        }

        let picks = select_candidates(
            &self.feed,
            &self.store,
            self.config.replenish_batch,
            self.config.recent_window,
            &mut self.rng,
        );
        let mut appended = 0;
        for item in &picks {
            if self.append_item(item, false, batch) {
                appended += 1;
            }
        }
        log::debug!("Infinite scroll appended {} slides", appended);
        appended
    }

    // ---- scrolling -------------------------------------------------------

    pub fn set_viewport(&mut self, scroll_top: f64, viewport_height: f64) {
        self.viewport = Viewport {
            scroll_top,
            viewport_height,
        };
    }

    /// Scroll position report from the container
    pub fn on_viewport(&mut self, scroll_top: f64, viewport_height: f64, now_ms: f64) -> Vec<FeedOperation> {
        self.set_viewport(scroll_top, viewport_height);
        let mut batch = OperationBatcher::new();
        self.replenish(self.viewport, now_ms, &mut batch);
        batch.into_ordered()
    }

    /// The container stopped scrolling; resync the index from the real position
    pub fn on_scroll_settled(&mut self, scroll_top: f64, viewport_height: f64, now_ms: f64) -> Vec<FeedOperation> {
        self.set_viewport(scroll_top, viewport_height);
        let visible = self.viewport.nearest_index(self.feed.len());
        let resynced = self.scroll.on_scroll_settled(visible, self.feed.len(), now_ms);

        let mut batch = OperationBatcher::new();
        self.replenish(self.viewport, now_ms, &mut batch);
        if let Some(index) = resynced {
            if let Some(op) = self.playback.load(&mut self.feed, index, self.settings.muted) {
                batch.push(op);
            }
        }
        batch.into_ordered()
    }

    pub fn handle_wheel(&mut self, delta_y: f64, in_ignore_zone: bool, now_ms: f64) -> InputOutcome {
        if in_ignore_zone || self.feed.is_empty() {
            return InputOutcome::ignored();
        }
        let mut batch = OperationBatcher::new();
        if let Some(intent) = self.scroll.wheel_intent(delta_y) {
            self.step(intent, now_ms, &mut batch);
        }
        InputOutcome::handled(batch)
    }

    pub fn handle_key(&mut self, key: &str, in_ignore_zone: bool, now_ms: f64) -> InputOutcome {
        if in_ignore_zone {
            return InputOutcome::ignored();
        }
        let mut batch = OperationBatcher::new();
        match classify_key(key) {
            KeyAction::Scroll(_) if self.feed.is_empty() => return InputOutcome::ignored(),
            KeyAction::Scroll(intent) => {
                self.playback.release_forced_mute();
                self.step(intent, now_ms, &mut batch);
            }
            KeyAction::PlayerSize(size) => batch.extend(self.set_player_size(size)),
            KeyAction::None => return InputOutcome::ignored(),
        }
        InputOutcome::handled(batch)
    }

    pub fn touch_start(&mut self, client_y: f64, now_ms: f64) {
        self.scroll.touch_start(client_y, now_ms);
    }

    pub fn touch_end(&mut self, client_y: f64, in_ignore_zone: bool, now_ms: f64) -> InputOutcome {
        let intent = self.scroll.touch_end(client_y, now_ms);
        if in_ignore_zone || self.feed.is_empty() {
            return InputOutcome::ignored();
        }
        self.playback.release_forced_mute();
        let Some(intent) = intent else {
            return InputOutcome::ignored();
        };

        let mut batch = OperationBatcher::new();
        self.step(intent, now_ms, &mut batch);
        InputOutcome::handled(batch)
    }

    fn step(&mut self, intent: ScrollIntent, now_ms: f64, batch: &mut OperationBatcher) {
        if let Some(index) = self.scroll.request(intent, self.feed.len(), now_ms) {
            self.on_index_changed(index, now_ms, batch);
        }
    }

    fn jump(&mut self, index: usize, now_ms: f64, batch: &mut OperationBatcher) -> bool {
        match self.scroll.jump_to(index, self.feed.len(), now_ms) {
            Some(index) => {
                self.on_index_changed(index, now_ms, batch);
                true
            }
            None => false,
        }
    }

    fn on_index_changed(&mut self, index: usize, now_ms: f64, batch: &mut OperationBatcher) {
        let top = self.viewport.top_of(index);
        batch.push(FeedOperation::ScrollTo { index, top });

        let target = Viewport {
            scroll_top: top,
            viewport_height: self.viewport.viewport_height,
        };
        self.replenish(target, now_ms, batch);

        if let Some(op) = self.playback.load(&mut self.feed, index, self.settings.muted) {
            batch.push(op);
        }
    }

    // ---- playback --------------------------------------------------------

    pub fn on_visibility(&mut self, slide_id: &str, ratio: f64) -> Vec<FeedOperation> {
        self.playback
            .on_visibility(&mut self.feed, slide_id, ratio, self.settings.muted)
            .into_iter()
            .collect()
    }

    /// Player state change, optionally attributed to the slide whose embed sent it.
    /// Only the current slide may advance the feed.
    pub fn on_player_state(&mut self, slide_id: Option<&str>, state: PlayerState, now_ms: f64) -> Vec<FeedOperation> {
        if !self.playback.should_advance(state) {
            return Vec::new();
        }
        if let Some(slide_id) = slide_id {
            if self.current_slide_id() != Some(slide_id) {
                log::debug!("Ignoring end of non-current slide {}", slide_id);
                return Vec::new();
            }
        }

        let mut batch = OperationBatcher::new();
        self.step(ScrollIntent::Step(1), now_ms, &mut batch);
        batch.into_ordered()
    }

    pub fn on_player_event(&mut self, event: PlayerEvent, now_ms: f64) -> Vec<FeedOperation> {
        self.on_player_state(event.slide_id.as_deref(), event.state, now_ms)
    }

    /// Raw cross-frame message from an embed
    pub fn on_player_message(&mut self, slide_id: Option<&str>, data: &str, now_ms: f64) -> Vec<FeedOperation> {
        match parse_player_message(data) {
            Some(state) => self.on_player_state(slide_id, state, now_ms),
            None => Vec::new(),
        }
    }

    pub fn set_auto_next(&mut self, enabled: bool) {
        self.playback.set_auto_next(enabled);
    }

    // ---- settings --------------------------------------------------------

    pub fn toggle_mute(&mut self) -> Vec<FeedOperation> {
        self.set_muted(!self.settings.muted)
    }

    pub fn set_muted(&mut self, muted: bool) -> Vec<FeedOperation> {
        if let Err(e) = self.settings.set_muted(muted, self.storage.as_mut()) {
            log::error!("Failed to persist mute setting: {}", e);
        }
        // An explicit choice overrides the autoplay mute
        self.playback.release_forced_mute();

        let mut batch = OperationBatcher::new();
        batch.push(FeedOperation::ApplyMute { muted });
        batch.extend(self.playback.rewrite_for_mute(&mut self.feed, muted));
        batch.into_ordered()
    }

    pub fn set_player_size(&mut self, size: PlayerSize) -> Vec<FeedOperation> {
        if let Err(e) = self.settings.set_player_size(size, self.storage.as_mut()) {
            log::error!("Failed to persist player size: {}", e);
        }
        vec![FeedOperation::ApplyPlayerSize { size }]
    }

    pub fn set_text_layout(&mut self, layout: TextLayout) -> Vec<FeedOperation> {
        if let Err(e) = self.settings.set_text_layout(layout, self.storage.as_mut()) {
            log::error!("Failed to persist text layout: {}", e);
        }
        vec![FeedOperation::ApplyTextLayout { layout }]
    }

    // ---- panels ----------------------------------------------------------

    pub fn open_panel(&mut self, panel: Panel) -> Vec<FeedOperation> {
        let mut batch = OperationBatcher::new();
        batch.extend(self.panels.open(panel).into_iter().map(FeedOperation::from));
        self.render_panel(panel, &mut batch);
        batch.into_ordered()
    }

    pub fn close_panel(&mut self, panel: Panel) -> Vec<FeedOperation> {
        self.panels
            .close(panel)
            .into_iter()
            .map(FeedOperation::from)
            .collect()
    }

    pub fn toggle_panel(&mut self, panel: Panel) -> Vec<FeedOperation> {
        let mut batch = OperationBatcher::new();
        batch.extend(self.panels.toggle(panel).into_iter().map(FeedOperation::from));
        if self.panels.is_open(panel) {
            self.render_panel(panel, &mut batch);
        }
        batch.into_ordered()
    }

    pub fn close_all_panels(&mut self) -> Vec<FeedOperation> {
        self.panels
            .close_all()
            .into_iter()
            .map(FeedOperation::from)
            .collect()
    }

    fn render_panel(&self, panel: Panel, batch: &mut OperationBatcher) {
        match panel {
            Panel::Search => batch.push(FeedOperation::RenderSearchResults {
                results: self.search_results(&self.last_query),
            }),
            Panel::Queue => batch.push(self.render_queue()),
            Panel::Filter => {}
        }
    }

    fn render_queue(&self) -> FeedOperation {
        FeedOperation::RenderQueue {
            entries: self.queue.entries().to_vec(),
        }
    }

    // ---- search & filter -------------------------------------------------

    pub fn search_results(&self, query: &str) -> Vec<SearchResult> {
        self.search.results(self.store.items(), query, self.filter)
    }

    pub fn search(&mut self, query: &str) -> Vec<FeedOperation> {
        self.last_query = query.to_string();
        vec![FeedOperation::RenderSearchResults {
            results: self.search_results(query),
        }]
    }

    /// Changing the category only affects search, never the live feed
    pub fn set_filter(&mut self, filter: CategoryFilter) -> Vec<FeedOperation> {
        self.filter = filter;
        if self.panels.is_open(Panel::Search) {
            let query = self.last_query.clone();
            self.search(&query)
        } else {
            Vec::new()
        }
    }

    /// Jump to a search result, appending it to the feed when not rendered
    pub fn select_search_result(&mut self, title: &str, now_ms: f64) -> Vec<FeedOperation> {
        if !self.click_guard.allow(title, now_ms) {
            return Vec::new();
        }
        let mut batch = OperationBatcher::new();
        if self.jump_to_title(title, None, now_ms, &mut batch) {
            batch.extend(self.close_panel(Panel::Search));
        }
        batch.into_ordered()
    }

    fn jump_to_title(
        &mut self,
        title: &str,
        fallback: Option<ContentItem>,
        now_ms: f64,
        batch: &mut OperationBatcher,
    ) -> bool {
        if let Some(index) = self.feed.position_of_title(title) {
            return self.jump(index, now_ms, batch);
        }

        let appended = match self.store.find_by_title(title).cloned().or(fallback) {
            Some(item) => self.append_item(&item, false, batch),
            None => false,
        };
        if !appended {
            batch.notify(format!("No trailer available for \"{}\"", title));
            return false;
        }
        let index = self.feed.len() - 1;
        self.jump(index, now_ms, batch)
    }

    // ---- queue -----------------------------------------------------------

    pub fn queue_add(&mut self, entry: QueueEntry) -> Vec<FeedOperation> {
        let mut batch = OperationBatcher::new();
        let title = entry.title.clone();
        match self.queue.add(entry, self.storage.as_mut()) {
            Ok(AddOutcome::Added) => {
                batch.notify(format!("Added \"{}\" to queue", title));
                batch.push(self.render_queue());
            }
            Ok(AddOutcome::AlreadyQueued) => batch.notify("Already in queue"),
            Err(e) => {
                log::error!("Failed to persist queue: {}", e);
                batch.push(self.render_queue());
            }
        }
        batch.into_ordered()
    }

    /// The "list" action of a slide
    pub fn queue_add_slide(&mut self, slide_id: &str, now_ms: f64) -> Vec<FeedOperation> {
        if !self.click_guard.allow(&format!("list:{}", slide_id), now_ms) {
            return Vec::new();
        }
        let Some(entry) = self
            .feed
            .position_of_id(slide_id)
            .and_then(|index| self.feed.get(index))
            .map(|slide| QueueEntry::from(&slide.item))
        else {
            return Vec::new();
        };
        self.queue_add(entry)
    }

    pub fn slide_action(&mut self, slide_id: &str, action: SlideAction, now_ms: f64) -> Vec<FeedOperation> {
        match action {
            SlideAction::List => self.queue_add_slide(slide_id, now_ms),
            // Like and share have no backend
            SlideAction::Like | SlideAction::Share => Vec::new(),
        }
    }

    pub fn queue_remove(&mut self, index: usize) -> Vec<FeedOperation> {
        if let Err(e) = self.queue.remove(index, self.storage.as_mut()) {
            log::error!("Failed to persist queue: {}", e);
        }
        vec![self.render_queue()]
    }

    pub fn queue_clear(&mut self) -> Vec<FeedOperation> {
        if let Err(e) = self.queue.clear(self.storage.as_mut()) {
            log::error!("Failed to persist queue: {}", e);
        }
        let mut batch = OperationBatcher::new();
        batch.push(self.render_queue());
        batch.notify("Queue cleared");
        batch.into_ordered()
    }

    /// Play a queue entry: jump to its slide, injecting it when absent
    pub fn queue_play(&mut self, index: usize, now_ms: f64) -> Vec<FeedOperation> {
        let Some(entry) = self.queue.get(index).cloned() else {
            return Vec::new();
        };
        let mut batch = OperationBatcher::new();
        let fallback = ContentItem::from(&entry);
        if self.jump_to_title(&entry.title, Some(fallback), now_ms, &mut batch) {
            batch.extend(self.close_panel(Panel::Queue));
        }
        batch.into_ordered()
    }

    // ---- housekeeping ----------------------------------------------------

    pub fn stats(&self) -> SessionStats {
        let playback = self.playback.stats(&self.feed);
        SessionStats {
            total_items: self.store.len(),
            playable_items: self.store.playable().count(),
            slides: self.feed.len(),
            current_index: self.current_index(),
            loaded_embeds: playback.loaded,
            deferred_embeds: playback.deferred,
            unloaded_embeds: playback.unloaded,
            queue_len: self.queue.len(),
        }
    }

    /// Drop all slides and the catalog
    pub fn reset(&mut self) -> Vec<FeedOperation> {
        let removed = self.feed.clear();
        self.store.reset();
        self.scroll.reset();
        self.replenish_limit.reset();
        removed
            .into_iter()
            .map(|slide_id| FeedOperation::RemoveSlide { slide_id })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::EmbedSlot;

    const VH: f64 = 800.0;

    fn playable(title: &str, index: usize) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            trailer_url: Some(format!("https://www.youtube.com/watch?v=vid{:05}", index)),
            ..Default::default()
        }
    }

    fn catalog(count: usize) -> Vec<ContentItem> {
        (0..count).map(|i| playable(&format!("Title {}", i), i)).collect()
    }

    fn session_with(config: FeedConfig, items: Vec<ContentItem>) -> FeedSession {
        let mut session = FeedSession::new(config, Box::new(MemoryStore::new()), 42);
        session.set_viewport(0.0, VH);
        session.load_items(items);
        session
    }

    fn count_appends(ops: &[FeedOperation]) -> usize {
        ops.iter()
            .filter(|op| matches!(op, FeedOperation::AppendSlide { .. }))
            .count()
    }

    #[test]
    fn test_document_with_unplayable_item_yields_one_slide() {
        let json = r#"{"items": [
            {"title": "With", "trailerUrl": "https://youtu.be/abcdefghijk"},
            {"title": "Without"}
        ]}"#;
        let mut session = FeedSession::new(FeedConfig::default(), Box::new(MemoryStore::new()), 1);
        session.load_content(json).unwrap();

        assert_eq!(session.feed().len(), 1);
        assert_eq!(session.feed().get(0).unwrap().title, "With");
        assert_eq!(session.stats().playable_items, 1);
    }

    #[test]
    fn test_unplayable_item_never_enters_feed() {
        let config = FeedConfig {
            min_feed_len: 2,
            ..Default::default()
        };
        let mut items = catalog(1);
        items.push(ContentItem {
            title: "Broken".to_string(),
            trailer_url: Some("short".to_string()),
            ..Default::default()
        });

        let mut session = FeedSession::new(config, Box::new(MemoryStore::new()), 3);
        let ops = session.load_items(items);

        assert_eq!(count_appends(&ops), 1);
        assert!(session.feed().position_of_title("Broken").is_none());
    }

    #[test]
    fn test_bootstrap_stops_when_only_foreign_trailers_remain() {
        let mut items = catalog(5);
        items.push(ContentItem {
            title: "Elsewhere".to_string(),
            trailer_url: Some("https://vimeo.com/1234567".to_string()),
            ..Default::default()
        });

        let mut session = FeedSession::new(FeedConfig::default(), Box::new(MemoryStore::new()), 9);
        let ops = session.load_items(items);

        assert_eq!(count_appends(&ops), 5);
        assert_eq!(session.stats().playable_items, 5);
        assert!(session.feed().position_of_title("Elsewhere").is_none());
    }

    #[test]
    fn test_bootstrap_fills_minimum_and_loads_first() {
        let session = session_with(FeedConfig::default(), catalog(40));
        assert_eq!(session.feed().len(), 20);
        assert!(session.feed().get(0).unwrap().is_loaded());
        assert_eq!(session.feed().get(1).unwrap().embed, EmbedSlot::Deferred);
    }

    #[test]
    fn test_arrow_down_clamped_at_end() {
        let config = FeedConfig {
            min_feed_len: 6,
            replenish_batch: 0,
            ..Default::default()
        };
        let mut session = session_with(config, catalog(6));

        let mut now = 0.0;
        for _ in 0..5 {
            now += 1000.0;
            session.handle_key("ArrowDown", false, now);
        }
        assert_eq!(session.current_index(), 5);

        let outcome = session.handle_key("ArrowDown", false, now + 1000.0);
        assert!(outcome.handled);
        assert_eq!(session.current_index(), 5);
        assert!(!outcome
            .operations
            .iter()
            .any(|op| matches!(op, FeedOperation::ScrollTo { .. })));
    }

    #[test]
    fn test_replenish_near_end_appends_three_unseen() {
        let config = FeedConfig {
            min_feed_len: 10,
            ..Default::default()
        };
        let mut session = session_with(config, catalog(30));
        assert_eq!(session.feed().len(), 10);
        let recent_before: Vec<String> = session
            .feed()
            .recent_titles(15)
            .into_iter()
            .map(str::to_string)
            .collect();

        // Bottom of the viewport two viewports before the end
        let ops = session.on_viewport(7.0 * VH, VH, 5_000.0);
        let appended: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                FeedOperation::AppendSlide { slide } => Some(slide.title.as_str()),
                _ => None,
            })
            .collect();

        assert_eq!(appended.len(), 3);
        assert!(appended.iter().all(|t| !recent_before.iter().any(|r| r == t)));

        // Rate limited within the same second
        assert!(session.on_viewport(8.0 * VH, VH, 5_500.0).is_empty());
    }

    #[test]
    fn test_no_replenish_far_from_end() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        assert!(session.on_viewport(0.0, VH, 5_000.0).is_empty());
    }

    #[test]
    fn test_wheel_respects_cooldown_and_ignore_zone() {
        let mut session = session_with(FeedConfig::default(), catalog(30));

        let outcome = session.handle_wheel(100.0, false, 1_000.0);
        assert!(outcome.handled);
        assert_eq!(session.current_index(), 1);
        assert!(outcome.operations.contains(&FeedOperation::ScrollTo { index: 1, top: VH }));

        session.handle_wheel(100.0, false, 1_200.0);
        assert_eq!(session.current_index(), 1);

        let ignored = session.handle_wheel(100.0, true, 5_000.0);
        assert!(!ignored.handled);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_input_passes_through_before_content() {
        let mut session = FeedSession::new(FeedConfig::default(), Box::new(MemoryStore::new()), 5);
        session.set_viewport(0.0, VH);

        assert!(!session.handle_wheel(120.0, false, 1_000.0).handled);
        assert!(!session.handle_key("ArrowDown", false, 1_000.0).handled);
        session.touch_start(400.0, 1_000.0);
        assert!(!session.touch_end(200.0, false, 1_100.0).handled);

        // Player size keys still apply
        assert!(session.handle_key("2", false, 1_200.0).handled);
        assert_eq!(session.settings().player_size, PlayerSize::Medium);
    }

    #[test]
    fn test_index_change_loads_target() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        let outcome = session.handle_key("j", false, 1_000.0);
        assert!(outcome.operations.iter().any(|op| matches!(
            op,
            FeedOperation::LoadEmbed { slide_id, .. } if slide_id == "slide-1"
        )));
    }

    #[test]
    fn test_number_keys_set_player_size() {
        let mut session = session_with(FeedConfig::default(), catalog(5));
        let outcome = session.handle_key("1", false, 0.0);
        assert_eq!(
            outcome.operations,
            vec![FeedOperation::ApplyPlayerSize {
                size: PlayerSize::Small
            }]
        );
        assert_eq!(session.settings().player_size, PlayerSize::Small);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_duplicate_queue_add_notifies() {
        let mut session = session_with(FeedConfig::default(), catalog(5));
        for title in ["A", "B"] {
            session.queue_add(QueueEntry {
                title: title.to_string(),
                ..Default::default()
            });
        }

        let ops = session.queue_add(QueueEntry {
            title: "A".to_string(),
            ..Default::default()
        });
        assert_eq!(session.queue().len(), 2);
        assert_eq!(
            ops,
            vec![FeedOperation::Notify {
                message: "Already in queue".to_string()
            }]
        );
    }

    #[test]
    fn test_queue_play_injects_missing_slide() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        session.open_panel(Panel::Queue);
        session.queue_add(QueueEntry {
            title: "Off Catalog".to_string(),
            trailer_url: Some("https://youtu.be/zzzzzzzzzzz".to_string()),
            ..Default::default()
        });

        let ops = session.queue_play(0, 10_000.0);
        let index = session.feed().position_of_title("off catalog").unwrap();
        assert_eq!(session.current_index(), index);
        assert!(matches!(ops[0], FeedOperation::AppendSlide { .. }));
        assert!(ops.contains(&FeedOperation::HidePanel { panel: Panel::Queue }));
        assert!(ops.iter().any(|op| matches!(op, FeedOperation::ScrollTo { .. })));
    }

    #[test]
    fn test_queue_play_without_trailer_notifies() {
        let mut session = session_with(FeedConfig::default(), catalog(5));
        session.queue_add(QueueEntry {
            title: "Nothing".to_string(),
            ..Default::default()
        });

        let ops = session.queue_play(0, 0.0);
        assert!(matches!(ops.as_slice(), [FeedOperation::Notify { .. }]));
    }

    #[test]
    fn test_search_result_jumps_to_rendered_slide() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        let target = session.feed().get(7).unwrap().title.clone();
        session.open_panel(Panel::Search);

        let ops = session.select_search_result(&target, 1_000.0);
        assert_eq!(session.current_index(), 7);
        assert!(ops.contains(&FeedOperation::HidePanel { panel: Panel::Search }));

        // Duplicate click suppressed
        assert!(session.select_search_result(&target, 1_100.0).is_empty());
    }

    #[test]
    fn test_toggle_panel_opens_then_closes() {
        let mut session = session_with(FeedConfig::default(), catalog(5));
        session.open_panel(Panel::Queue);

        let ops = session.toggle_panel(Panel::Search);
        assert_eq!(session.active_panel(), Some(Panel::Search));
        assert!(ops.contains(&FeedOperation::HidePanel { panel: Panel::Queue }));
        assert!(ops.contains(&FeedOperation::ShowPanel { panel: Panel::Search }));
        assert!(ops
            .iter()
            .any(|op| matches!(op, FeedOperation::RenderSearchResults { results } if results.len() == 5)));

        let ops = session.toggle_panel(Panel::Search);
        assert_eq!(ops, vec![FeedOperation::HidePanel { panel: Panel::Search }]);
        assert_eq!(session.active_panel(), None);
    }

    #[test]
    fn test_filter_rerenders_open_search() {
        let mut items = catalog(3);
        items[1].kind = crate::types::ContentType::Tv;
        let mut session = session_with(FeedConfig::default(), items);

        assert!(session.set_filter(CategoryFilter::Tv).is_empty());
        session.open_panel(Panel::Search);
        let ops = session.set_filter(CategoryFilter::Tv);
        match &ops[0] {
            FeedOperation::RenderSearchResults { results } => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].title, "Title 1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_toggle_mute_rewrites_loaded_embeds() {
        let config = FeedConfig {
            force_initial_mute: false,
            ..Default::default()
        };
        let mut session = session_with(config, catalog(30));
        assert!(session.settings().muted);

        let ops = session.toggle_mute();
        assert_eq!(ops[0], FeedOperation::RewriteEmbed {
            slide_id: "slide-0".to_string(),
            src: crate::embed::embed_url(&session.feed().get(0).unwrap().video_id, false),
        });
        assert!(ops.contains(&FeedOperation::ApplyMute { muted: false }));
        assert!(!session.settings().muted);
    }

    #[test]
    fn test_first_gesture_releases_forced_mute() {
        let storage = MemoryStore::new().with_entry(crate::storage::MUTED_KEY, "false");
        let mut session = FeedSession::new(FeedConfig::default(), Box::new(storage), 9);
        session.set_viewport(0.0, VH);
        session.load_items(catalog(30));

        let first = session.feed().get(0).unwrap();
        assert!(first.src.as_deref().unwrap().contains("mute=1"));

        let outcome = session.handle_key("ArrowDown", false, 1_000.0);
        let loaded = outcome.operations.iter().find_map(|op| match op {
            FeedOperation::LoadEmbed { src, .. } => Some(src.as_str()),
            _ => None,
        });
        assert!(loaded.unwrap().contains("mute=0"));
    }

    #[test]
    fn test_player_end_advances_only_current() {
        let mut session = session_with(FeedConfig::default(), catalog(30));

        assert!(session
            .on_player_state(Some("slide-3"), PlayerState::Ended, 1_000.0)
            .is_empty());
        assert_eq!(session.current_index(), 0);

        let ops = session.on_player_message(
            Some("slide-0"),
            r#"{"event":"onStateChange","info":0}"#,
            1_000.0,
        );
        assert_eq!(session.current_index(), 1);
        assert!(!ops.is_empty());

        session.set_auto_next(false);
        session.on_player_state(None, PlayerState::Ended, 5_000.0);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_settled_scroll_resyncs_index() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        session.handle_wheel(100.0, false, 0.0);
        assert_eq!(session.current_index(), 1);

        // Still travelling towards slide 1
        assert!(session.on_scroll_settled(0.2 * VH, VH, 100.0).is_empty());
        assert_eq!(session.current_index(), 1);

        let ops = session.on_scroll_settled(3.0 * VH, VH, 1_000.0);
        assert_eq!(session.current_index(), 3);
        let slide_id = session.feed().get(3).unwrap().id.clone();
        assert!(ops
            .iter()
            .any(|op| matches!(op, FeedOperation::LoadEmbed { slide_id: id, .. } if *id == slide_id)));
    }

    #[test]
    fn test_reset_removes_all_slides() {
        let mut session = session_with(FeedConfig::default(), catalog(30));
        let ops = session.reset();
        assert_eq!(ops.len(), 20);
        assert_eq!(session.stats().slides, 0);
        assert!(!session.store().is_loaded());
    }
}
