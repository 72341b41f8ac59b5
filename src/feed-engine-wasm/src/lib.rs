pub mod binder;
pub mod config;
pub mod embed;
pub mod error;
pub mod feed;
mod logging;
pub mod ops;
pub mod panels;
pub mod playback;
pub mod queue;
pub mod readiness;
pub mod scroll;
pub mod search;
pub mod session;
pub mod settings;
pub mod slide;
pub mod storage;
pub mod store;
pub mod throttle;
pub mod types;
#[cfg(target_arch = "wasm32")]
mod web;

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

use config::FeedConfig;
use error::FeedError;
use session::FeedSession;
use slide::SlideAction;
use storage::{KeyValueStore, MemoryStore};
use types::{CategoryFilter, FeedOperation, Panel, PlayerSize, QueueEntry, TextLayout};

pub use logging::init_logging;

/// Wall clock in milliseconds
pub(crate) fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
            .unwrap_or_default()
    }
}

fn open_storage() -> Box<dyn KeyValueStore> {
    #[cfg(target_arch = "wasm32")]
    {
        match web::storage::LocalStore::open() {
            Ok(store) => return Box::new(store),
            Err(e) => log::warn!("localStorage unavailable, settings will not persist: {}", e),
        }
    }
    Box::new(MemoryStore::new())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Feed engine - session state plus the operations that keep the DOM in step
///
/// Every mutating call returns the ordered `FeedOperation[]` it produced. When
/// the engine was created by `startFeed` those operations are also applied to
/// the page.
#[wasm_bindgen]
pub struct FeedEngine {
    session: Rc<RefCell<FeedSession>>,
    #[cfg(target_arch = "wasm32")]
    driver: Option<web::Driver>,
}

impl FeedEngine {
    fn session(&self) -> RefMut<'_, FeedSession> {
        self.session.borrow_mut()
    }

    /// Apply to the page when mounted, then hand the operations to the caller
    fn dispatch(&self, operations: Vec<FeedOperation>) -> Result<JsValue, JsValue> {
        self.apply(&operations);
        to_js(&operations)
    }

    #[cfg(target_arch = "wasm32")]
    fn apply(&self, operations: &[FeedOperation]) {
        if let Some(driver) = &self.driver {
            driver.apply(operations);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn apply(&self, _operations: &[FeedOperation]) {}

    #[cfg(target_arch = "wasm32")]
    fn unmount(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.shutdown();
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn unmount(&mut self) {}
}

#[wasm_bindgen]
impl FeedEngine {
    /// Create an engine; `config` may be undefined or a partial `FeedConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config_js: JsValue) -> Result<FeedEngine, JsValue> {
        // Set panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config: FeedConfig = if config_js.is_undefined() || config_js.is_null() {
            FeedConfig::default()
        } else {
            from_value(config_js)?
        };
        init_logging(config.debug);

        let seed = now_ms() as u64;
        let session = FeedSession::new(config, open_storage(), seed);

        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            #[cfg(target_arch = "wasm32")]
            driver: None,
        })
    }

    /// Install the content document text and bootstrap the feed
    #[wasm_bindgen(js_name = loadContent)]
    pub fn load_content(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().load_content(json)?;
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = initialOperations)]
    pub fn initial_operations(&self) -> Result<JsValue, JsValue> {
        let operations = self.session.borrow().initial_operations();
        self.dispatch(operations)
    }

    /// Returns `{handled, operations}`; call preventDefault when handled
    #[wasm_bindgen(js_name = handleWheel)]
    pub fn handle_wheel(&mut self, delta_y: f64, in_ignore_zone: bool) -> Result<JsValue, JsValue> {
        let outcome = self.session().handle_wheel(delta_y, in_ignore_zone, now_ms());
        self.dispatch(outcome.operations.clone())?;
        to_js(&outcome)
    }

    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&mut self, key: &str, in_ignore_zone: bool) -> Result<JsValue, JsValue> {
        let outcome = self.session().handle_key(key, in_ignore_zone, now_ms());
        self.dispatch(outcome.operations.clone())?;
        to_js(&outcome)
    }

    #[wasm_bindgen(js_name = touchStart)]
    pub fn touch_start(&mut self, client_y: f64) {
        self.session().touch_start(client_y, now_ms());
    }

    #[wasm_bindgen(js_name = touchEnd)]
    pub fn touch_end(&mut self, client_y: f64, in_ignore_zone: bool) -> Result<JsValue, JsValue> {
        let outcome = self.session().touch_end(client_y, in_ignore_zone, now_ms());
        self.dispatch(outcome.operations.clone())?;
        to_js(&outcome)
    }

    #[wasm_bindgen(js_name = onViewport)]
    pub fn on_viewport(&mut self, scroll_top: f64, viewport_height: f64) -> Result<JsValue, JsValue> {
        let operations = self.session().on_viewport(scroll_top, viewport_height, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = onScrollSettled)]
    pub fn on_scroll_settled(&mut self, scroll_top: f64, viewport_height: f64) -> Result<JsValue, JsValue> {
        let operations = self
            .session()
            .on_scroll_settled(scroll_top, viewport_height, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = onVisibility)]
    pub fn on_visibility(&mut self, slide_id: &str, ratio: f64) -> Result<JsValue, JsValue> {
        let operations = self.session().on_visibility(slide_id, ratio);
        self.dispatch(operations)
    }

    /// Feed a raw `message` event payload from an embedded player
    #[wasm_bindgen(js_name = onPlayerMessage)]
    pub fn on_player_message(&mut self, slide_id: Option<String>, data: &str) -> Result<JsValue, JsValue> {
        let operations = self
            .session()
            .on_player_message(slide_id.as_deref(), data, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = setAutoNext)]
    pub fn set_auto_next(&mut self, enabled: bool) {
        self.session().set_auto_next(enabled);
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&mut self) -> Result<JsValue, JsValue> {
        let operations = self.session().toggle_mute();
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = setPlayerSize)]
    pub fn set_player_size(&mut self, size: &str) -> Result<JsValue, JsValue> {
        let size = PlayerSize::parse(size)
            .ok_or_else(|| FeedError::InvalidArgument(format!("unknown player size {:?}", size)))?;
        let operations = self.session().set_player_size(size);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = setTextLayout)]
    pub fn set_text_layout(&mut self, layout: &str) -> Result<JsValue, JsValue> {
        let layout = TextLayout::parse(layout)
            .ok_or_else(|| FeedError::InvalidArgument(format!("unknown text layout {:?}", layout)))?;
        let operations = self.session().set_text_layout(layout);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = openPanel)]
    pub fn open_panel(&mut self, panel: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().open_panel(parse_panel(panel)?);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = closePanel)]
    pub fn close_panel(&mut self, panel: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().close_panel(parse_panel(panel)?);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = togglePanel)]
    pub fn toggle_panel(&mut self, panel: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().toggle_panel(parse_panel(panel)?);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = search)]
    pub fn search(&mut self, query: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().search(query);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&mut self, filter: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().set_filter(CategoryFilter::parse(filter));
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = selectSearchResult)]
    pub fn select_search_result(&mut self, title: &str) -> Result<JsValue, JsValue> {
        let operations = self.session().select_search_result(title, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = slideAction)]
    pub fn slide_action(&mut self, slide_id: &str, action: &str) -> Result<JsValue, JsValue> {
        let action = SlideAction::parse(action)
            .ok_or_else(|| FeedError::InvalidArgument(format!("unknown slide action {:?}", action)))?;
        let operations = self.session().slide_action(slide_id, action, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = queueAdd)]
    pub fn queue_add(&mut self, entry_js: JsValue) -> Result<JsValue, JsValue> {
        let entry: QueueEntry = from_value(entry_js)?;
        let operations = self.session().queue_add(entry);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = queueRemove)]
    pub fn queue_remove(&mut self, index: usize) -> Result<JsValue, JsValue> {
        let operations = self.session().queue_remove(index);
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = queueClear)]
    pub fn queue_clear(&mut self) -> Result<JsValue, JsValue> {
        let operations = self.session().queue_clear();
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = queuePlay)]
    pub fn queue_play(&mut self, index: usize) -> Result<JsValue, JsValue> {
        let operations = self.session().queue_play(index, now_ms());
        self.dispatch(operations)
    }

    #[wasm_bindgen(js_name = getQueue)]
    pub fn get_queue(&self) -> Result<JsValue, JsValue> {
        to_js(self.session.borrow().queue().entries())
    }

    #[wasm_bindgen(js_name = searchResults)]
    pub fn search_results(&self, query: &str) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().search_results(query))
    }

    #[wasm_bindgen(getter, js_name = currentIndex)]
    pub fn current_index(&self) -> usize {
        self.session.borrow().current_index()
    }

    #[wasm_bindgen(js_name = isScrolling)]
    pub fn is_scrolling(&self) -> bool {
        self.session.borrow().is_scrolling(now_ms())
    }

    /// Get statistics
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().stats())
    }

    /// Drop every slide and the catalog
    #[wasm_bindgen(js_name = reset)]
    pub fn reset(&mut self) -> Result<JsValue, JsValue> {
        let operations = self.session().reset();
        self.dispatch(operations)
    }

    /// Detach every listener and observer installed by `startFeed`
    #[wasm_bindgen(js_name = destroy)]
    pub fn destroy(&mut self) {
        self.unmount();
    }
}

fn parse_panel(value: &str) -> Result<Panel, FeedError> {
    Panel::parse(value).ok_or_else(|| FeedError::InvalidArgument(format!("unknown panel {:?}", value)))
}

/// Boot the feed on the current page: wait for the host's scroll container,
/// inject controls, bind host buttons and load the content document
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = startFeed)]
pub async fn start_feed(config_js: JsValue) -> Result<FeedEngine, JsValue> {
    let mut engine = FeedEngine::new(config_js)?;
    let driver = web::Driver::mount(Rc::clone(&engine.session)).await?;
    engine.driver = Some(driver);
    Ok(engine)
}

#[wasm_bindgen(typescript_custom_section)]
const TYPESCRIPT_TYPES: &'static str = r#"
export interface FeedConfig {
    contentUrl?: string;
    gestureCooldownMs?: number;
    scrollSettleMs?: number;
    wheelDeadzone?: number;
    swipeMinDistance?: number;
    swipeMaxDurationMs?: number;
    visibilityThreshold?: number;
    replenishViewports?: number;
    replenishBatch?: number;
    replenishIntervalMs?: number;
    recentWindow?: number;
    minFeedLen?: number;
    searchResultCap?: number;
    searchDebounceMs?: number;
    clickGuardMs?: number;
    autoNext?: boolean;
    forceInitialMute?: boolean;
    containerSelector?: string;
    ignoreZoneSelector?: string;
    debug?: boolean;
}

export interface ContentItem {
    title: string;
    type: 'movie' | 'tv';
    year: string;
    rating: string;
    genres: string[];
    source: string;
    trailerUrl?: string;
    posterUrl?: string;
    description: string;
    nowPlaying: string[];
}

export interface QueueEntry {
    title: string;
    posterUrl?: string;
    year: string;
    trailerUrl?: string;
}

export interface SlideModel {
    id: string;
    title: string;
    videoId: string;
    src?: string;
    deferredSrc?: string;
    ratingBadge: string;
    yearBadge?: string;
    sourceBadge?: string;
    kind: 'movie' | 'tv';
    description: string;
    genres: string[];
    posterUrl?: string;
    nowPlaying: boolean;
    actions: ('like' | 'list' | 'share')[];
}

export interface SearchResult {
    title: string;
    year: string;
    kind: 'movie' | 'tv';
    rating: string;
    posterUrl?: string;
    playable: boolean;
}

export type Panel = 'search' | 'filter' | 'queue';

export type FeedOperation =
    | { type: 'appendSlide'; slide: SlideModel }
    | { type: 'removeSlide'; slideId: string }
    | { type: 'scrollTo'; index: number; top: number }
    | { type: 'loadEmbed'; slideId: string; src: string }
    | { type: 'unloadEmbed'; slideId: string }
    | { type: 'rewriteEmbed'; slideId: string; src: string }
    | { type: 'showPanel'; panel: Panel }
    | { type: 'hidePanel'; panel: Panel }
    | { type: 'notify'; message: string }
    | { type: 'applyMute'; muted: boolean }
    | { type: 'applyPlayerSize'; size: 'small' | 'medium' | 'large' | 'full' }
    | { type: 'applyTextLayout'; layout: 'overlay' | 'below' | 'hidden' }
    | { type: 'renderSearchResults'; results: SearchResult[] }
    | { type: 'renderQueue'; entries: QueueEntry[] };

export interface InputOutcome {
    handled: boolean;
    operations: FeedOperation[];
}

export interface FeedStats {
    totalItems: number;
    playableItems: number;
    slides: number;
    currentIndex: number;
    loadedEmbeds: number;
    deferredEmbeds: number;
    unloadedEmbeds: number;
    queueLen: number;
}
"#;
