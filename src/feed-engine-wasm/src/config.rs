use serde::{Deserialize, Serialize};

/// Tunables for the feed engine
///
/// JS may pass a partial object; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    /// Content document path, a cache-busting query is appended on fetch
    pub content_url: String,
    /// Time after an accepted gesture during which further input is swallowed
    pub gesture_cooldown_ms: f64,
    /// Upper bound for a smooth scroll to count as in flight
    pub scroll_settle_ms: f64,
    /// Minimum |deltaY| for a wheel event to count as a gesture
    pub wheel_deadzone: f64,
    pub swipe_min_distance: f64,
    pub swipe_max_duration_ms: f64,
    /// Intersection ratio at which a slide loads its embed
    pub visibility_threshold: f64,
    /// Replenish when the viewport bottom is this many viewports from the end
    pub replenish_viewports: f64,
    pub replenish_batch: usize,
    pub replenish_interval_ms: f64,
    /// Number of trailing slide titles excluded from candidate selection
    pub recent_window: usize,
    pub min_feed_len: usize,
    pub search_result_cap: usize,
    pub search_debounce_ms: i32,
    pub click_guard_ms: f64,
    /// Advance to the next slide when the current video ends
    pub auto_next: bool,
    /// Mute the very first autoplaying embed regardless of the saved setting
    pub force_initial_mute: bool,
    /// Selector of the host's scroll container the slides are appended to
    pub container_selector: String,
    /// Wheel, key and touch input inside these elements never drives the feed
    pub ignore_zone_selector: String,
    pub debug: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            content_url: "movies-database.json".to_string(),
            gesture_cooldown_ms: 500.0,
            scroll_settle_ms: 700.0,
            wheel_deadzone: 30.0,
            swipe_min_distance: 50.0,
            swipe_max_duration_ms: 300.0,
            visibility_threshold: 0.5,
            replenish_viewports: 3.0,
            replenish_batch: 3,
            replenish_interval_ms: 1000.0,
            recent_window: 15,
            min_feed_len: 20,
            search_result_cap: 30,
            search_debounce_ms: 250,
            click_guard_ms: 400.0,
            auto_next: true,
            force_initial_mute: true,
            container_selector: ".snap-y.snap-mandatory".to_string(),
            ignore_zone_selector: "input, textarea, select, [contenteditable], .movieshows-panel, #movieshows-controls".to_string(),
            debug: false,
        }
    }
}
