use crate::config::FeedConfig;
use crate::types::PlayerSize;

/// Requested movement through the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollIntent {
    Step(i32),
    First,
    Last,
}

/// What a key press means to the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Scroll(ScrollIntent),
    PlayerSize(PlayerSize),
    None,
}

/// Map a `KeyboardEvent.key` value to a feed action
pub fn classify_key(key: &str) -> KeyAction {
    match key {
        "ArrowDown" | "j" | "J" => KeyAction::Scroll(ScrollIntent::Step(1)),
        "ArrowUp" | "k" | "K" => KeyAction::Scroll(ScrollIntent::Step(-1)),
        "Home" => KeyAction::Scroll(ScrollIntent::First),
        "End" => KeyAction::Scroll(ScrollIntent::Last),
        other => PlayerSize::from_digit(other)
            .map(KeyAction::PlayerSize)
            .unwrap_or(KeyAction::None),
    }
}

/// Index controller over the slide sequence
///
/// Two clocks run side by side: the gesture cooldown decides whether new
/// input is accepted, the in-flight window tracks the smooth scroll itself.
/// Input acceptance only looks at the cooldown, so fast input may run
/// `current_index` ahead of what is on screen until the scroll settles and
/// the index is resynced from the real position.
#[derive(Debug, Clone)]
pub struct ScrollController {
    current_index: usize,
    cooldown_until: f64,
    in_flight_until: Option<f64>,
    touch_start: Option<(f64, f64)>,
    cooldown_ms: f64,
    settle_ms: f64,
    wheel_deadzone: f64,
    swipe_min_distance: f64,
    swipe_max_duration_ms: f64,
}

impl ScrollController {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            current_index: 0,
            cooldown_until: f64::NEG_INFINITY,
            in_flight_until: None,
            touch_start: None,
            cooldown_ms: config.gesture_cooldown_ms,
            settle_ms: config.scroll_settle_ms,
            wheel_deadzone: config.wheel_deadzone,
            swipe_min_distance: config.swipe_min_distance,
            swipe_max_duration_ms: config.swipe_max_duration_ms,
        }
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// True while new gestures are swallowed
    #[inline]
    pub fn is_scrolling(&self, now_ms: f64) -> bool {
        now_ms < self.cooldown_until
    }

    /// True while a smooth scroll issued by us is still travelling
    pub fn scroll_in_flight(&self, now_ms: f64) -> bool {
        self.in_flight_until.map_or(false, |until| now_ms < until)
    }

    /// Wheel delta to intent, None inside the deadzone
    pub fn wheel_intent(&self, delta_y: f64) -> Option<ScrollIntent> {
        if delta_y.abs() <= self.wheel_deadzone {
            return None;
        }
        Some(ScrollIntent::Step(if delta_y > 0.0 { 1 } else { -1 }))
    }

    pub fn touch_start(&mut self, client_y: f64, now_ms: f64) {
        self.touch_start = Some((client_y, now_ms));
    }

    /// Completes a touch; a fast, long enough vertical swipe becomes a step
    pub fn touch_end(&mut self, client_y: f64, now_ms: f64) -> Option<ScrollIntent> {
        let (start_y, start_ms) = self.touch_start.take()?;
        let distance = start_y - client_y;
        let duration = now_ms - start_ms;

        if distance.abs() > self.swipe_min_distance && duration < self.swipe_max_duration_ms {
            Some(ScrollIntent::Step(if distance > 0.0 { 1 } else { -1 }))
        } else {
            None
        }
    }

    /// Resolve an intent into a new index.
    ///
    /// Returns None while cooling down, for an empty feed, or when the
    /// clamped target equals the current index.
    pub fn request(&mut self, intent: ScrollIntent, slide_count: usize, now_ms: f64) -> Option<usize> {
        if self.is_scrolling(now_ms) || slide_count == 0 {
            return None;
        }

        let last = slide_count - 1;
        let target = match intent {
            ScrollIntent::Step(delta) => {
                (self.current_index as i64 + delta as i64).clamp(0, last as i64) as usize
            }
            ScrollIntent::First => 0,
            ScrollIntent::Last => last,
        };

        if target == self.current_index {
            return None;
        }

        self.commit(target, now_ms);
        Some(target)
    }

    /// Jump straight to `index`, used by panel selections. Ignores the
    /// cooldown but starts a new one.
    pub fn jump_to(&mut self, index: usize, slide_count: usize, now_ms: f64) -> Option<usize> {
        if index >= slide_count {
            return None;
        }
        self.commit(index, now_ms);
        Some(index)
    }

    fn commit(&mut self, index: usize, now_ms: f64) {
        self.current_index = index;
        self.cooldown_until = now_ms + self.cooldown_ms;
        self.in_flight_until = Some(now_ms + self.settle_ms);
    }

    /// The container stopped moving; adopt the index that is really on screen.
    ///
    /// While one of our smooth scrolls is still travelling, a pause short of
    /// its target is stale and ignored. Once the in-flight window has passed,
    /// whatever is on screen wins.
    ///
    /// Returns the new index when it differs from the tracked one.
    pub fn on_scroll_settled(&mut self, visible_index: usize, slide_count: usize, now_ms: f64) -> Option<usize> {
        if slide_count == 0 {
            self.in_flight_until = None;
            return None;
        }
        let visible_index = visible_index.min(slide_count - 1);
        if visible_index == self.current_index {
            self.in_flight_until = None;
            return None;
        }
        if self.scroll_in_flight(now_ms) {
            log::debug!(
                "Ignoring settle at {} while scrolling to {}",
                visible_index,
                self.current_index
            );
            return None;
        }

        self.in_flight_until = None;
        log::debug!(
            "Resyncing feed index {} -> {}",
            self.current_index,
            visible_index
        );
        self.current_index = visible_index;
        Some(visible_index)
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
        self.cooldown_until = f64::NEG_INFINITY;
        self.in_flight_until = None;
        self.touch_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ScrollController {
        ScrollController::new(&FeedConfig::default())
    }

    #[test]
    fn test_classify_key() {
        assert_eq!(classify_key("ArrowDown"), KeyAction::Scroll(ScrollIntent::Step(1)));
        assert_eq!(classify_key("k"), KeyAction::Scroll(ScrollIntent::Step(-1)));
        assert_eq!(classify_key("End"), KeyAction::Scroll(ScrollIntent::Last));
        assert_eq!(classify_key("2"), KeyAction::PlayerSize(PlayerSize::Medium));
        assert_eq!(classify_key("5"), KeyAction::None);
        assert_eq!(classify_key("Enter"), KeyAction::None);
    }

    #[test]
    fn test_step_and_cooldown() {
        let mut scroll = controller();

        assert_eq!(scroll.request(ScrollIntent::Step(1), 10, 0.0), Some(1));
        assert!(scroll.is_scrolling(100.0));
        assert_eq!(scroll.request(ScrollIntent::Step(1), 10, 499.0), None);
        assert_eq!(scroll.request(ScrollIntent::Step(1), 10, 500.0), Some(2));
        assert_eq!(scroll.current_index(), 2);
    }

    #[test]
    fn test_clamped_at_last_slide() {
        let mut scroll = controller();
        scroll.jump_to(5, 6, 0.0);

        assert_eq!(scroll.request(ScrollIntent::Step(1), 6, 10_000.0), None);
        assert_eq!(scroll.current_index(), 5);
        // No command means no cooldown either
        assert!(!scroll.is_scrolling(10_001.0));
    }

    #[test]
    fn test_index_never_leaves_bounds() {
        let mut scroll = controller();
        let mut now = 0.0;
        for delta in [-1, -1, 1, 1, 1, 1, 1, 1, -1, 1, 1, 1] {
            scroll.request(ScrollIntent::Step(delta), 4, now);
            assert!(scroll.current_index() < 4);
            now += 600.0;
        }
        assert_eq!(scroll.current_index(), 3);

        assert_eq!(scroll.request(ScrollIntent::First, 4, now), Some(0));
        assert_eq!(scroll.request(ScrollIntent::Last, 4, now + 600.0), Some(3));
    }

    #[test]
    fn test_empty_feed() {
        let mut scroll = controller();
        assert_eq!(scroll.request(ScrollIntent::Last, 0, 0.0), None);
        assert_eq!(scroll.jump_to(0, 0, 0.0), None);
    }

    #[test]
    fn test_wheel_deadzone() {
        let scroll = controller();
        assert_eq!(scroll.wheel_intent(12.0), None);
        assert_eq!(scroll.wheel_intent(-120.0), Some(ScrollIntent::Step(-1)));
        assert_eq!(scroll.wheel_intent(45.0), Some(ScrollIntent::Step(1)));
    }

    #[test]
    fn test_swipe_thresholds() {
        let mut scroll = controller();

        scroll.touch_start(500.0, 0.0);
        assert_eq!(scroll.touch_end(400.0, 200.0), Some(ScrollIntent::Step(1)));

        scroll.touch_start(400.0, 0.0);
        assert_eq!(scroll.touch_end(500.0, 200.0), Some(ScrollIntent::Step(-1)));

        // Too slow
        scroll.touch_start(500.0, 0.0);
        assert_eq!(scroll.touch_end(300.0, 350.0), None);

        // Too short
        scroll.touch_start(500.0, 0.0);
        assert_eq!(scroll.touch_end(460.0, 100.0), None);

        // No start recorded
        assert_eq!(scroll.touch_end(100.0, 100.0), None);
    }

    #[test]
    fn test_settle_resyncs_index() {
        let mut scroll = controller();
        scroll.request(ScrollIntent::Step(1), 10, 0.0);
        assert!(scroll.scroll_in_flight(100.0));

        // Arrived at the target: the flight ends early
        assert_eq!(scroll.on_scroll_settled(1, 10, 300.0), None);
        assert!(!scroll.scroll_in_flight(300.0));

        // Native snapping moved on by itself
        assert_eq!(scroll.on_scroll_settled(3, 10, 400.0), Some(3));
        assert_eq!(scroll.current_index(), 3);
        assert_eq!(scroll.on_scroll_settled(3, 10, 500.0), None);
    }

    #[test]
    fn test_stale_settle_ignored_while_in_flight() {
        let mut scroll = controller();
        scroll.request(ScrollIntent::Step(1), 10, 0.0);

        // Paused short of the target inside the settle window
        assert_eq!(scroll.on_scroll_settled(0, 10, 200.0), None);
        assert_eq!(scroll.current_index(), 1);
        assert!(scroll.scroll_in_flight(200.0));

        // After the window the real position is adopted
        assert_eq!(scroll.on_scroll_settled(0, 10, 800.0), Some(0));
        assert_eq!(scroll.current_index(), 0);
    }
}
