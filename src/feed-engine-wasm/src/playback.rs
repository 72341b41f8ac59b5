use crate::embed;
use crate::feed::Feed;
use crate::types::{EmbedSlot, FeedOperation};

/// Player state as reported by the video host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Unknown(i64),
}

impl PlayerState {
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => PlayerState::Unstarted,
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            other => PlayerState::Unknown(other),
        }
    }
}

/// A state change, attributed to a slide when the channel can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEvent {
    pub slide_id: Option<String>,
    pub state: PlayerState,
}

/// Source of player state changes, decoupled from the message channel
pub trait PlayerEventPort {
    fn subscribe(&mut self, on_event: Box<dyn FnMut(PlayerEvent)>);
}

/// Decode a cross-frame message from the embedded player.
///
/// Understands the `onStateChange` event and the `infoDelivery` envelope
/// carrying `info.playerState`; anything else is ignored.
pub fn parse_player_message(data: &str) -> Option<PlayerState> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    match value.get("event")?.as_str()? {
        "onStateChange" => value.get("info")?.as_i64().map(PlayerState::from_code),
        "infoDelivery" => value
            .get("info")?
            .get("playerState")?
            .as_i64()
            .map(PlayerState::from_code),
        _ => None,
    }
}

/// Counts of embed slots across the feed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    pub deferred: usize,
    pub loaded: usize,
    pub unloaded: usize,
}

/// Visibility-driven loading and unloading of slide embeds
#[derive(Debug, Clone)]
pub struct PlaybackController {
    threshold: f64,
    auto_next: bool,
    force_mute: bool,
}

impl PlaybackController {
    pub fn new(threshold: f64, auto_next: bool, force_initial_mute: bool) -> Self {
        Self {
            threshold,
            auto_next,
            force_mute: force_initial_mute,
        }
    }

    /// Mute value to put into a freshly resolved embed URL
    #[inline]
    pub fn effective_mute(&self, muted: bool) -> bool {
        muted || self.force_mute
    }

    /// The first user gesture lifts the autoplay mute override
    pub fn release_forced_mute(&mut self) -> bool {
        std::mem::replace(&mut self.force_mute, false)
    }

    pub fn set_auto_next(&mut self, enabled: bool) {
        self.auto_next = enabled;
    }

    /// React to an intersection change of one slide
    pub fn on_visibility(
        &self,
        feed: &mut Feed,
        slide_id: &str,
        ratio: f64,
        muted: bool,
    ) -> Option<FeedOperation> {
        let index = feed.position_of_id(slide_id)?;
        if ratio >= self.threshold {
            self.load(feed, index, muted)
        } else {
            Self::unload(feed, index)
        }
    }

    /// Resolve the embed source of a slide, mute injected now
    pub fn load(&self, feed: &mut Feed, index: usize, muted: bool) -> Option<FeedOperation> {
        let mute = self.effective_mute(muted);
        let slide = feed.get_mut(index)?;
        if slide.embed == EmbedSlot::Loaded {
            return None;
        }

        let src = embed::embed_url(&slide.video_id, mute);
        slide.embed = EmbedSlot::Loaded;
        slide.src = Some(src.clone());

        Some(FeedOperation::LoadEmbed {
            slide_id: slide.id.clone(),
            src,
        })
    }

    fn unload(feed: &mut Feed, index: usize) -> Option<FeedOperation> {
        let slide = feed.get_mut(index)?;
        if slide.embed != EmbedSlot::Loaded {
            return None;
        }

        slide.embed = EmbedSlot::Unloaded;
        slide.src = None;

        Some(FeedOperation::UnloadEmbed {
            slide_id: slide.id.clone(),
        })
    }

    /// Patch already-loaded embeds after a mute toggle
    pub fn rewrite_for_mute(&self, feed: &mut Feed, muted: bool) -> Vec<FeedOperation> {
        let mute = self.effective_mute(muted);
        let mut operations = Vec::new();

        for index in 0..feed.len() {
            let Some(slide) = feed.get_mut(index) else {
                continue;
            };
            let Some(current) = slide.src.as_deref() else {
                continue;
            };
            if slide.embed != EmbedSlot::Loaded {
                continue;
            }

            let src = embed::with_mute(current, mute);
            if src != current {
                slide.src = Some(src.clone());
                operations.push(FeedOperation::RewriteEmbed {
                    slide_id: slide.id.clone(),
                    src,
                });
            }
        }

        operations
    }

    /// Whether a state change should advance the feed
    #[inline]
    pub fn should_advance(&self, state: PlayerState) -> bool {
        self.auto_next && state == PlayerState::Ended
    }

    pub fn stats(&self, feed: &Feed) -> PlaybackStats {
        let mut stats = PlaybackStats::default();
        for slide in feed.slides() {
            match slide.embed {
                EmbedSlot::Deferred => stats.deferred += 1,
                EmbedSlot::Loaded => stats.loaded += 1,
                EmbedSlot::Unloaded => stats.unloaded += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentItem;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn feed_of(count: usize) -> Feed {
        let mut feed = Feed::new();
        for i in 0..count {
            let item = ContentItem {
                title: format!("Title {}", i),
                trailer_url: Some(format!("https://youtu.be/video{:04}", i)),
                ..Default::default()
            };
            feed.push(&item, false, true);
        }
        feed
    }

    /// Port driven by hand from the test body
    #[derive(Default)]
    struct ManualPort {
        listeners: Vec<Box<dyn FnMut(PlayerEvent)>>,
    }

    impl ManualPort {
        fn emit(&mut self, state: PlayerState) {
            for listener in &mut self.listeners {
                listener(PlayerEvent {
                    slide_id: None,
                    state,
                });
            }
        }
    }

    impl PlayerEventPort for ManualPort {
        fn subscribe(&mut self, on_event: Box<dyn FnMut(PlayerEvent)>) {
            self.listeners.push(on_event);
        }
    }

    #[test]
    fn test_visibility_loads_and_unloads() {
        let mut feed = feed_of(3);
        let playback = PlaybackController::new(0.5, true, false);

        let load = playback.on_visibility(&mut feed, "slide-1", 0.75, false).unwrap();
        assert!(matches!(
            load,
            FeedOperation::LoadEmbed { ref src, .. } if src.contains("video0001") && src.contains("mute=0")
        ));
        assert!(playback.on_visibility(&mut feed, "slide-1", 0.9, false).is_none());

        let unload = playback.on_visibility(&mut feed, "slide-1", 0.2, false).unwrap();
        assert_eq!(
            unload,
            FeedOperation::UnloadEmbed {
                slide_id: "slide-1".to_string()
            }
        );
        assert!(playback.on_visibility(&mut feed, "slide-2", 0.1, false).is_none());
        assert!(playback.on_visibility(&mut feed, "missing", 1.0, false).is_none());

        let stats = playback.stats(&feed);
        assert_eq!(stats.unloaded, 1);
        assert_eq!(stats.deferred, 2);
    }

    #[test]
    fn test_forced_initial_mute() {
        let mut feed = feed_of(1);
        let mut playback = PlaybackController::new(0.5, true, true);

        let op = playback.load(&mut feed, 0, false).unwrap();
        assert!(matches!(op, FeedOperation::LoadEmbed { ref src, .. } if src.contains("mute=1")));

        assert!(playback.release_forced_mute());
        assert!(!playback.release_forced_mute());
        let rewrites = playback.rewrite_for_mute(&mut feed, false);
        assert_eq!(rewrites.len(), 1);
        assert!(matches!(&rewrites[0], FeedOperation::RewriteEmbed { src, .. } if src.contains("mute=0")));
    }

    #[test]
    fn test_rewrite_skips_unloaded() {
        let mut feed = feed_of(2);
        let playback = PlaybackController::new(0.5, true, false);
        playback.load(&mut feed, 0, true);

        let rewrites = playback.rewrite_for_mute(&mut feed, false);
        assert_eq!(rewrites.len(), 1);
        assert!(playback.rewrite_for_mute(&mut feed, false).is_empty());
    }

    #[test]
    fn test_parse_player_message() {
        assert_eq!(
            parse_player_message(r#"{"event":"onStateChange","info":0}"#),
            Some(PlayerState::Ended)
        );
        assert_eq!(
            parse_player_message(r#"{"event":"infoDelivery","info":{"playerState":1,"currentTime":3}}"#),
            Some(PlayerState::Playing)
        );
        assert_eq!(
            parse_player_message(r#"{"event":"infoDelivery","info":{"currentTime":3}}"#),
            None
        );
        assert_eq!(parse_player_message("not json"), None);
        assert_eq!(parse_player_message(r#"{"event":"onReady"}"#), None);
    }

    #[test]
    fn test_port_drives_auto_next() {
        let playback = PlaybackController::new(0.5, true, false);
        let advances = Rc::new(RefCell::new(0));

        let mut port = ManualPort::default();
        let counter = Rc::clone(&advances);
        port.subscribe(Box::new(move |event| {
            if playback.should_advance(event.state) {
                *counter.borrow_mut() += 1;
            }
        }));

        port.emit(PlayerState::Playing);
        port.emit(PlayerState::Ended);
        assert_eq!(*advances.borrow(), 1);
    }
}
