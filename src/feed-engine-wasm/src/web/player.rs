use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, HtmlIFrameElement, MessageEvent};

use super::render::{EMBED_CLASS, SLIDE_CLASS};
use super::Driver;
use crate::error::FeedError;
use crate::now_ms;
use crate::playback::{parse_player_message, PlayerEvent, PlayerEventPort};

const PLAYER_ORIGINS: [&str; 2] = ["youtube.com", "youtube-nocookie.com"];

/// Player events delivered through `window.postMessage`
pub struct PostMessagePort {
    driver: Driver,
}

impl PostMessagePort {
    pub fn new(driver: &Driver) -> Self {
        Self { driver: driver.clone() }
    }

    /// Slide whose embed window sent the message
    fn slide_for_source(&self, source: &JsValue) -> Option<String> {
        let embeds = self
            .driver
            .renderer()
            .container()
            .query_selector_all(&format!(".{}", EMBED_CLASS))
            .ok()?;

        (0..embeds.length())
            .filter_map(|i| embeds.item(i))
            .filter_map(|node| node.dyn_into::<HtmlIFrameElement>().ok())
            .find(|iframe| {
                iframe
                    .content_window()
                    .map(|window| js_sys::Object::is(&window, source))
                    .unwrap_or(false)
            })
            .and_then(|iframe| iframe.closest(&format!(".{}", SLIDE_CLASS)).ok().flatten())
            .map(|slide| slide.id())
    }
}

impl PlayerEventPort for PostMessagePort {
    fn subscribe(&mut self, mut on_event: Box<dyn FnMut(PlayerEvent)>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let port = PostMessagePort::new(&self.driver);
        let result = self.driver.listen(&window, "message", false, true, move |event: MessageEvent| {
            let origin = event.origin();
            if !PLAYER_ORIGINS.iter().any(|host| origin.contains(host)) {
                return;
            }
            let Some(data) = event.data().as_string() else {
                return;
            };
            let Some(state) = parse_player_message(&data) else {
                return;
            };
            let slide_id = event
                .source()
                .and_then(|source| port.slide_for_source(&JsValue::from(source)));
            on_event(PlayerEvent { slide_id, state });
        });

        if let Err(e) = result {
            log::warn!("Player messages unavailable, auto-advance disabled: {}", e);
        }
    }
}

/// Ask each embed to report state changes once it has loaded
fn install_handshake(driver: &Driver) -> Result<(), FeedError> {
    let container = driver.renderer().container().clone();
    driver.listen(&container, "load", true, true, move |event: Event| {
        let Some(iframe) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlIFrameElement>().ok())
        else {
            return;
        };
        if iframe.get_attribute("src").map_or(true, |src| !src.starts_with("http")) {
            return;
        }
        let slide_id = iframe
            .closest(&format!(".{}", SLIDE_CLASS))
            .ok()
            .flatten()
            .map(|slide: Element| slide.id())
            .unwrap_or_default();

        let message = serde_json::json!({
            "event": "listening",
            "id": slide_id,
            "channel": "widget",
        })
        .to_string();

        if let Some(window) = iframe.content_window() {
            if let Err(e) = window.post_message(&JsValue::from_str(&message), "*") {
                log::debug!("Handshake with {} failed: {:?}", slide_id, e);
            }
        }
    })
}

pub fn install(driver: &Driver) -> Result<(), FeedError> {
    install_handshake(driver)?;

    let d = driver.clone();
    let mut port = PostMessagePort::new(driver);
    port.subscribe(Box::new(move |event| {
        d.run(|s| s.on_player_event(event, now_ms()));
    }));
    Ok(())
}
