//! Browser driver: mounts the session onto the host page and applies its
//! operations to the DOM.

mod fetch;
mod host;
mod input;
mod observers;
mod player;
mod render;
pub mod storage;
mod timer;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Element, EventTarget};

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::now_ms;
use crate::readiness::{wait_until_async, Backoff, CancelToken, ReadinessError};
use crate::session::FeedSession;
use crate::store::cache_busted_url;
use crate::types::FeedOperation;

use render::Renderer;

pub(crate) trait JsResultExt<T> {
    fn or_dom(self) -> Result<T, FeedError>;
}

impl<T> JsResultExt<T> for Result<T, JsValue> {
    fn or_dom(self) -> Result<T, FeedError> {
        self.map_err(|e| FeedError::dom(&e))
    }
}

type Teardown = Box<dyn FnOnce()>;

/// Retry schedule for the content document, about 40s in total
const CONTENT_BACKOFF: Backoff = Backoff {
    initial_ms: 500.0,
    factor: 2.0,
    max_ms: 8000.0,
    max_attempts: 8,
};

/// Handle shared by every listener and observer callback
#[derive(Clone)]
pub struct Driver {
    session: Rc<RefCell<FeedSession>>,
    renderer: Rc<Renderer>,
    config: Rc<FeedConfig>,
    cancel: CancelToken,
    teardown: Rc<RefCell<Vec<Teardown>>>,
}

impl Driver {
    /// Wait for the host container, install listeners and observers, then
    /// fetch the content document
    pub async fn mount(session: Rc<RefCell<FeedSession>>) -> Result<Driver, FeedError> {
        let config = session.borrow().config().clone();
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| FeedError::Dom("no document".to_string()))?;

        let cancel = CancelToken::new();
        let container = host::wait_for_container(&document, &config.container_selector, &cancel).await?;
        log::info!("Feed container found, mounting");

        let driver = Driver {
            renderer: Rc::new(Renderer::new(document, container)?),
            session,
            config: Rc::new(config),
            cancel,
            teardown: Rc::new(RefCell::new(Vec::new())),
        };

        observers::install(&driver)?;
        input::install(&driver)?;
        player::install(&driver)?;
        host::install(&driver)?;

        let initial = driver.session.borrow().initial_operations();
        driver.apply(&initial);
        driver.sync_viewport();

        let loader = driver.clone();
        wasm_bindgen_futures::spawn_local(async move { loader.load_content().await });

        Ok(driver)
    }

    /// Fetch the content document until the store is populated, the backoff
    /// runs out or the driver shuts down
    async fn load_content(&self) {
        let result = wait_until_async(
            || self.try_load_content(),
            CONTENT_BACKOFF,
            &self.cancel,
            timer::sleep,
        )
        .await;

        match result {
            Ok(0) => {}
            Ok(retries) => log::info!("Content document loaded after {} retries", retries),
            Err(ReadinessError::Cancelled) => log::debug!("Content load cancelled"),
            Err(e) => log::error!(
                "Content document unavailable after {:.0}s, feed stays empty: {}",
                CONTENT_BACKOFF.total_ms() / 1000.0,
                e
            ),
        }
    }

    /// One fetch attempt; true once the store holds the catalog
    async fn try_load_content(&self) -> bool {
        if self.is_loaded() {
            return true;
        }

        let url = cache_busted_url(&self.config.content_url, now_ms());
        let text = match fetch::fetch_text(&url).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Content document fetch failed: {}", e);
                return false;
            }
        };

        match self.with_session(|session| session.load_content(&text)) {
            Some(Ok(operations)) => self.apply(&operations),
            Some(Err(e)) => log::warn!("Content document unreadable: {}", e),
            None => {}
        }
        self.is_loaded()
    }

    fn is_loaded(&self) -> bool {
        self.with_session(|session| session.store().is_loaded())
            .unwrap_or(false)
    }

    pub fn apply(&self, operations: &[FeedOperation]) {
        self.renderer.apply(operations);
    }

    pub(crate) fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub(crate) fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub(crate) fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Borrow the session for one handler. A nested call (an event fired
    /// synchronously from inside another handler) is dropped.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut FeedSession) -> R) -> Option<R> {
        match self.session.try_borrow_mut() {
            Ok(mut session) => Some(f(&mut session)),
            Err(_) => {
                log::debug!("Session busy, dropping nested event");
                None
            }
        }
    }

    /// Run a session call and apply what it produced
    pub(crate) fn run(&self, f: impl FnOnce(&mut FeedSession) -> Vec<FeedOperation>) {
        if let Some(operations) = self.with_session(f) {
            self.apply(&operations);
        }
    }

    pub(crate) fn sync_viewport(&self) {
        let container = self.renderer.container();
        let scroll_top = container.scroll_top() as f64;
        let height = container.client_height() as f64;
        self.run(|session| session.on_viewport(scroll_top, height, now_ms()));
    }

    /// Whether an event target sits in a zone where native input wins
    pub(crate) fn is_ignored(&self, target: Option<EventTarget>) -> bool {
        target
            .and_then(|target| target.dyn_into::<Element>().ok())
            .and_then(|element| element.closest(&self.config.ignore_zone_selector).ok().flatten())
            .is_some()
    }

    pub(crate) fn on_teardown(&self, f: impl FnOnce() + 'static) {
        self.teardown.borrow_mut().push(Box::new(f));
    }

    /// Add an event listener that lives until `shutdown`.
    /// Passive listeners cannot cancel the event.
    pub(crate) fn listen<E>(
        &self,
        target: &EventTarget,
        event: &str,
        capture: bool,
        passive: bool,
        handler: impl FnMut(E) + 'static,
    ) -> Result<(), FeedError>
    where
        E: FromWasmAbi + 'static,
    {
        let options = AddEventListenerOptions::new();
        options.set_capture(capture);
        options.set_passive(passive);

        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                event,
                callback.as_ref().unchecked_ref(),
                &options,
            )
            .or_dom()?;

        let target = target.clone();
        let event = event.to_string();
        self.on_teardown(move || {
            let _ = target.remove_event_listener_with_callback_and_bool(
                &event,
                callback.as_ref().unchecked_ref(),
                capture,
            );
            drop(callback);
        });
        Ok(())
    }

    /// Remove every listener and observer and stop pending readiness waits
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let teardown: Vec<Teardown> = self.teardown.borrow_mut().drain(..).collect();
        for f in teardown {
            f();
        }
        log::info!("Feed driver shut down");
    }
}
