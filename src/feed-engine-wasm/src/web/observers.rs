use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use super::timer::Debouncer;
use super::{Driver, JsResultExt};
use crate::error::FeedError;
use crate::now_ms;

/// Quiet period after the last scroll event before the position is final
const SETTLE_DEBOUNCE_MS: i32 = 150;

pub fn install(driver: &Driver) -> Result<(), FeedError> {
    install_visibility(driver)?;
    install_scroll(driver)
}

/// Slide visibility drives lazy embed loading
fn install_visibility(driver: &Driver) -> Result<(), FeedError> {
    let d = driver.clone();
    let callback = Closure::wrap(Box::new(move |entries: js_sys::Array, _observer: IntersectionObserver| {
        let seen: Vec<(String, f64)> = entries
            .iter()
            .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
            .map(|entry| (entry.target().id(), entry.intersection_ratio()))
            .filter(|(id, _)| !id.is_empty())
            .collect();

        d.run(|session| {
            seen.iter()
                .flat_map(|(id, ratio)| session.on_visibility(id, *ratio))
                .collect()
        });
    }) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

    let init = IntersectionObserverInit::new();
    js_sys::Reflect::set(&init, &JsValue::from_str("root"), driver.renderer().container()).or_dom()?;
    init.set_threshold(&JsValue::from_f64(driver.config().visibility_threshold));

    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init).or_dom()?;
    driver.renderer().set_observer(observer.clone());

    driver.on_teardown(move || {
        observer.disconnect();
        drop(callback);
    });
    Ok(())
}

/// Container scroll keeps the viewport current; a debounced settle resyncs
/// the index after native snapping
fn install_scroll(driver: &Driver) -> Result<(), FeedError> {
    let container = driver.renderer().container().clone();
    let settle = Debouncer::new(SETTLE_DEBOUNCE_MS);

    let d = driver.clone();
    let pending = settle.clone();
    driver.listen(&container, "scroll", false, true, move |_: Event| {
        let container = d.renderer().container();
        let (top, height) = (container.scroll_top() as f64, container.client_height() as f64);
        d.run(|s| s.on_viewport(top, height, now_ms()));

        let d = d.clone();
        pending.schedule(move || {
            let container = d.renderer().container();
            let (top, height) = (container.scroll_top() as f64, container.client_height() as f64);
            d.run(|s| s.on_scroll_settled(top, height, now_ms()));
        });
    })?;

    let window = web_sys::window().ok_or_else(|| FeedError::Dom("no window".to_string()))?;
    let d = driver.clone();
    driver.listen(&window, "resize", false, true, move |_: Event| d.sync_viewport())?;

    driver.on_teardown(move || settle.cancel());
    Ok(())
}
