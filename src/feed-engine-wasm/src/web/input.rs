use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlInputElement, HtmlSelectElement, KeyboardEvent, TouchEvent, WheelEvent};

use super::render::{ACTION_ATTR, SEARCH_INPUT_ID, SETTING_ATTR};
use super::timer::Debouncer;
use super::Driver;
use crate::error::FeedError;
use crate::now_ms;
use crate::session::InputOutcome;
use crate::slide::SlideAction;
use crate::types::{CategoryFilter, FeedOperation, Panel, PlayerSize, TextLayout};

/// Wheel, keyboard, touch, click delegation and the search box
pub fn install(driver: &Driver) -> Result<(), FeedError> {
    let window = web_sys::window().ok_or_else(|| FeedError::Dom("no window".to_string()))?;
    let document = driver.renderer().document().clone();
    let container = driver.renderer().container().clone();

    // Window-level capture so the host's own wheel handlers never see a
    // gesture we consumed
    let d = driver.clone();
    driver.listen(&window, "wheel", true, false, move |event: WheelEvent| {
        let ignored = d.is_ignored(event.target());
        let outcome = d.with_session(|s| s.handle_wheel(event.delta_y(), ignored, now_ms()));
        finish(&d, &event, outcome);
    })?;

    let d = driver.clone();
    driver.listen(&document, "keydown", false, false, move |event: KeyboardEvent| {
        if event.ctrl_key() || event.meta_key() || event.alt_key() {
            return;
        }
        let key = event.key();
        if key == "Escape" {
            d.run(|s| s.close_all_panels());
            return;
        }
        let ignored = d.is_ignored(event.target());
        let outcome = d.with_session(|s| s.handle_key(&key, ignored, now_ms()));
        finish(&d, &event, outcome);
    })?;

    let d = driver.clone();
    driver.listen(&container, "touchstart", false, true, move |event: TouchEvent| {
        if let Some(touch) = event.changed_touches().get(0) {
            let y = touch.client_y() as f64;
            d.with_session(|s| s.touch_start(y, now_ms()));
        }
    })?;

    let d = driver.clone();
    driver.listen(&container, "touchend", false, false, move |event: TouchEvent| {
        let Some(touch) = event.changed_touches().get(0) else {
            return;
        };
        let y = touch.client_y() as f64;
        let ignored = d.is_ignored(event.target());
        let outcome = d.with_session(|s| s.touch_end(y, ignored, now_ms()));
        finish(&d, &event, outcome);
    })?;

    let d = driver.clone();
    driver.listen(&document, "click", false, false, move |event: Event| {
        let Some(target) = closest(&event, &format!("[{}]", ACTION_ATTR)) else {
            return;
        };
        if let Some(operations) = d.with_session(|s| on_action(s, &target)) {
            event.prevent_default();
            d.apply(&operations);
            if target.get_attribute(ACTION_ATTR).as_deref() == Some("filter") {
                let filter = d.with_session(|s| s.filter()).unwrap_or_default();
                d.renderer().mark_filter(filter);
            }
        }
    })?;

    let d = driver.clone();
    driver.listen(&document, "change", false, true, move |event: Event| {
        let Some(select) = closest(&event, &format!("[{}]", SETTING_ATTR))
            .and_then(|element| element.dyn_into::<HtmlSelectElement>().ok())
        else {
            return;
        };
        let value = select.value();
        match select.get_attribute(SETTING_ATTR).as_deref() {
            Some("player-size") => {
                if let Some(size) = PlayerSize::parse(&value) {
                    d.run(|s| s.set_player_size(size));
                }
            }
            Some("text-layout") => {
                if let Some(layout) = TextLayout::parse(&value) {
                    d.run(|s| s.set_text_layout(layout));
                }
            }
            _ => {}
        }
    })?;

    install_search_box(driver)
}

fn install_search_box(driver: &Driver) -> Result<(), FeedError> {
    let Some(input) = driver
        .renderer()
        .document()
        .get_element_by_id(SEARCH_INPUT_ID)
        .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
    else {
        log::warn!("Search input missing, typing will not search");
        return Ok(());
    };

    let debounce = Debouncer::new(driver.config().search_debounce_ms);
    let d = driver.clone();
    let field = input.clone();
    let pending = debounce.clone();
    driver.listen(&input, "input", false, true, move |_: Event| {
        let d = d.clone();
        let field = field.clone();
        pending.schedule(move || {
            let query = field.value();
            d.run(|s| s.search(&query));
        });
    })?;

    driver.on_teardown(move || debounce.cancel());
    Ok(())
}

/// Swallow the native event when the session consumed it
fn finish(driver: &Driver, event: &Event, outcome: Option<InputOutcome>) {
    let Some(outcome) = outcome else {
        return;
    };
    if outcome.handled {
        event.prevent_default();
        event.stop_propagation();
    }
    driver.apply(&outcome.operations);
}

fn closest(event: &Event, selector: &str) -> Option<Element> {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|element| element.closest(selector).ok().flatten())
}

fn index_attr(element: &Element) -> Option<usize> {
    element.get_attribute("data-index")?.parse().ok()
}

fn panel_attr(element: &Element) -> Option<Panel> {
    Panel::parse(&element.get_attribute("data-panel")?)
}

/// Map a clicked `data-movieshows-action` element to a session call
fn on_action(session: &mut crate::session::FeedSession, target: &Element) -> Vec<FeedOperation> {
    let now = now_ms();
    let Some(action) = target.get_attribute(ACTION_ATTR) else {
        return Vec::new();
    };

    match action.as_str() {
        "slide" => {
            let slide_id = target.get_attribute("data-slide-id");
            let slide_action = target
                .get_attribute("data-action")
                .and_then(|a| SlideAction::parse(&a));
            match (slide_id, slide_action) {
                (Some(id), Some(a)) => session.slide_action(&id, a, now),
                _ => Vec::new(),
            }
        }
        "search-result" => match target.get_attribute("data-title") {
            Some(title) => session.select_search_result(&title, now),
            None => Vec::new(),
        },
        "filter" => {
            let filter = target
                .get_attribute("data-filter")
                .map(|f| CategoryFilter::parse(&f))
                .unwrap_or_default();
            session.set_filter(filter)
        }
        "queue-play" => index_attr(target).map_or_else(Vec::new, |i| session.queue_play(i, now)),
        "queue-remove" => index_attr(target).map_or_else(Vec::new, |i| session.queue_remove(i)),
        "queue-clear" => session.queue_clear(),
        "open-panel" => panel_attr(target).map_or_else(Vec::new, |p| session.toggle_panel(p)),
        "close-panel" => panel_attr(target).map_or_else(Vec::new, |p| session.close_panel(p)),
        "mute" => session.toggle_mute(),
        other => {
            log::debug!("Unknown action {}", other);
            Vec::new()
        }
    }
}
