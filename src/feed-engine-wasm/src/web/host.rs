//! Host page integration: waiting for the feed container, binding host
//! buttons to our panels and keeping injected controls alive across host
//! re-renders.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, MutationObserver, MutationObserverInit, MutationRecord,
    Node,
};

use super::render::ACTION_ATTR;
use super::timer::{self, Debouncer};
use super::{Driver, JsResultExt};
use crate::binder::{role_for_label, BindingRegistry, HostAdapter, HostRole};
use crate::error::FeedError;
use crate::readiness::{wait_until, Backoff, CancelToken, ReadinessError};
use crate::types::Panel;

const BOUND_ATTR: &str = "data-movieshows-bound";
const BOUND_SELECTOR: &str = "[data-movieshows-bound]";
/// Elements we create outside the feed container
const OWN_SELECTOR: &str = ".movieshows-panel, [id^=\"movieshows-\"]";
const HOST_BUTTONS: &str = "button, [role=\"button\"]";
const MUTATION_DEBOUNCE_MS: i32 = 200;
const HOT_PICKS_HEADING: &str = "hot picks";
const HOT_PICKS_Z_INDEX: &str = "50";

/// The host renders its feed container late; give it up to ~30s
const CONTAINER_BACKOFF: Backoff = Backoff {
    initial_ms: 50.0,
    factor: 2.0,
    max_ms: 2000.0,
    max_attempts: 20,
};

pub async fn wait_for_container(
    document: &Document,
    selector: &str,
    cancel: &CancelToken,
) -> Result<HtmlElement, FeedError> {
    let find = || {
        document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    };

    let attempts = wait_until(|| find().is_some(), CONTAINER_BACKOFF, cancel, timer::sleep).await?;
    log::debug!("Container {} ready after {} retries", selector, attempts);
    find().ok_or(FeedError::NotReady(ReadinessError::TimedOut(attempts)))
}

/// Host DOM seen through the binder's adapter
pub struct DomHost {
    document: Document,
}

impl DomHost {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn is_ours(element: &Element) -> bool {
        element.has_attribute(ACTION_ATTR) || element.id().starts_with("movieshows-")
    }

    fn label(element: &Element) -> String {
        let text = element.text_content().unwrap_or_default();
        match element.get_attribute("aria-label") {
            Some(aria) => format!("{} {}", text, aria),
            None => text,
        }
    }
}

impl HostAdapter for DomHost {
    type Handle = Element;

    fn find_button_by_role(&self, role: HostRole) -> Option<Element> {
        let buttons = self.document.query_selector_all(HOST_BUTTONS).ok()?;
        (0..buttons.length())
            .filter_map(|i| buttons.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter(|element| !Self::is_ours(element))
            .find(|element| role_for_label(&Self::label(element)) == Some(role))
    }

    fn is_bound(&self, handle: &Element) -> bool {
        handle.has_attribute(BOUND_ATTR)
    }

    fn mark_bound(&self, handle: &Element, role: HostRole) {
        let _ = handle.set_attribute(BOUND_ATTR, role.as_str());
    }

    fn has_element(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }
}

fn panel_for(role: HostRole) -> Panel {
    match role {
        HostRole::Search => Panel::Search,
        HostRole::Filter => Panel::Filter,
        HostRole::Queue => Panel::Queue,
    }
}

/// One idempotent pass; returns whether every host button was found.
/// Binding only tags the element; the delegated click listener does the rest.
fn bind_pass(driver: &Driver, registry: &RefCell<BindingRegistry>) -> bool {
    let host = DomHost::new(driver.renderer().document().clone());

    let report = registry
        .borrow_mut()
        .bind_pass(&host, |role, _| log::debug!("Binding host {} button", role.as_str()));
    if !report.bound.is_empty() {
        log::debug!("Bound host buttons: {:?}", report.bound);
    }

    let missing = registry.borrow().missing_controls(&host);
    if !missing.is_empty() {
        for control in &missing {
            if let Err(e) = driver.renderer().inject_control(*control) {
                log::warn!("Failed to inject {}: {}", control.element_id(), e);
            }
        }
        // Fresh controls start blank; replay the current settings onto them
        if let Some(operations) = driver.with_session(|s| s.initial_operations()) {
            driver.apply(&operations);
        }
    }

    fix_hot_picks(driver.renderer().document());
    report.missing.is_empty()
}

/// Lift the host's "Hot Picks" overlay above the feed
fn fix_hot_picks(document: &Document) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(headings) = document.query_selector_all("h3") else {
        return;
    };

    let heading = (0..headings.length())
        .filter_map(|i| headings.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .find(|h3| {
            crate::binder::normalize_label(&h3.text_content().unwrap_or_default()).contains(HOT_PICKS_HEADING)
        });
    let Some(heading) = heading else {
        return;
    };

    let mut current = heading.parent_element();
    while let Some(element) = current {
        let position = window
            .get_computed_style(&element)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("position").ok())
            .unwrap_or_default();
        if position == "absolute" {
            if let Some(html) = element.dyn_ref::<HtmlElement>() {
                if html.style().get_property_value("z-index").ok().as_deref() != Some(HOT_PICKS_Z_INDEX) {
                    let _ = html.style().set_property("z-index", HOT_PICKS_Z_INDEX);
                    log::debug!("Raised Hot Picks container");
                }
            }
            return;
        }
        current = element.parent_element();
    }
    log::debug!("Hot Picks heading has no absolutely positioned ancestor");
}

/// Panel behind a click on a tagged host button
fn bound_panel(event: &Event) -> Option<Panel> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let button = target.closest(BOUND_SELECTOR).ok().flatten()?;
    let role = HostRole::parse(&button.get_attribute(BOUND_ATTR)?)?;
    Some(panel_for(role))
}

/// Whether a mutation only touches the feed or our own elements
fn is_own_mutation(container: &Element, record: &MutationRecord) -> bool {
    let is_ours = |node: &Node| {
        if container.contains(Some(node)) {
            return true;
        }
        let element = match node.dyn_ref::<Element>() {
            Some(element) => Some(element.clone()),
            None => node.parent_element(),
        };
        element
            .and_then(|element| element.closest(OWN_SELECTOR).ok().flatten())
            .is_some()
    };

    let target = js_sys::Reflect::get(record, &JsValue::from_str("target"))
        .ok()
        .and_then(|target| target.dyn_into::<Node>().ok());
    if target.map_or(false, |target| is_ours(&target)) {
        return true;
    }
    let changed: Vec<Node> = [record.added_nodes(), record.removed_nodes()]
        .iter()
        .flat_map(|nodes| (0..nodes.length()).filter_map(move |i| nodes.item(i)))
        .collect();
    !changed.is_empty() && changed.iter().all(is_ours)
}

pub fn install(driver: &Driver) -> Result<(), FeedError> {
    let registry = Rc::new(RefCell::new(BindingRegistry::new()));

    // One delegated listener serves every host button, however often the
    // host re-renders them
    let document: EventTarget = driver.renderer().document().clone().into();
    let d = driver.clone();
    driver.listen(&document, "click", true, false, move |event: Event| {
        if let Some(panel) = bound_panel(&event) {
            event.prevent_default();
            event.stop_propagation();
            d.run(|s| s.toggle_panel(panel));
        }
    })?;

    // Timed passes until every host button is bound or the backoff runs out
    let d = driver.clone();
    let passes = Rc::clone(&registry);
    let cancel = driver.cancel_token().clone();
    wasm_bindgen_futures::spawn_local(async move {
        match wait_until(|| bind_pass(&d, &passes), Backoff::default(), &cancel, timer::sleep).await {
            Ok(retries) => log::debug!("Host bound after {} retries", retries),
            Err(e) => log::info!("Host binding incomplete: {}", e),
        }
    });

    // Host re-renders wipe our bindings and controls; rebind when it settles
    let debounce = Debouncer::new(MUTATION_DEBOUNCE_MS);
    let d = driver.clone();
    let pending = debounce.clone();
    let container: Element = driver.renderer().container().clone().into();
    let callback = Closure::wrap(Box::new(move |records: js_sys::Array, _observer: MutationObserver| {
        let host_changed = records
            .iter()
            .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
            .any(|record| !is_own_mutation(&container, &record));
        if !host_changed {
            return;
        }

        let d = d.clone();
        let registry = Rc::clone(&registry);
        pending.schedule(move || {
            bind_pass(&d, &registry);
        });
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).or_dom()?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    let body = driver
        .renderer()
        .document()
        .body()
        .ok_or_else(|| FeedError::Dom("document has no body".to_string()))?;
    observer.observe_with_options(&body, &init).or_dom()?;

    driver.on_teardown(move || {
        observer.disconnect();
        debounce.cancel();
        drop(callback);
    });
    Ok(())
}

