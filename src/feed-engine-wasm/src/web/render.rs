use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, HtmlSelectElement, IntersectionObserver, ScrollBehavior,
    ScrollToOptions,
};

use super::timer::Debouncer;
use super::JsResultExt;
use crate::binder::InjectedControl;
use crate::error::FeedError;
use crate::search::SearchResult;
use crate::slide::SlideModel;
use crate::types::{CategoryFilter, FeedOperation, Panel, PlayerSize, QueueEntry, TextLayout};

pub const SLIDE_CLASS: &str = "movieshows-slide";
pub const EMBED_CLASS: &str = "movieshows-embed";
pub const ACTION_ATTR: &str = "data-movieshows-action";
pub const SETTING_ATTR: &str = "data-movieshows-setting";
pub const SEARCH_INPUT_ID: &str = "movieshows-search-input";
const SEARCH_RESULTS_ID: &str = "movieshows-search-results";
const QUEUE_LIST_ID: &str = "movieshows-queue-list";
const CONTROLS_ID: &str = "movieshows-controls";
const TOAST_ID: &str = "movieshows-toast";
const STYLE_ID: &str = "movieshows-style";
const TOAST_MS: i32 = 2500;
const UNLOADED_SRC: &str = "about:blank";

const STYLESHEET: &str = r#"
.movieshows-slide { position: relative; height: 100%; width: 100%; scroll-snap-align: start; overflow: hidden; background: #000; }
.movieshows-player { position: absolute; inset: 0; margin: auto; width: 100%; height: 100%; }
.movieshows-embed { width: 100%; height: 100%; border: 0; }
body[data-movieshows-player-size="small"] .movieshows-player { width: 50%; height: 50%; }
body[data-movieshows-player-size="medium"] .movieshows-player { width: 70%; height: 70%; }
body[data-movieshows-player-size="large"] .movieshows-player { width: 85%; height: 85%; }
.movieshows-info { position: absolute; left: 0; right: 64px; bottom: 0; padding: 16px; color: #fff; background: linear-gradient(transparent, rgba(0,0,0,.8)); }
body[data-movieshows-text-layout="below"] .movieshows-info { position: static; background: #000; }
body[data-movieshows-text-layout="hidden"] .movieshows-info { display: none; }
.movieshows-badge, .movieshows-genre { display: inline-block; margin: 0 6px 6px 0; padding: 2px 8px; border-radius: 10px; background: rgba(255,255,255,.15); font-size: 12px; }
.movieshows-actions { position: absolute; right: 8px; bottom: 96px; display: flex; flex-direction: column; gap: 12px; }
.movieshows-actions button.active { color: #e50914; }
.movieshows-panel { position: fixed; top: 0; right: 0; bottom: 0; width: min(380px, 100vw); z-index: 10000; overflow-y: auto; background: #141414; color: #fff; transform: translateX(100%); transition: transform .25s ease; }
.movieshows-panel.open { transform: translateX(0); }
.movieshows-panel li { cursor: pointer; padding: 8px 12px; list-style: none; }
.movieshows-panel li.unplayable { opacity: .5; }
.movieshows-filter.active { background: #e50914; }
#movieshows-controls { position: fixed; top: 12px; right: 12px; z-index: 9999; display: flex; gap: 8px; }
#movieshows-toast { position: fixed; left: 50%; bottom: 32px; transform: translateX(-50%); z-index: 10001; padding: 8px 16px; border-radius: 6px; background: rgba(0,0,0,.85); color: #fff; opacity: 0; transition: opacity .2s; pointer-events: none; }
#movieshows-toast.visible { opacity: 1; }
"#;

/// Applies feed operations to the page
pub struct Renderer {
    document: Document,
    container: HtmlElement,
    observer: RefCell<Option<IntersectionObserver>>,
    toast_timer: Rc<Debouncer>,
}

impl Renderer {
    pub fn new(document: Document, container: HtmlElement) -> Result<Self, FeedError> {
        let renderer = Self {
            document,
            container,
            observer: RefCell::new(None),
            toast_timer: Debouncer::new(TOAST_MS),
        };
        renderer.ensure_style()?;
        renderer.ensure_panels()?;
        renderer.ensure_toast()?;
        Ok(renderer)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }

    /// Watch every slide, current and future, with `observer`
    pub fn set_observer(&self, observer: IntersectionObserver) {
        if let Ok(slides) = self.container.query_selector_all(&format!(".{}", SLIDE_CLASS)) {
            for i in 0..slides.length() {
                if let Some(slide) = slides.item(i).and_then(|node| node.dyn_into::<Element>().ok()) {
                    observer.observe(&slide);
                }
            }
        }
        *self.observer.borrow_mut() = Some(observer);
    }

    pub fn apply(&self, operations: &[FeedOperation]) {
        for operation in operations {
            if let Err(e) = self.apply_one(operation) {
                log::warn!("Skipping feed operation: {}", e);
            }
        }
    }

    fn apply_one(&self, operation: &FeedOperation) -> Result<(), FeedError> {
        match operation {
            FeedOperation::AppendSlide { slide } => {
                let element = self.build_slide(slide)?;
                self.container.append_child(&element).or_dom()?;
                if let Some(observer) = self.observer.borrow().as_ref() {
                    observer.observe(&element);
                }
            }
            FeedOperation::RemoveSlide { slide_id } => {
                if let Some(element) = self.document.get_element_by_id(slide_id) {
                    if let Some(observer) = self.observer.borrow().as_ref() {
                        observer.unobserve(&element);
                    }
                    element.remove();
                }
            }
            FeedOperation::ScrollTo { top, .. } => {
                let options = ScrollToOptions::new();
                options.set_top(*top);
                options.set_behavior(ScrollBehavior::Smooth);
                self.container.scroll_to_with_scroll_to_options(&options);
            }
            FeedOperation::LoadEmbed { slide_id, src } | FeedOperation::RewriteEmbed { slide_id, src } => {
                self.embed(slide_id)?.set_attribute("src", src).or_dom()?;
            }
            FeedOperation::UnloadEmbed { slide_id } => {
                self.embed(slide_id)?.set_attribute("src", UNLOADED_SRC).or_dom()?;
            }
            FeedOperation::ShowPanel { panel } => {
                self.panel(*panel)?.class_list().add_1("open").or_dom()?;
                if *panel == Panel::Search {
                    if let Some(input) = self.html_by_id(SEARCH_INPUT_ID) {
                        let _ = input.focus();
                    }
                }
            }
            FeedOperation::HidePanel { panel } => {
                self.panel(*panel)?.class_list().remove_1("open").or_dom()?;
            }
            FeedOperation::Notify { message } => self.notify(message)?,
            FeedOperation::ApplyMute { muted } => {
                if let Some(button) = self.document.get_element_by_id(InjectedControl::MuteButton.element_id()) {
                    button.set_text_content(Some(if *muted { "🔇 Muted" } else { "🔊 Sound on" }));
                    button
                        .set_attribute("aria-pressed", if *muted { "true" } else { "false" })
                        .or_dom()?;
                }
            }
            FeedOperation::ApplyPlayerSize { size } => {
                self.set_body_attribute("data-movieshows-player-size", size.as_str())?;
                self.set_select_value(InjectedControl::PlayerSize, size.as_str());
            }
            FeedOperation::ApplyTextLayout { layout } => {
                self.set_body_attribute("data-movieshows-text-layout", layout.as_str())?;
                self.set_select_value(InjectedControl::TextLayout, layout.as_str());
            }
            FeedOperation::RenderSearchResults { results } => self.render_search_results(results)?,
            FeedOperation::RenderQueue { entries } => self.render_queue(entries)?,
        }
        Ok(())
    }

    // ---- element helpers -------------------------------------------------

    fn element(&self, tag: &str, class: &str) -> Result<Element, FeedError> {
        let element = self.document.create_element(tag).or_dom()?;
        if !class.is_empty() {
            element.set_class_name(class);
        }
        Ok(element)
    }

    fn text_element(&self, tag: &str, class: &str, text: &str) -> Result<Element, FeedError> {
        let element = self.element(tag, class)?;
        element.set_text_content(Some(text));
        Ok(element)
    }

    fn html_by_id(&self, id: &str) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(id)
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }

    fn body(&self) -> Result<HtmlElement, FeedError> {
        self.document
            .body()
            .ok_or_else(|| FeedError::Dom("document has no body".to_string()))
    }

    fn set_body_attribute(&self, name: &str, value: &str) -> Result<(), FeedError> {
        self.body()?.set_attribute(name, value).or_dom()
    }

    fn set_select_value(&self, control: InjectedControl, value: &str) {
        if let Some(select) = self
            .document
            .get_element_by_id(control.element_id())
            .and_then(|element| element.dyn_into::<HtmlSelectElement>().ok())
        {
            select.set_value(value);
        }
    }

    fn embed(&self, slide_id: &str) -> Result<Element, FeedError> {
        self.document
            .get_element_by_id(slide_id)
            .and_then(|slide| slide.query_selector(&format!(".{}", EMBED_CLASS)).ok().flatten())
            .ok_or_else(|| FeedError::Dom(format!("no embed for {}", slide_id)))
    }

    fn panel(&self, panel: Panel) -> Result<Element, FeedError> {
        self.document
            .get_element_by_id(panel.element_id())
            .ok_or_else(|| FeedError::Dom(format!("panel {} missing", panel.element_id())))
    }

    // ---- slides ----------------------------------------------------------

    fn build_slide(&self, slide: &SlideModel) -> Result<Element, FeedError> {
        let root = self.element("section", SLIDE_CLASS)?;
        root.set_id(&slide.id);
        root.set_attribute("data-title", &slide.title).or_dom()?;
        root.set_attribute("data-video-id", &slide.video_id).or_dom()?;

        let player = self.element("div", "movieshows-player")?;
        let iframe = self.element("iframe", EMBED_CLASS)?;
        iframe
            .set_attribute("allow", "autoplay; encrypted-media; picture-in-picture")
            .or_dom()?;
        iframe.set_attribute("allowfullscreen", "").or_dom()?;
        iframe.set_attribute("title", &slide.title).or_dom()?;
        if let Some(src) = &slide.src {
            iframe.set_attribute("src", src).or_dom()?;
        }
        if let Some(deferred) = &slide.deferred_src {
            iframe.set_attribute("data-src", deferred).or_dom()?;
        }
        player.append_child(&iframe).or_dom()?;
        root.append_child(&player).or_dom()?;

        let info = self.element("div", "movieshows-info")?;
        let badges = self.element("div", "movieshows-badges")?;
        badges
            .append_child(&self.text_element("span", "movieshows-badge", &slide.rating_badge)?)
            .or_dom()?;
        for badge in [&slide.year_badge, &slide.source_badge].into_iter().flatten() {
            badges
                .append_child(&self.text_element("span", "movieshows-badge", badge)?)
                .or_dom()?;
        }
        if slide.now_playing {
            badges
                .append_child(&self.text_element("span", "movieshows-badge now-playing", "In Theatres")?)
                .or_dom()?;
        }
        info.append_child(&badges).or_dom()?;
        info.append_child(&self.text_element("h2", "movieshows-title", &slide.title)?)
            .or_dom()?;
        if !slide.description.is_empty() {
            info.append_child(&self.text_element("p", "movieshows-description", &slide.description)?)
                .or_dom()?;
        }
        let genres = self.element("div", "movieshows-genres")?;
        for genre in &slide.genres {
            genres
                .append_child(&self.text_element("span", "movieshows-genre", genre)?)
                .or_dom()?;
        }
        info.append_child(&genres).or_dom()?;
        root.append_child(&info).or_dom()?;

        let actions = self.element("div", "movieshows-actions")?;
        for action in slide.actions {
            let button = self.text_element("button", "", action.label())?;
            button.set_attribute(ACTION_ATTR, "slide").or_dom()?;
            button.set_attribute("data-slide-id", &slide.id).or_dom()?;
            button
                .set_attribute("data-action", action.as_str())
                .or_dom()?;
            actions.append_child(&button).or_dom()?;
        }
        root.append_child(&actions).or_dom()?;

        Ok(root)
    }

    // ---- panels ----------------------------------------------------------

    fn ensure_style(&self) -> Result<(), FeedError> {
        if self.document.get_element_by_id(STYLE_ID).is_some() {
            return Ok(());
        }
        let style = self.text_element("style", "", STYLESHEET)?;
        style.set_id(STYLE_ID);
        let head = self
            .document
            .head()
            .ok_or_else(|| FeedError::Dom("document has no head".to_string()))?;
        head.append_child(&style).or_dom()?;
        Ok(())
    }

    fn ensure_panels(&self) -> Result<(), FeedError> {
        let body = self.body()?;
        for panel in Panel::ALL {
            if self.document.get_element_by_id(panel.element_id()).is_some() {
                continue;
            }
            let aside = self.element("aside", "movieshows-panel")?;
            aside.set_id(panel.element_id());
            aside.set_attribute("data-panel", panel_name(panel)).or_dom()?;

            let header = self.element("header", "")?;
            header
                .append_child(&self.text_element("h3", "", panel_title(panel))?)
                .or_dom()?;
            let close = self.text_element("button", "", "✕")?;
            close.set_attribute(ACTION_ATTR, "close-panel").or_dom()?;
            close.set_attribute("data-panel", panel_name(panel)).or_dom()?;
            close.set_attribute("aria-label", "Close").or_dom()?;
            header.append_child(&close).or_dom()?;
            aside.append_child(&header).or_dom()?;

            match panel {
                Panel::Search => {
                    let input = self.element("input", "")?;
                    input.set_id(SEARCH_INPUT_ID);
                    input.set_attribute("type", "search").or_dom()?;
                    input.set_attribute("placeholder", "Search titles, genres…").or_dom()?;
                    aside.append_child(&input).or_dom()?;
                    let list = self.element("ul", "")?;
                    list.set_id(SEARCH_RESULTS_ID);
                    aside.append_child(&list).or_dom()?;
                }
                Panel::Filter => {
                    for filter in [
                        CategoryFilter::All,
                        CategoryFilter::Movies,
                        CategoryFilter::Tv,
                        CategoryFilter::NowPlaying,
                    ] {
                        let button = self.text_element("button", "movieshows-filter", filter_label(filter))?;
                        button.set_attribute(ACTION_ATTR, "filter").or_dom()?;
                        button.set_attribute("data-filter", filter_name(filter)).or_dom()?;
                        if filter == CategoryFilter::All {
                            button.class_list().add_1("active").or_dom()?;
                        }
                        aside.append_child(&button).or_dom()?;
                    }
                }
                Panel::Queue => {
                    let list = self.element("ul", "")?;
                    list.set_id(QUEUE_LIST_ID);
                    aside.append_child(&list).or_dom()?;
                    let clear = self.text_element("button", "", "Clear queue")?;
                    clear.set_attribute(ACTION_ATTR, "queue-clear").or_dom()?;
                    aside.append_child(&clear).or_dom()?;
                }
            }
            body.append_child(&aside).or_dom()?;
        }
        Ok(())
    }

    /// Highlight the active category button
    pub fn mark_filter(&self, filter: CategoryFilter) {
        let Ok(buttons) = self.document.query_selector_all(".movieshows-filter") else {
            return;
        };
        for i in 0..buttons.length() {
            if let Some(button) = buttons.item(i).and_then(|node| node.dyn_into::<Element>().ok()) {
                let active = button.get_attribute("data-filter").as_deref() == Some(filter_name(filter));
                let _ = button.class_list().toggle_with_force("active", active);
            }
        }
    }

    fn render_search_results(&self, results: &[SearchResult]) -> Result<(), FeedError> {
        let list = self
            .document
            .get_element_by_id(SEARCH_RESULTS_ID)
            .ok_or_else(|| FeedError::Dom("search results list missing".to_string()))?;
        list.set_inner_html("");

        if results.is_empty() {
            list.append_child(&self.text_element("li", "movieshows-empty", "No matches")?)
                .or_dom()?;
            return Ok(());
        }

        for result in results {
            let item = self.element("li", if result.playable { "" } else { "unplayable" })?;
            item.set_attribute(ACTION_ATTR, "search-result").or_dom()?;
            item.set_attribute("data-title", &result.title).or_dom()?;
            if let Some(poster) = &result.poster_url {
                let img = self.element("img", "")?;
                img.set_attribute("src", poster).or_dom()?;
                img.set_attribute("alt", "").or_dom()?;
                img.set_attribute("loading", "lazy").or_dom()?;
                item.append_child(&img).or_dom()?;
            }
            item.append_child(&self.text_element("span", "", &result.title)?)
                .or_dom()?;
            let meta = format!("{} · ★ {}", result.year, result.rating);
            item.append_child(&self.text_element("small", "", &meta)?).or_dom()?;
            list.append_child(&item).or_dom()?;
        }
        Ok(())
    }

    fn render_queue(&self, entries: &[QueueEntry]) -> Result<(), FeedError> {
        let list = self
            .document
            .get_element_by_id(QUEUE_LIST_ID)
            .ok_or_else(|| FeedError::Dom("queue list missing".to_string()))?;
        list.set_inner_html("");

        if entries.is_empty() {
            list.append_child(&self.text_element("li", "movieshows-empty", "Your queue is empty")?)
                .or_dom()?;
            return Ok(());
        }

        for (index, entry) in entries.iter().enumerate() {
            let index = index.to_string();
            let item = self.element("li", "")?;

            let label = if entry.year.is_empty() {
                entry.title.clone()
            } else {
                format!("{} ({})", entry.title, entry.year)
            };
            let play = self.text_element("span", "", &label)?;
            play.set_attribute(ACTION_ATTR, "queue-play").or_dom()?;
            play.set_attribute("data-index", &index).or_dom()?;
            item.append_child(&play).or_dom()?;

            let remove = self.text_element("button", "", "Remove")?;
            remove.set_attribute(ACTION_ATTR, "queue-remove").or_dom()?;
            remove.set_attribute("data-index", &index).or_dom()?;
            item.append_child(&remove).or_dom()?;

            list.append_child(&item).or_dom()?;
        }
        Ok(())
    }

    // ---- injected controls & toast ---------------------------------------

    /// Re-create a control the host wiped
    pub fn inject_control(&self, control: InjectedControl) -> Result<(), FeedError> {
        let bar = match self.document.get_element_by_id(CONTROLS_ID) {
            Some(bar) => bar,
            None => {
                let bar = self.element("div", "")?;
                bar.set_id(CONTROLS_ID);
                self.body()?.append_child(&bar).or_dom()?;
                bar
            }
        };

        let element = match control {
            InjectedControl::MuteButton => {
                let button = self.text_element("button", "", "🔇 Muted")?;
                button.set_attribute(ACTION_ATTR, "mute").or_dom()?;
                button
            }
            InjectedControl::PlayerSize => self.select(
                "player-size",
                &[PlayerSize::Small, PlayerSize::Medium, PlayerSize::Large, PlayerSize::Full]
                    .map(|size| size.as_str()),
            )?,
            InjectedControl::TextLayout => self.select(
                "text-layout",
                &[TextLayout::Overlay, TextLayout::Below, TextLayout::Hidden].map(|layout| layout.as_str()),
            )?,
        };
        element.set_id(control.element_id());
        bar.append_child(&element).or_dom()?;
        log::debug!("Injected control {}", control.element_id());
        Ok(())
    }

    fn select(&self, setting: &str, values: &[&str]) -> Result<Element, FeedError> {
        let select = self.element("select", "")?;
        select.set_attribute(SETTING_ATTR, setting).or_dom()?;
        for value in values {
            let option = self.text_element("option", "", value)?;
            option.set_attribute("value", value).or_dom()?;
            select.append_child(&option).or_dom()?;
        }
        Ok(select)
    }

    fn ensure_toast(&self) -> Result<(), FeedError> {
        if self.document.get_element_by_id(TOAST_ID).is_none() {
            let toast = self.element("div", "")?;
            toast.set_id(TOAST_ID);
            toast.set_attribute("role", "status").or_dom()?;
            self.body()?.append_child(&toast).or_dom()?;
        }
        Ok(())
    }

    fn notify(&self, message: &str) -> Result<(), FeedError> {
        self.ensure_toast()?;
        let toast = self
            .document
            .get_element_by_id(TOAST_ID)
            .ok_or_else(|| FeedError::Dom("toast missing".to_string()))?;
        toast.set_text_content(Some(message));
        toast.class_list().add_1("visible").or_dom()?;
        self.toast_timer.schedule(move || {
            let _ = toast.class_list().remove_1("visible");
        });
        Ok(())
    }
}

pub fn panel_name(panel: Panel) -> &'static str {
    match panel {
        Panel::Search => "search",
        Panel::Filter => "filter",
        Panel::Queue => "queue",
    }
}

fn panel_title(panel: Panel) -> &'static str {
    match panel {
        Panel::Search => "Search",
        Panel::Filter => "Filter",
        Panel::Queue => "My Queue",
    }
}

fn filter_name(filter: CategoryFilter) -> &'static str {
    match filter {
        CategoryFilter::All => "all",
        CategoryFilter::Movies => "movies",
        CategoryFilter::Tv => "tv",
        CategoryFilter::NowPlaying => "nowplaying",
    }
}

fn filter_label(filter: CategoryFilter) -> &'static str {
    match filter {
        CategoryFilter::All => "All",
        CategoryFilter::Movies => "Movies",
        CategoryFilter::Tv => "TV Shows",
        CategoryFilter::NowPlaying => "Now Playing",
    }
}
