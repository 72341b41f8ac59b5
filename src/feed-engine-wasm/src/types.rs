use serde::{Deserialize, Deserializer, Serialize};

/// Shortest trailer URL that can still carry a video id
pub const MIN_TRAILER_URL_LEN: usize = 10;

/// Movie or TV show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Tv,
}

/// Catalog record as exported in the content document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentItem {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rating: String,
    pub genres: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
    pub trailer_url: Option<String>,
    pub poster_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    pub now_playing: Vec<String>,
}

impl ContentItem {
    /// Trailer URL if it is long enough to be embeddable
    pub fn trailer_url(&self) -> Option<&str> {
        self.trailer_url
            .as_deref()
            .map(str::trim)
            .filter(|url| url.len() >= MIN_TRAILER_URL_LEN)
    }

    /// Video id the embed is built from
    pub fn video_id(&self) -> Option<String> {
        self.trailer_url().and_then(crate::embed::extract_video_id)
    }

    /// Only playable items may enter the feed: the trailer must yield a video id
    #[inline]
    pub fn is_playable(&self) -> bool {
        self.video_id().is_some()
    }

    #[inline]
    pub fn is_now_playing(&self) -> bool {
        !self.now_playing.is_empty()
    }

    /// Rating for display, "0.0" when the document had none
    pub fn display_rating(&self) -> &str {
        if self.rating.is_empty() {
            "0.0"
        } else {
            &self.rating
        }
    }
}

/// Accepts strings, numbers and null for fields the exporter has typed loosely
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Static content document served next to the page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDocument {
    pub exported: String,
    pub total_items: usize,
    pub movies: usize,
    pub tv_shows: usize,
    pub now_playing: usize,
    pub items: Vec<ContentItem>,
}

/// Persisted watch-queue entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueEntry {
    pub title: String,
    pub poster_url: Option<String>,
    pub year: String,
    pub trailer_url: Option<String>,
}

impl From<&ContentItem> for QueueEntry {
    fn from(item: &ContentItem) -> Self {
        Self {
            title: item.title.clone(),
            poster_url: item.poster_url.clone(),
            year: item.year.clone(),
            trailer_url: item.trailer_url.clone(),
        }
    }
}

impl From<&QueueEntry> for ContentItem {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            title: entry.title.clone(),
            year: entry.year.clone(),
            trailer_url: entry.trailer_url.clone(),
            poster_url: entry.poster_url.clone(),
            ..Default::default()
        }
    }
}

/// Category filter consulted by search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Movies,
    Tv,
    #[serde(rename = "nowplaying")]
    NowPlaying,
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "movies" => CategoryFilter::Movies,
            "tv" => CategoryFilter::Tv,
            "nowplaying" => CategoryFilter::NowPlaying,
            _ => CategoryFilter::All,
        }
    }

    #[inline]
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Movies => item.kind == ContentType::Movie,
            CategoryFilter::Tv => item.kind == ContentType::Tv,
            CategoryFilter::NowPlaying => item.is_now_playing(),
        }
    }
}

/// Embedded player size, bound to number keys 1-4
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerSize {
    Small,
    Medium,
    #[default]
    Large,
    Full,
}

impl PlayerSize {
    pub fn from_digit(key: &str) -> Option<Self> {
        match key {
            "1" => Some(PlayerSize::Small),
            "2" => Some(PlayerSize::Medium),
            "3" => Some(PlayerSize::Large),
            "4" => Some(PlayerSize::Full),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "small" => Some(PlayerSize::Small),
            "medium" => Some(PlayerSize::Medium),
            "large" => Some(PlayerSize::Large),
            "full" => Some(PlayerSize::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerSize::Small => "small",
            PlayerSize::Medium => "medium",
            PlayerSize::Large => "large",
            PlayerSize::Full => "full",
        }
    }
}

/// Placement of the title/description overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextLayout {
    #[default]
    Overlay,
    Below,
    Hidden,
}

impl TextLayout {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overlay" => Some(TextLayout::Overlay),
            "below" => Some(TextLayout::Below),
            "hidden" => Some(TextLayout::Hidden),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextLayout::Overlay => "overlay",
            TextLayout::Below => "below",
            TextLayout::Hidden => "hidden",
        }
    }
}

/// Side panels injected next to the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Search,
    Filter,
    Queue,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Search, Panel::Filter, Panel::Queue];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "search" => Some(Panel::Search),
            "filter" => Some(Panel::Filter),
            "queue" => Some(Panel::Queue),
            _ => None,
        }
    }

    pub fn element_id(&self) -> &'static str {
        match self {
            Panel::Search => "movieshows-search-panel",
            Panel::Filter => "movieshows-filter-panel",
            Panel::Queue => "movieshows-queue-panel",
        }
    }
}

/// Scroll position of the feed container
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub viewport_height: f64,
}

impl Viewport {
    /// Pixels left below the bottom edge of the viewport for a feed of one
    /// viewport-high slide per item
    pub fn distance_to_end(&self, slide_count: usize) -> f64 {
        let total = slide_count as f64 * self.viewport_height;
        (total - (self.scroll_top + self.viewport_height)).max(0.0)
    }

    /// Slide index closest to the current scroll position
    pub fn nearest_index(&self, slide_count: usize) -> usize {
        if slide_count == 0 || self.viewport_height <= 0.0 {
            return 0;
        }
        let index = (self.scroll_top / self.viewport_height).round().max(0.0) as usize;
        index.min(slide_count - 1)
    }

    #[inline]
    pub fn top_of(&self, index: usize) -> f64 {
        index as f64 * self.viewport_height
    }
}

/// Lazy embed source of a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmbedSlot {
    /// Source parked in `data-src`, never loaded
    Deferred,
    Loaded,
    /// Loaded once and cleared again after leaving the viewport
    Unloaded,
}

/// DOM operation produced by the session, applied by the web layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedOperation {
    #[serde(rename_all = "camelCase")]
    AppendSlide { slide: crate::slide::SlideModel },
    #[serde(rename_all = "camelCase")]
    RemoveSlide { slide_id: String },
    ScrollTo { index: usize, top: f64 },
    #[serde(rename_all = "camelCase")]
    LoadEmbed { slide_id: String, src: String },
    #[serde(rename_all = "camelCase")]
    UnloadEmbed { slide_id: String },
    #[serde(rename_all = "camelCase")]
    RewriteEmbed { slide_id: String, src: String },
    ShowPanel { panel: Panel },
    HidePanel { panel: Panel },
    Notify { message: String },
    ApplyMute { muted: bool },
    ApplyPlayerSize { size: PlayerSize },
    ApplyTextLayout { layout: TextLayout },
    RenderSearchResults { results: Vec<crate::search::SearchResult> },
    RenderQueue { entries: Vec<QueueEntry> },
}
