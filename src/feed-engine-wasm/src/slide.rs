use serde::Serialize;

use crate::embed;
use crate::types::{ContentItem, ContentType};

const MAX_GENRE_CHIPS: usize = 4;

/// Affordances on the right edge of a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideAction {
    Like,
    /// Adds the slide to the watch queue
    List,
    Share,
}

impl SlideAction {
    pub const ALL: [SlideAction; 3] = [SlideAction::Like, SlideAction::List, SlideAction::Share];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(SlideAction::Like),
            "list" => Some(SlideAction::List),
            "share" => Some(SlideAction::Share),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlideAction::Like => "like",
            SlideAction::List => "list",
            SlideAction::Share => "share",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlideAction::Like => "Like",
            SlideAction::List => "My List",
            SlideAction::Share => "Share",
        }
    }
}

/// Render-ready description of one feed slide
///
/// Exactly one of `src` and `deferred_src` is set: the embed either loads
/// right away or waits in `data-src` until the slide becomes visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideModel {
    pub id: String,
    pub title: String,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_src: Option<String>,
    pub rating_badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_badge: Option<String>,
    pub kind: ContentType,
    pub description: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    pub now_playing: bool,
    pub actions: [SlideAction; 3],
}

/// Build the slide for an item. Pure; the caller appends the result to the
/// feed container.
///
/// Returns None for items that must not enter the feed.
pub fn create_slide(
    id: &str,
    item: &ContentItem,
    load_immediately: bool,
    muted: bool,
) -> Option<SlideModel> {
    let video_id = item.video_id()?;
    let src = embed::embed_url(&video_id, muted);
    let (src, deferred_src) = if load_immediately {
        (Some(src), None)
    } else {
        (None, Some(src))
    };

    Some(SlideModel {
        id: id.to_string(),
        title: item.title.clone(),
        video_id,
        src,
        deferred_src,
        rating_badge: format!("★ {}", item.display_rating()),
        year_badge: Some(item.year.clone()).filter(|y| !y.is_empty()),
        source_badge: Some(item.source.clone()).filter(|s| !s.is_empty()),
        kind: item.kind,
        description: item.description.clone(),
        genres: item
            .genres
            .iter()
            .filter(|g| !g.is_empty())
            .take(MAX_GENRE_CHIPS)
            .cloned()
            .collect(),
        poster_url: item.poster_url.clone(),
        now_playing: item.is_now_playing(),
        actions: SlideAction::ALL,
    })
}
