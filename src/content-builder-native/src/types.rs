use serde::{Deserialize, Serialize};

/// Movie or TV show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Tv,
}

impl ContentKind {
    /// Path segment TMDB uses for this kind
    pub fn as_path(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Tv => "tv",
        }
    }
}

/// One record of the content document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub year: String,
    pub rating: String,
    pub genres: Vec<String>,
    pub source: String,
    pub trailer_url: Option<String>,
    pub poster_url: Option<String>,
    pub description: String,
    #[serde(default)]
    pub now_playing: Vec<String>,
}

impl ContentItem {
    #[inline]
    pub fn is_now_playing(&self) -> bool {
        !self.now_playing.is_empty()
    }
}

/// The static document the feed loads at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub exported: String,
    pub total_items: usize,
    pub movies: usize,
    pub tv_shows: usize,
    pub now_playing: usize,
    pub items: Vec<ContentItem>,
}

impl ContentDocument {
    /// Wrap already merged items, computing the summary counts
    pub fn new(items: Vec<ContentItem>, exported: chrono::DateTime<chrono::Utc>) -> Self {
        let movies = items.iter().filter(|i| i.kind == ContentKind::Movie).count();
        Self {
            exported: exported.to_rfc3339(),
            total_items: items.len(),
            movies,
            tv_shows: items.len() - movies,
            now_playing: items.iter().filter(|i| i.is_now_playing()).count(),
            items,
        }
    }
}

// ---- TMDB wire types -----------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

/// Movie or TV result from a list or discover endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub id: u64,
    /// Movies carry `title`, TV shows `name`
    pub title: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: f64,
    pub genre_ids: Vec<u32>,
    pub overview: String,
    pub poster_path: Option<String>,
}

impl Listing {
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Four-digit year of the first release or air date
    pub fn year(&self) -> String {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(|date| date.get(..4))
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub official: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoList {
    pub results: Vec<Video>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_fields() {
        let movie: Listing = serde_json::from_str(
            r#"{"id": 1, "title": "Dune", "release_date": "2021-09-15", "vote_average": 7.8}"#,
        )
        .unwrap();
        assert_eq!(movie.display_title(), Some("Dune"));
        assert_eq!(movie.year(), "2021");

        let show: Listing = serde_json::from_str(
            r#"{"id": 2, "name": "Severance", "first_air_date": "2022-02-17", "poster_path": null}"#,
        )
        .unwrap();
        assert_eq!(show.display_title(), Some("Severance"));
        assert_eq!(show.year(), "2022");

        let blank: Listing = serde_json::from_str(r#"{"id": 3, "title": "  ", "release_date": ""}"#).unwrap();
        assert_eq!(blank.display_title(), None);
        assert_eq!(blank.year(), "");
    }

    #[test]
    fn test_document_counts() {
        let item = |kind, tags: &[&str]| ContentItem {
            title: "x".to_string(),
            kind,
            year: "2024".to_string(),
            rating: "7.0".to_string(),
            genres: Vec::new(),
            source: "Popular".to_string(),
            trailer_url: Some("https://www.youtube.com/watch?v=abcdefghijk".to_string()),
            poster_url: None,
            description: String::new(),
            now_playing: tags.iter().map(|t| t.to_string()).collect(),
        };
        let exported = chrono::DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        let doc = ContentDocument::new(
            vec![
                item(ContentKind::Movie, &["now_playing"]),
                item(ContentKind::Movie, &[]),
                item(ContentKind::Tv, &[]),
            ],
            exported,
        );
        assert_eq!(doc.total_items, 3);
        assert_eq!(doc.movies, 2);
        assert_eq!(doc.tv_shows, 1);
        assert_eq!(doc.now_playing, 1);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["tvShows"], 1);
        assert_eq!(json["items"][0]["type"], "movie");
        assert_eq!(json["items"][0]["nowPlaying"][0], "now_playing");
        assert!(json["exported"].as_str().unwrap().starts_with("2024-05-01"));
    }
}
