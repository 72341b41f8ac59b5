use serde::Serialize;

use crate::types::{CategoryFilter, ContentItem, ContentType};

/// Card shown in the search panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub year: String,
    pub kind: ContentType,
    pub rating: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    pub playable: bool,
}

impl From<&ContentItem> for SearchResult {
    fn from(item: &ContentItem) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year.clone(),
            kind: item.kind,
            rating: item.display_rating().to_string(),
            poster_url: item.poster_url.clone(),
            playable: item.is_playable(),
        }
    }
}

/// Free-text search over the catalog
pub struct SearchEngine {
    cap: usize,
}

impl SearchEngine {
    pub fn new(cap: usize) -> Self {
        Self { cap }
    }

    /// Indices of matching items, in catalog order, capped.
    ///
    /// The query matches title, description or any genre (substring, case
    /// insensitive); the category filter must hold as well. An empty query
    /// lists everything the filter lets through.
    pub fn search(&self, items: &[ContentItem], query: &str, filter: CategoryFilter) -> Vec<usize> {
        let needle = query.trim().to_lowercase();
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.matches(item) && Self::matches_query(item, &needle))
            .map(|(idx, _)| idx)
            .take(self.cap)
            .collect()
    }

    /// `needle` must already be lowercased
    #[inline]
    fn matches_query(item: &ContentItem, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }

        item.title.to_lowercase().contains(needle)
            || item.description.to_lowercase().contains(needle)
            || item
                .genres
                .iter()
                .any(|genre| genre.to_lowercase().contains(needle))
    }

    /// Matching items as result cards
    pub fn results(&self, items: &[ContentItem], query: &str, filter: CategoryFilter) -> Vec<SearchResult> {
        self.search(items, query, filter)
            .into_iter()
            .map(|idx| SearchResult::from(&items[idx]))
            .collect()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_item(title: &str, kind: ContentType, genres: &[&str], description: &str) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            kind,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            description: description.to_string(),
            trailer_url: Some("https://youtu.be/abcdefghijk".to_string()),
            ..Default::default()
        }
    }

    fn catalog() -> Vec<ContentItem> {
        vec![
            create_test_item("Dune", ContentType::Movie, &["Sci-Fi"], "Desert planet"),
            create_test_item("Severance", ContentType::Tv, &["Thriller"], "Office mystery"),
            create_test_item("The Office", ContentType::Tv, &["Comedy"], "Paper company"),
            create_test_item("Heat", ContentType::Movie, &["Crime"], "A heist in LA"),
        ]
    }

    #[test]
    fn test_matches_any_field() {
        let engine = SearchEngine::default();
        let items = catalog();

        assert_eq!(engine.search(&items, "OFFICE", CategoryFilter::All), vec![1, 2]);
        assert_eq!(engine.search(&items, "sci", CategoryFilter::All), vec![0]);
        assert_eq!(engine.search(&items, "heist", CategoryFilter::All), vec![3]);
        assert!(engine.search(&items, "western", CategoryFilter::All).is_empty());
    }

    #[test]
    fn test_filter_is_and() {
        let engine = SearchEngine::default();
        let items = catalog();

        assert_eq!(engine.search(&items, "office", CategoryFilter::Movies), Vec::<usize>::new());
        assert_eq!(engine.search(&items, "", CategoryFilter::Tv), vec![1, 2]);
    }

    #[test]
    fn test_result_cap() {
        let engine = SearchEngine::default();
        let items: Vec<ContentItem> = (0..50)
            .map(|i| create_test_item(&format!("Movie {}", i), ContentType::Movie, &[], ""))
            .collect();

        assert_eq!(engine.search(&items, "movie", CategoryFilter::All).len(), 30);
        let results = engine.results(&items, "movie 4", CategoryFilter::All);
        assert_eq!(results[0].title, "Movie 4");
        assert!(results[0].playable);
    }
}
