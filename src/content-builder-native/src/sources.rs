use crate::config::BuildConfig;
use crate::types::ContentKind;

/// TMDB watch provider id for Netflix
pub const NETFLIX_PROVIDER_ID: &str = "8";
/// Tag carried in `nowPlaying` by items that are in theatres
pub const NOW_PLAYING_TAG: &str = "now_playing";

/// One paged TMDB listing and the label its items get
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSource {
    pub kind: ContentKind,
    /// Path below the API base, without leading slash
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Shown as the slide's source badge
    pub label: String,
    pub tag: Option<&'static str>,
}

impl ListingSource {
    fn list(kind: ContentKind, list: &str, label: &str) -> Self {
        Self {
            kind,
            path: format!("{}/{}", kind.as_path(), list),
            query: Vec::new(),
            label: label.to_string(),
            tag: None,
        }
    }

    fn discover(kind: ContentKind, query: &[(&str, &str)], label: String) -> Self {
        Self {
            kind,
            path: format!("discover/{}", kind.as_path()),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            label,
            tag: None,
        }
    }

    fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Every listing a build walks, in fetch order.
///
/// Order matters: dedupe keeps the first sighting of a title, so earlier
/// listings win the source badge.
pub fn listing_sources(config: &BuildConfig) -> Vec<ListingSource> {
    let mut sources = vec![
        ListingSource::list(ContentKind::Movie, "now_playing", "In Theatres").tagged(NOW_PLAYING_TAG),
        ListingSource::list(ContentKind::Movie, "popular", "Popular"),
        ListingSource::list(ContentKind::Movie, "top_rated", "Top Rated"),
    ];

    for year in &config.years {
        let year = year.to_string();
        sources.push(ListingSource::discover(
            ContentKind::Movie,
            &[("primary_release_year", year.as_str()), ("sort_by", "popularity.desc")],
            format!("Year {}", year),
        ));
    }

    sources.push(ListingSource::list(ContentKind::Tv, "popular", "Popular"));
    sources.push(ListingSource::list(ContentKind::Tv, "top_rated", "Top Rated"));

    if config.include_netflix {
        for kind in [ContentKind::Movie, ContentKind::Tv] {
            sources.push(ListingSource::discover(
                kind,
                &[
                    ("with_watch_providers", NETFLIX_PROVIDER_ID),
                    ("watch_region", config.region.as_str()),
                    ("sort_by", "popularity.desc"),
                ],
                "Netflix".to_string(),
            ));
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources() {
        let sources = listing_sources(&BuildConfig::default());
        let paths: Vec<&str> = sources.iter().map(|s| s.path.as_str()).collect();

        assert_eq!(
            paths,
            [
                "movie/now_playing",
                "movie/popular",
                "movie/top_rated",
                "tv/popular",
                "tv/top_rated",
                "discover/movie",
                "discover/tv",
            ]
        );
        assert_eq!(sources[0].tag, Some(NOW_PLAYING_TAG));
        assert!(sources[1..].iter().all(|s| s.tag.is_none()));
        assert_eq!(sources[6].label, "Netflix");
        assert!(sources[6]
            .query
            .contains(&("watch_region".to_string(), "US".to_string())));
    }

    #[test]
    fn test_year_sources() {
        let config = BuildConfig {
            years: vec![2023, 2024],
            include_netflix: false,
            ..Default::default()
        };
        let sources = listing_sources(&config);

        assert_eq!(sources.len(), 7);
        let year = &sources[4];
        assert_eq!(year.label, "Year 2024");
        assert_eq!(year.kind, ContentKind::Movie);
        assert!(year
            .query
            .contains(&("primary_release_year".to_string(), "2024".to_string())));
    }
}
