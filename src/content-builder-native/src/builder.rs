use ahash::AHashMap;

use crate::config::BuildConfig;
use crate::error::Result;
use crate::merge::merge_items;
use crate::sources::{listing_sources, ListingSource};
use crate::tmdb::TmdbClient;
use crate::types::{ContentDocument, ContentItem, ContentKind, Listing};

/// Genre names keyed by TMDB id, movie and TV lists combined
pub type GenreMap = AHashMap<u32, String>;

/// Counters reported at the end of a build
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub listings_seen: usize,
    pub pages_failed: usize,
    pub without_trailer: usize,
    pub trailers_failed: usize,
    pub kept: usize,
}

/// Turn a TMDB listing into a content item. Items without a title are
/// dropped; the trailer is filled in separately.
pub fn to_content_item(
    listing: &Listing,
    source: &ListingSource,
    genres: &GenreMap,
    image_base: &str,
) -> Option<ContentItem> {
    let title = listing.display_title()?;
    Some(ContentItem {
        title: title.to_string(),
        kind: source.kind,
        year: listing.year(),
        rating: format!("{:.1}", listing.vote_average),
        genres: listing
            .genre_ids
            .iter()
            .filter_map(|id| genres.get(id).cloned())
            .collect(),
        source: source.label.clone(),
        trailer_url: None,
        poster_url: listing
            .poster_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}{}", image_base.trim_end_matches('/'), p)),
        description: listing.overview.trim().to_string(),
        now_playing: source.tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
    })
}

/// Walks every listing, resolves trailers and assembles the document
pub struct ContentBuilder {
    client: TmdbClient,
    config: BuildConfig,
    stats: BuildStats,
}

impl ContentBuilder {
    pub fn new(config: BuildConfig) -> Result<Self> {
        Ok(Self {
            client: TmdbClient::new(&config)?,
            config,
            stats: BuildStats::default(),
        })
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    async fn genre_map(&self) -> GenreMap {
        let mut map = GenreMap::default();
        for kind in [ContentKind::Movie, ContentKind::Tv] {
            match self.client.genres(kind).await {
                Ok(genres) => map.extend(genres.into_iter().map(|g| (g.id, g.name))),
                Err(e) => tracing::warn!("{} genre list unavailable: {}", kind.as_path(), e),
            }
        }
        map
    }

    async fn collect_source(&mut self, source: &ListingSource, genres: &GenreMap) -> Vec<ContentItem> {
        let mut items = Vec::new();

        for page in 1..=self.config.pages {
            let listing = match self.client.listing_page(source, page).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!("Skipping {} page {}: {}", source.path, page, e);
                    self.stats.pages_failed += 1;
                    continue;
                }
            };

            for result in &listing.results {
                self.stats.listings_seen += 1;
                let Some(mut item) = to_content_item(result, source, genres, &self.config.image_base) else {
                    continue;
                };

                match self.client.trailer(source.kind, result.id).await {
                    Ok(Some(url)) => {
                        item.trailer_url = Some(url);
                        items.push(item);
                    }
                    Ok(None) => self.stats.without_trailer += 1,
                    Err(e) => {
                        tracing::warn!("Skipping \"{}\": {}", item.title, e);
                        self.stats.trailers_failed += 1;
                    }
                }
            }

            if page >= listing.total_pages {
                break;
            }
        }

        tracing::info!("{} ({}): {} items with trailers", source.label, source.path, items.len());
        items
    }

    /// Fetch everything and return the merged document
    pub async fn build(&mut self) -> Result<ContentDocument> {
        let genres = self.genre_map().await;
        tracing::info!("Loaded {} genres", genres.len());

        let mut items = Vec::new();
        for source in listing_sources(&self.config) {
            items.extend(self.collect_source(&source, &genres).await);
        }

        let merged = merge_items(items);
        self.stats.kept = merged.len();
        Ok(ContentDocument::new(merged, chrono::Utc::now()))
    }
}
