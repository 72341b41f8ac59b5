use std::future::Future;

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{BuildConfig, RetryPolicy};
use crate::error::{BuildError, Result};
use crate::sources::ListingSource;
use crate::types::{ContentKind, Genre, GenreList, Listing, Page, Video, VideoList};

const USER_AGENT: &str = concat!("movieshows-content-builder/", env!("CARGO_PKG_VERSION"));

/// Run `op` until it succeeds, a permanent error comes back, or the policy's
/// attempts are used up
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= attempts => {
                return Err(BuildError::RetriesExhausted {
                    url: what.to_string(),
                    attempts,
                    last: Box::new(e),
                })
            }
            Err(e) => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    what,
                    attempt,
                    attempts,
                    e,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// First official-looking YouTube trailer, as a watch URL
pub fn pick_trailer(videos: &[Video]) -> Option<String> {
    let youtube_trailers = || {
        videos
            .iter()
            .filter(|v| v.site.eq_ignore_ascii_case("YouTube") && v.kind == "Trailer" && !v.key.is_empty())
    };
    youtube_trailers()
        .find(|v| v.official)
        .or_else(|| youtube_trailers().next())
        .map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
}

/// Thin TMDB v3 client
pub struct TmdbClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl TmdbClient {
    pub fn new(config: &BuildConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(BuildError::MissingApiKey);
        }
        // Trailing slash so `join` appends instead of replacing the last segment
        let base = Url::parse(&format!("{}/", config.api_base.trim_end_matches('/')))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| BuildError::http(config.api_base.clone(), source))?;

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
            retry: config.retry,
        })
    }

    /// Absolute URL for `path` with the key and extra query appended
    pub fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            pairs.append_pair("language", "en-US");
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, shown: &str) -> Result<T> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| BuildError::http(shown, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BuildError::Status {
                url: shown.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| BuildError::http(shown, source))?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let url = self.endpoint(path, query)?;
        // Never log the key
        let shown = format!("{}/{}", self.base.path().trim_end_matches('/'), path);
        tracing::debug!("GET {}", shown);
        with_retry(self.retry, &shown, || self.get_once(&url, &shown)).await
    }

    pub async fn genres(&self, kind: ContentKind) -> Result<Vec<Genre>> {
        let list: GenreList = self
            .get_json(&format!("genre/{}/list", kind.as_path()), &[])
            .await?;
        Ok(list.genres)
    }

    pub async fn listing_page(&self, source: &ListingSource, page: u32) -> Result<Page<Listing>> {
        let mut query = source.query.clone();
        query.push(("page".to_string(), page.to_string()));
        self.get_json(&source.path, &query).await
    }

    pub async fn trailer(&self, kind: ContentKind, id: u64) -> Result<Option<String>> {
        let videos: VideoList = self
            .get_json(&format!("{}/{}/videos", kind.as_path(), id), &[])
            .await?;
        Ok(pick_trailer(&videos.results))
    }
}
