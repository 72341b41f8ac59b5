use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_OUTPUT: &str = "movies-database.json";

/// Fixed-delay retry for TMDB requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Settings for one build run
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub api_key: String,
    pub api_base: String,
    pub image_base: String,
    /// Pages fetched from every listing
    pub pages: u32,
    /// Release years for the per-year movie discover
    pub years: Vec<u16>,
    pub include_netflix: bool,
    pub region: String,
    pub retry: RetryPolicy,
    pub output: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            image_base: DEFAULT_IMAGE_BASE.to_string(),
            pages: 2,
            years: Vec::new(),
            include_netflix: true,
            region: "US".to_string(),
            retry: RetryPolicy::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}
