//! Offline builder for the MovieShows content document.
//!
//! Pulls listings, genres and trailers from TMDB, merges them into the JSON
//! document the feed loads at startup, and renders the same catalog as an
//! idempotent SQL seed.

pub mod builder;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod sources;
pub mod sql;
pub mod tmdb;
pub mod types;

pub use builder::{BuildStats, ContentBuilder};
pub use config::{BuildConfig, RetryPolicy};
pub use error::{BuildError, Result};
pub use types::{ContentDocument, ContentItem, ContentKind};
