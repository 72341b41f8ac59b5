/// Error types for content building
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("TMDB_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<BuildError>,
    },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// HTTP failure with the request URL dropped, since it carries the API key
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        BuildError::Http {
            url: url.into(),
            source: source.without_url(),
        }
    }

    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BuildError::Http { source, .. } => !source.is_builder(),
            BuildError::Status { status, .. } => *status == 429 || *status >= 500,
            BuildError::Json(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let status = |status| BuildError::Status {
            url: "https://api.themoviedb.org/3/movie/popular".to_string(),
            status,
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
        assert!(!BuildError::MissingApiKey.is_transient());
    }
}
