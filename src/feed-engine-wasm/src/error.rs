use wasm_bindgen::JsValue;

/// Errors surfaced by the feed engine
///
/// Runtime handlers log these and keep the page running; only the wasm
/// boundary turns them into JS exceptions.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Content fetch failed: {0}")]
    ContentFetch(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Host page not ready: {0}")]
    NotReady(#[from] crate::readiness::ReadinessError),
}

impl From<serde_wasm_bindgen::Error> for FeedError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        FeedError::InvalidArgument(err.to_string())
    }
}

// Convert FeedError to a JS exception
impl From<FeedError> for JsValue {
    fn from(err: FeedError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl FeedError {
    /// Wraps an opaque JS exception value
    pub fn dom(value: &JsValue) -> Self {
        FeedError::Dom(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}
