use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::error::FeedError;

fn fetch_error(url: &str, value: &wasm_bindgen::JsValue) -> FeedError {
    FeedError::ContentFetch(format!("{}: {}", url, FeedError::dom(value)))
}

/// GET `url` and return the body as text
pub async fn fetch_text(url: &str) -> Result<String, FeedError> {
    let window = web_sys::window().ok_or_else(|| FeedError::ContentFetch("no window".to_string()))?;

    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fetch_error(url, &e))?;
    let response: Response = response.dyn_into().map_err(|e| fetch_error(url, &e))?;
    if !response.ok() {
        return Err(FeedError::ContentFetch(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let body = response.text().map_err(|e| fetch_error(url, &e))?;
    let text = JsFuture::from(body).await.map_err(|e| fetch_error(url, &e))?;
    text.as_string()
        .ok_or_else(|| FeedError::ContentFetch(format!("{}: body is not text", url)))
}
