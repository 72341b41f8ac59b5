use url::Url;

pub const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Query parameters that make the player loop instead of firing "ended"
const LOOP_PARAMS: &[&str] = &["loop", "playlist"];

/// Extract the platform video id from a watch, short-link or embed URL
pub fn extract_video_id(source: &str) -> Option<String> {
    let source = source.trim();
    let url = Url::parse(source)
        .or_else(|_| Url::parse(&format!("https://{}", source)))
        .ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_string)
    } else if let Some(v) = url.query_pairs().find(|(key, _)| key == "v") {
        Some(v.1.into_owned())
    } else {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("embed") | Some("shorts") | Some("v") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    candidate.filter(|id| is_valid_video_id(id))
}

#[inline]
fn is_valid_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Compose the embed URL for a video id
pub fn embed_url(video_id: &str, muted: bool) -> String {
    format!(
        "{}{}?autoplay=1&mute={}&controls=1&playsinline=1&modestbranding=1&rel=0&enablejsapi=1",
        EMBED_BASE,
        video_id,
        if muted { 1 } else { 0 }
    )
}

/// Rewrite the `mute` parameter of an already-composed embed URL in place.
/// Loop parameters are dropped so that end-of-video events keep firing.
pub fn with_mute(src: &str, muted: bool) -> String {
    let Ok(mut url) = Url::parse(src) else {
        return src.to_string();
    };

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !LOOP_PARAMS.contains(&&**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mute_value = if muted { "1" } else { "0" };
    match pairs.iter_mut().find(|(key, _)| key == "mute") {
        Some(pair) => pair.1 = mute_value.to_string(),
        None => pairs.push(("mute".to_string(), mute_value.to_string())),
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_forms() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_extract_video_id_rejects_unknown() {
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), None);
        assert_eq!(extract_video_id("not a url at all"), None);
    }

    #[test]
    fn test_embed_url_parameters() {
        let url = embed_url("abc123", true);
        assert!(url.starts_with("https://www.youtube.com/embed/abc123?"));
        for param in [
            "autoplay=1",
            "mute=1",
            "controls=1",
            "playsinline=1",
            "modestbranding=1",
            "rel=0",
            "enablejsapi=1",
        ] {
            assert!(url.contains(param), "missing {}", param);
        }
        assert!(!url.contains("loop"));
    }

    #[test]
    fn test_mute_toggle_only_changes_mute() {
        let muted = embed_url("abc123", true);
        let unmuted = with_mute(&muted, false);

        assert_eq!(unmuted, embed_url("abc123", false));
        assert_eq!(extract_video_id(&unmuted).as_deref(), Some("abc123"));
        assert_eq!(with_mute(&unmuted, true), muted);
    }

    #[test]
    fn test_with_mute_strips_loop() {
        let src = "https://www.youtube.com/embed/abc123?autoplay=1&loop=1&playlist=abc123";
        let rewritten = with_mute(src, false);
        assert_eq!(
            rewritten,
            "https://www.youtube.com/embed/abc123?autoplay=1&mute=0"
        );
    }
}
