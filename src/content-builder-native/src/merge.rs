use std::cmp::Ordering;

use ahash::AHashMap;

use crate::types::ContentItem;

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Collapse duplicate titles. The first sighting wins; later sightings only
/// contribute `nowPlaying` tags it lacks.
pub fn dedupe_items(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen: AHashMap<String, usize> = AHashMap::with_capacity(items.len());
    let mut merged: Vec<ContentItem> = Vec::with_capacity(items.len());

    for item in items {
        match seen.get(&title_key(&item.title)) {
            Some(&index) => {
                let kept = &mut merged[index];
                for tag in item.now_playing {
                    if !kept.now_playing.contains(&tag) {
                        kept.now_playing.push(tag);
                    }
                }
            }
            None => {
                seen.insert(title_key(&item.title), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

fn year_of(item: &ContentItem) -> u32 {
    item.year.parse().unwrap_or(0)
}

fn rating_of(item: &ContentItem) -> f64 {
    item.rating.parse().unwrap_or(0.0)
}

/// Now playing first, then newest, then best rated
pub fn compare_items(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.is_now_playing()
        .cmp(&a.is_now_playing())
        .then_with(|| year_of(b).cmp(&year_of(a)))
        .then_with(|| rating_of(b).total_cmp(&rating_of(a)))
}

pub fn merge_items(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut merged = dedupe_items(items);
    merged.sort_by(compare_items);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    fn item(title: &str, year: &str, rating: &str, tags: &[&str]) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            kind: ContentKind::Movie,
            year: year.to_string(),
            rating: rating.to_string(),
            genres: Vec::new(),
            source: "Popular".to_string(),
            trailer_url: Some(format!("https://www.youtube.com/watch?v={:0>11}", title.len())),
            poster_url: None,
            description: String::new(),
            now_playing: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_and_merges_tags() {
        let mut first = item("Dune", "2021", "7.8", &[]);
        first.source = "Top Rated".to_string();
        let items = vec![
            first,
            item("Arrival", "2016", "7.9", &[]),
            item("dune ", "2021", "7.8", &["now_playing"]),
            item("Dune", "2021", "7.8", &["now_playing"]),
        ];

        let merged = dedupe_items(items);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, "Top Rated");
        assert_eq!(merged[0].now_playing, vec!["now_playing".to_string()]);
    }

    #[test]
    fn test_sort_order() {
        let merged = merge_items(vec![
            item("Old Classic", "1994", "8.9", &[]),
            item("New Low", "2024", "5.1", &[]),
            item("New High", "2024", "8.0", &[]),
            item("In Cinemas", "2023", "6.0", &["now_playing"]),
            item("Undated", "", "9.9", &[]),
        ]);

        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["In Cinemas", "New High", "New Low", "Old Classic", "Undated"]);
    }
}
