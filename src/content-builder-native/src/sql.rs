use std::fmt::Write;

use crate::types::{ContentDocument, ContentItem, ContentKind};

const TABLE: &str = "movies";

/// Columns the seed needs beyond the base schema
const COLUMN_GUARDS: [(&str, &str); 8] = [
    ("content_type", "VARCHAR(16)"),
    ("year", "VARCHAR(8)"),
    ("rating", "VARCHAR(8)"),
    ("genres", "TEXT"),
    ("source", "VARCHAR(64)"),
    ("trailer_url", "TEXT"),
    ("poster_url", "TEXT"),
    ("description", "TEXT"),
];

/// Quote a string literal: single quotes doubled, backslashes escaped
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn quote_opt(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => quote(v),
        _ => "NULL".to_string(),
    }
}

fn insert_statement(item: &ContentItem, trailer: &str) -> String {
    let kind = match item.kind {
        ContentKind::Movie => "movie",
        ContentKind::Tv => "tv",
    };
    let trailer = quote(trailer);
    format!(
        "INSERT INTO {table} (title, content_type, year, rating, genres, source, trailer_url, poster_url, description, now_playing)\n\
         SELECT {title}, {kind}, {year}, {rating}, {genres}, {source}, {trailer}, {poster}, {description}, {now_playing}\n\
         WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE trailer_url = {trailer});",
        table = TABLE,
        title = quote(&item.title),
        kind = quote(kind),
        year = quote(&item.year),
        rating = quote(&item.rating),
        genres = quote(&item.genres.join(", ")),
        source = quote(&item.source),
        trailer = trailer,
        poster = quote_opt(item.poster_url.as_deref()),
        description = quote(&item.description),
        now_playing = if item.is_now_playing() { "TRUE" } else { "FALSE" },
    )
}

/// Idempotent seed script for the document's items that have a trailer
pub fn emit_sql(document: &ContentDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- MovieShows content seed, exported {}", document.exported);
    for (column, ty) in COLUMN_GUARDS {
        let _ = writeln!(out, "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {};", TABLE, column, ty);
    }
    let _ = writeln!(
        out,
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS now_playing BOOLEAN DEFAULT FALSE;",
        TABLE
    );
    out.push('\n');

    let mut written = 0;
    for item in &document.items {
        let Some(trailer) = item.trailer_url.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        out.push_str(&insert_statement(item, trailer));
        out.push_str("\n\n");
        written += 1;
    }

    tracing::info!("Emitted {} inserts ({} skipped without trailer)", written, document.items.len() - written);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, trailer: Option<&str>) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            kind: ContentKind::Tv,
            year: "2022".to_string(),
            rating: "8.7".to_string(),
            genres: vec!["Drama".to_string(), "Mystery".to_string()],
            source: "Top Rated".to_string(),
            trailer_url: trailer.map(str::to_string),
            poster_url: None,
            description: r"Mark's \ work".to_string(),
            now_playing: Vec::new(),
        }
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("Ocean's Eleven"), "'Ocean''s Eleven'");
        assert_eq!(quote(r"back\slash"), r"'back\\slash'");
    }

    #[test]
    fn test_emit_sql() {
        let document = ContentDocument {
            exported: "2024-05-01T00:00:00+00:00".to_string(),
            total_items: 2,
            movies: 0,
            tv_shows: 2,
            now_playing: 0,
            items: vec![
                item("Severance", Some("https://www.youtube.com/watch?v=xEQP4VVuyrY")),
                item("No Trailer", None),
            ],
        };

        let sql = emit_sql(&document);
        assert!(sql.contains("ALTER TABLE movies ADD COLUMN IF NOT EXISTS trailer_url TEXT;"));
        assert!(sql.contains("ALTER TABLE movies ADD COLUMN IF NOT EXISTS now_playing BOOLEAN DEFAULT FALSE;"));
        assert_eq!(sql.matches("INSERT INTO movies").count(), 1);
        assert!(sql.contains(
            "WHERE NOT EXISTS (SELECT 1 FROM movies WHERE trailer_url = 'https://www.youtube.com/watch?v=xEQP4VVuyrY');"
        ));
        assert!(sql.contains(r"'Mark''s \\ work'"));
        assert!(sql.contains("'Drama, Mystery'"));
        assert!(sql.contains("NULL, "));
        assert!(!sql.contains("No Trailer"));
    }
}
