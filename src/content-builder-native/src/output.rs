use std::path::Path;

use tokio::fs;

use crate::error::Result;
use crate::types::ContentDocument;

/// Write the document as pretty JSON, creating parent directories
pub async fn write_document(path: &Path, document: &ContentDocument) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(json.len() as u64)
}

pub async fn read_document(path: &Path) -> Result<ContentDocument> {
    let text = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Write `text` to `path`, or to stdout when no path is given
pub async fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text.as_bytes()).await?,
        None => {
            use tokio::io::AsyncWriteExt;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
