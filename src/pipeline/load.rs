//! Artifact loading: read every text artifact of a [`FileSet`] into memory.
//!
//! All texts for both sides are held at once for the comparison step. The
//! returned vector is index-aligned with the file set, so a read failure is
//! fatal rather than skipped: dropping one text would shift every later
//! index and mislabel the report.

use crate::error::CrossfindError;
use crate::output::FileSet;
use crate::pipeline::normalize::normalize;
use tracing::debug;

/// Read and normalise every artifact in `files`, preserving order.
///
/// Invalid UTF-8 is replaced rather than rejected; converters asked for
/// `--asciiize` output rarely produce any.
pub async fn load_normalized(files: &FileSet) -> Result<Vec<String>, CrossfindError> {
    let mut texts = Vec::with_capacity(files.len());
    for entry in files {
        let bytes = tokio::fs::read(&entry.artifact)
            .await
            .map_err(|e| CrossfindError::ArtifactReadFailed {
                path: entry.artifact.clone(),
                source: e,
            })?;
        let text = normalize(&String::from_utf8_lossy(&bytes));
        debug!("Loaded '{}' ({} chars)", entry.artifact.display(), text.len());
        texts.push(text);
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "first\r\n\r\n\r\n\r\nbook").unwrap();
        std::fs::write(&b, "  second  book ").unwrap();

        let mut set = FileSet::new();
        set.push("b.epub", &b);
        set.push("a.epub", &a);

        let texts = load_normalized(&set).await.unwrap();
        assert_eq!(texts, vec!["second book".to_string(), "first\n\nbook".to_string()]);
    }

    #[tokio::test]
    async fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = FileSet::new();
        set.push("gone.epub", dir.path().join("gone.txt"));
        let err = load_normalized(&set).await.unwrap_err();
        assert!(err.to_string().contains("gone.txt"));
    }
}
