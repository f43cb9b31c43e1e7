// Local filesystem collaborator

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::traits::{FileHandle, Filesystem};

/// Characters that are invalid in Windows filenames (and `/` everywhere)
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Windows reserved filenames (case-insensitive)
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Most filesystems cap a name at 255 bytes; leave room for `.part`
const MAX_NAME_BYTES: usize = 240;

const FALLBACK_NAME: &str = "unnamed";

/// Sanitize a string for use as a single path component.
///
/// Replaces separators and other invalid characters with `_` (collapsing
/// runs), trims leading/trailing spaces and dots so `..` can't survive,
/// prefixes Windows reserved names, and caps the length on a char boundary.
pub fn sanitize_file_name(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_control() || INVALID_CHARS.contains(&c) {
            if !last_was_replacement {
                result.push('_');
                last_was_replacement = true;
            }
        } else {
            result.push(c);
            last_was_replacement = false;
        }
    }

    let trimmed = result.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let upper = trimmed.to_uppercase();
    let stem = upper.split('.').next().unwrap_or(&upper);
    let mut name = if RESERVED_NAMES.contains(&stem) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    };

    if name.len() > MAX_NAME_BYTES {
        name = truncate_keeping_extension(&name, MAX_NAME_BYTES);
    }
    name
}

/// Shorten the stem so `stem.ext` fits in `max` bytes
fn truncate_keeping_extension(name: &str, max: usize) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < 16 => (stem, Some(ext)),
        _ => (name, None),
    };
    let budget = max.saturating_sub(ext.map_or(0, |e| e.len() + 1));

    let mut end = budget.min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    let stem = stem[..end].trim_end_matches(|c| c == ' ' || c == '.');

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

/// Filesystem backed by tokio::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn ensure_directory(&self, path: &Path) -> Result<(), DownloadError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        debug!(path = %path.display(), "Destination directory ready");
        Ok(())
    }

    fn sanitize_file_name(&self, candidate: &str) -> String {
        sanitize_file_name(candidate)
    }

    async fn create_file(&self, path: &Path) -> Result<FileHandle, DownloadError> {
        // Never share a file another writer already has open
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        Ok(Box::new(file))
    }

    async fn persist(&self, from: &Path, to: &Path) -> Result<(), DownloadError> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| DownloadError::io(to, e))
    }

    async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed partial file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_path_traversal_is_neutralized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name(".."), FALLBACK_NAME);
        assert!(!sanitize_file_name("a/b\\c.mp4").contains(['/', '\\']));
    }

    #[test]
    fn test_invalid_characters_collapse() {
        assert_eq!(sanitize_file_name("AC/DC: Live?.mp4"), "AC_DC_ Live_.mp4");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }

    #[test]
    fn test_reserved_and_empty_names() {
        assert_eq!(sanitize_file_name(""), FALLBACK_NAME);
        assert_eq!(sanitize_file_name("  . "), FALLBACK_NAME);
        assert_eq!(sanitize_file_name("con.mp4"), "_con.mp4");
        assert_eq!(sanitize_file_name("Concert.mp4"), "Concert.mp4");
    }

    #[test]
    fn test_long_names_keep_extension() {
        let long = format!("{}.webm", "é".repeat(300));
        let name = sanitize_file_name(&long);
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.ends_with(".webm"));
    }

    #[tokio::test]
    async fn test_create_persist_discard() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let nested = dir.path().join("a").join("b");
        fs.ensure_directory(&nested).await.unwrap();

        let part = nested.join("video.mp4.part");
        let done = nested.join("video.mp4");
        let mut file = fs.create_file(&part).await.unwrap();
        file.write_all(b"data").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        fs.persist(&part, &done).await.unwrap();
        assert_eq!(std::fs::read(&done).unwrap(), b"data");
        assert!(!part.exists());

        fs.discard(&done).await;
        assert!(!done.exists());
        // Missing file is fine
        fs.discard(&done).await;
    }

    #[tokio::test]
    async fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let part = dir.path().join("Intro.mp4.part");

        let mut first = fs.create_file(&part).await.unwrap();
        first.write_all(b"first").await.unwrap();
        first.flush().await.unwrap();

        let err = match fs.create_file(&part).await {
            Ok(_) => panic!("second writer opened the same file"),
            Err(e) => e,
        };
        match err {
            DownloadError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected error: {}", other),
        }
        drop(first);
        assert_eq!(std::fs::read(&part).unwrap(), b"first");
    }
}
