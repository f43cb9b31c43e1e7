// Download executor - one variant's transfer into a named file
//
// Bytes go to `<final>.part` first and are renamed into place on success.
// Any failure removes the partial file, so a file at the final path is
// always complete.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::errors::DownloadError;
use super::format_selector::StreamVariant;
use super::traits::{FileHandle, Filesystem, Provider};

const PART_SUFFIX: &str = ".part";

/// Log progress every this many bytes
const PROGRESS_STEP: u64 = 8 * 1024 * 1024;

pub struct DownloadExecutor {
    provider: Arc<dyn Provider>,
    fs: Arc<dyn Filesystem>,
}

impl DownloadExecutor {
    pub fn new(provider: Arc<dyn Provider>, fs: Arc<dyn Filesystem>) -> Self {
        Self { provider, fs }
    }

    /// Download `variant` to `destination_dir/<filename_base>.<ext>`.
    ///
    /// Returns the final path. Cancellation aborts the transfer and removes
    /// the partial file.
    pub async fn download(
        &self,
        variant: &StreamVariant,
        destination_dir: &Path,
        filename_base: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let file_name = format!("{}.{}", filename_base, variant.extension());
        let final_path = self.fs.sanitize_path(destination_dir, &file_name);
        let part_path = part_path_for(&final_path);

        info!(
            quality = %variant.quality(),
            path = %final_path.display(),
            "Downloading"
        );

        let mut file = self.fs.create_file(&part_path).await?;
        let transferred = self
            .transfer(variant, &part_path, &mut file, cancel)
            .await;
        drop(file);

        match transferred {
            Ok(bytes) => {
                if let Err(e) = self.fs.persist(&part_path, &final_path).await {
                    self.fs.discard(&part_path).await;
                    return Err(e);
                }
                info!(path = %final_path.display(), bytes, "Download complete");
                Ok(final_path)
            }
            Err(e) => {
                self.fs.discard(&part_path).await;
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        variant: &StreamVariant,
        part_path: &Path,
        file: &mut FileHandle,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            response = self.provider.fetch_media(variant.url()) => response?,
        };
        if !response.is_success() {
            return Err(DownloadError::HttpStatus(response.status));
        }

        let mut body = response.body;
        let mut written: u64 = 0;
        let mut next_report = PROGRESS_STEP;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };
            let chunk = chunk?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(part_path, e))?;
            written += chunk.len() as u64;

            if written >= next_report {
                debug!(path = %part_path.display(), bytes = written, "Download progress");
                next_report += PROGRESS_STEP;
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::io(part_path, e))?;
        file.shutdown()
            .await
            .map_err(|e| DownloadError::io(part_path, e))?;

        Ok(written)
    }
}

/// `dir/name.ext` -> `dir/name.ext.part`
fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(PART_SUFFIX);
    final_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::fs::LocalFilesystem;
    use crate::downloader::quality::Quality;
    use crate::downloader::testing::{MediaScript, MockProvider};

    fn executor(provider: MockProvider) -> DownloadExecutor {
        DownloadExecutor::new(Arc::new(provider), Arc::new(LocalFilesystem::new()))
    }

    fn variant(url: &str) -> StreamVariant {
        StreamVariant::new(Quality::Medium, url, r#"video/mp4; codecs="avc1""#).unwrap()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new().with_media(
            "https://cdn.example/a",
            MediaScript::Chunks(vec![b"hello ".to_vec(), b"world".to_vec()]),
        );

        let path = executor(provider)
            .download(
                &variant("https://cdn.example/a"),
                dir.path(),
                "My: Video",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("My_ Video.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert_eq!(entries(dir.path()), vec!["My_ Video.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_http_status_error_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            MockProvider::new().with_media("https://cdn.example/a", MediaScript::Status(403));

        let err = executor(provider)
            .download(&variant("https://cdn.example/a"), dir.path(), "v", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus(403)));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new().with_media(
            "https://cdn.example/a",
            MediaScript::TransportError("connection reset".to_string()),
        );

        let err = executor(provider)
            .download(&variant("https://cdn.example/a"), dir.path(), "v", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transport(_)));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_broken_body_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new().with_media(
            "https://cdn.example/a",
            MediaScript::BrokenBody(b"partial".to_vec(), "connection closed".to_string()),
        );

        let err = executor(provider)
            .download(&variant("https://cdn.example/a"), dir.path(), "v", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transport(_)));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new()
            .with_media("https://cdn.example/a", MediaScript::Chunks(vec![b"x".to_vec()]));

        let err = executor(provider)
            .download(
                &variant("https://cdn.example/a"),
                &dir.path().join("missing"),
                "v",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_existing_part_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let part = dir.path().join("v.mp4.part");
        std::fs::write(&part, b"other writer").unwrap();
        let provider = MockProvider::new()
            .with_media("https://cdn.example/a", MediaScript::Chunks(vec![b"x".to_vec()]));

        let err = executor(provider)
            .download(&variant("https://cdn.example/a"), dir.path(), "v", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Io { .. }));
        assert_eq!(std::fs::read(&part).unwrap(), b"other writer");
        assert!(!dir.path().join("v.mp4").exists());
    }

    #[tokio::test]
    async fn test_cancelled_transfer_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let (script, _release) = MediaScript::gated(b"never".to_vec());
        let provider = MockProvider::new().with_media("https://cdn.example/a", script);
        let cancel = CancellationToken::new();

        let exec = executor(provider);
        let target = variant("https://cdn.example/a");
        let download = exec.download(&target, dir.path(), "v", &cancel);
        let canceller = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(download, canceller);

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path_for(Path::new("/tmp/out/video.mp4")),
            PathBuf::from("/tmp/out/video.mp4.part")
        );
    }
}
