// Orchestrator - fans a target out into per-item pipelines
//
// Each item runs Resolving -> Selecting -> Downloading -> Done on its own.
// Resolution and selection are unbounded; only the transfer phase waits on
// the admission gate. A failed item becomes a Failure outcome and never
// touches its siblings. Only shared setup (playlist resolution, destination
// directory) can fail the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::errors::DownloadError;
use super::executor::DownloadExecutor;
use super::extractors::{diagnose, MetadataResolver, Target};
use super::gate::AdmissionGate;
use super::models::{DownloadOptions, DownloadOutcome, PipelineStage, RunReport, VideoItem};
use super::traits::{Filesystem, Provider};

type StageError = (PipelineStage, DownloadError);

/// File names handed out during one run. Two items never share a path.
#[derive(Default)]
struct NameClaims {
    taken: Mutex<HashSet<String>>,
}

impl NameClaims {
    /// First free base among `base`, `base [id]`, `id (2)`, `id (3)`, ...
    ///
    /// Keys are the sanitized, lowercased file names, so names that only
    /// differ in case or in stripped characters still count as taken.
    fn claim(&self, fs: &dyn Filesystem, base: &str, id: &str, extension: &str) -> String {
        let mut taken = self.taken.lock();
        let mut attempt = 0usize;
        loop {
            let candidate = match attempt {
                0 => base.to_string(),
                1 => format!("{} [{}]", base, id),
                n => format!("{} ({})", id, n),
            };
            attempt += 1;

            let key = fs
                .sanitize_file_name(&format!("{}.{}", candidate, extension))
                .to_lowercase();
            if taken.insert(key) {
                return candidate;
            }
        }
    }
}

pub struct Downloader {
    resolver: MetadataResolver,
    executor: DownloadExecutor,
    fs: Arc<dyn Filesystem>,
    gate: AdmissionGate,
    options: DownloadOptions,
}

impl Downloader {
    /// Build a downloader with a fresh gate of `options.max_concurrent` slots
    pub fn new(
        provider: Arc<dyn Provider>,
        fs: Arc<dyn Filesystem>,
        options: DownloadOptions,
    ) -> Result<Self, DownloadError> {
        options.validate()?;
        let gate = AdmissionGate::new(options.max_concurrent)?;

        Ok(Self {
            resolver: MetadataResolver::new(Arc::clone(&provider)),
            executor: DownloadExecutor::new(provider, Arc::clone(&fs)),
            fs,
            gate,
            options,
        })
    }

    /// Use an existing gate, e.g. one shared between runs
    pub fn with_gate(mut self, gate: AdmissionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    pub async fn run(&self, target: &Target) -> Result<RunReport, DownloadError> {
        self.run_with_cancel(target, CancellationToken::new()).await
    }

    /// Run every item of `target` to completion.
    ///
    /// Returns `Err` only for shared setup failures. Per-item failures are
    /// in the report.
    pub async fn run_with_cancel(
        &self,
        target: &Target,
        cancel: CancellationToken,
    ) -> Result<RunReport, DownloadError> {
        if self.options.quality.is_unknown_name() {
            warn!(
                quality = %self.options.quality,
                "Requested quality is not a known tier, every item will fail selection"
            );
        }

        let (items, destination) = match target {
            Target::Video { id } => (
                vec![VideoItem::untitled(id.clone())],
                self.options.output_path.clone(),
            ),
            Target::Playlist { url } => {
                let playlist = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                    playlist = self.resolver.resolve_playlist(url) => playlist?,
                };
                let destination = if playlist.title.is_empty() {
                    self.options.output_path.clone()
                } else {
                    self.fs
                        .sanitize_path(&self.options.output_path, &playlist.title)
                };
                (playlist.videos, destination)
            }
        };

        self.fs.ensure_directory(&destination).await?;

        info!(
            items = items.len(),
            destination = %destination.display(),
            quality = %self.options.quality,
            max_concurrent = self.gate.capacity(),
            "Starting downloads"
        );

        let outcomes = self.download_all(items, &destination, &cancel).await;
        let report = RunReport {
            destination,
            outcomes,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Run finished"
        );
        Ok(report)
    }

    /// Drive one pipeline per item and wait for all of them
    async fn download_all(
        &self,
        items: Vec<VideoItem>,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Vec<DownloadOutcome> {
        let names = NameClaims::default();
        let names = &names;
        let mut pipelines: FuturesUnordered<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| async move {
                let outcome = match self.pipeline(&item, destination, names, cancel).await {
                    Ok(path) => {
                        info!(item = %item, path = %path.display(), "✓ Downloaded");
                        DownloadOutcome::success(item, path)
                    }
                    Err((stage, e)) => {
                        let hint = diagnose(&e);
                        error!(
                            item = %item,
                            stage = %stage,
                            kind = e.kind(),
                            hint = hint.map(|h| h.description()),
                            "✗ {}",
                            e
                        );
                        DownloadOutcome::failure(item, stage, e, hint)
                    }
                };
                (index, outcome)
            })
            .collect();

        let mut finished = Vec::with_capacity(pipelines.len());
        while let Some(done) = pipelines.next().await {
            finished.push(done);
        }

        // Completion order is arbitrary; report in playlist order
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn pipeline(
        &self,
        item: &VideoItem,
        destination: &Path,
        names: &NameClaims,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, StageError> {
        debug!(item = %item, stage = %PipelineStage::Resolving, "Pipeline state");
        let metadata = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err((PipelineStage::Resolving, DownloadError::Cancelled)),
            metadata = self.resolver.resolve_video(&item.id) => {
                metadata.map_err(|e| (PipelineStage::Resolving, e))?
            }
        };

        debug!(item = %item, stage = %PipelineStage::Selecting, "Pipeline state");
        let variant = metadata
            .streams
            .select(&self.options.quality)
            .map_err(|e| (PipelineStage::Selecting, e))?
            .clone();
        debug!(
            item = %item,
            quality = %variant.quality(),
            mime = variant.mime_format(),
            "Variant selected"
        );

        let wanted = filename_base(item, metadata.title.as_deref());
        let base = names.claim(self.fs.as_ref(), wanted, &item.id, variant.extension());
        if base != wanted {
            debug!(item = %item, name = %base, "File name already used in this run");
        }

        // Held until the transfer ends, whatever its result
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err((PipelineStage::Downloading, DownloadError::Cancelled)),
            permit = self.gate.admit() => permit.map_err(|e| (PipelineStage::Downloading, e))?,
        };

        debug!(item = %item, stage = %PipelineStage::Downloading, "Pipeline state");
        self.executor
            .download(&variant, destination, &base, cancel)
            .await
            .map_err(|e| (PipelineStage::Downloading, e))
    }
}

/// Item title, else the provider's title, else the id
fn filename_base<'a>(item: &'a VideoItem, metadata_title: Option<&'a str>) -> &'a str {
    if !item.title.trim().is_empty() {
        return &item.title;
    }
    match metadata_title {
        Some(title) if !title.trim().is_empty() => title,
        _ => &item.id,
    }
}
