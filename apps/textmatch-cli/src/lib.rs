//! Startup wiring shared by the binaries.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use textmatch_core::config::Settings;
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::IngestRequest;
use textmatch_service::TextMatchService;
use textmatch_text::TantivyUnitIndex;

/// Open the configured backend and run provisioning. Any failure here should
/// stop the process.
pub async fn start_service(settings: &Settings) -> anyhow::Result<TextMatchService> {
    let backend = TantivyUnitIndex::from_settings(&settings.index)?;
    match backend.root() {
        Some(root) => tracing::info!(root = %root.display(), "opening on-disk index"),
        None => tracing::warn!("no index.dir configured, units are kept in memory"),
    }
    let backend: Arc<dyn UnitIndex> = Arc::new(backend);
    let service = TextMatchService::new(backend, settings);
    service.provision(&settings.provision.seed_documents).await?;
    Ok(service)
}

/// `.txt` files under `dir`, sorted so paragraph numbers are stable across runs.
pub fn text_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "txt"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirSummary {
    pub files: usize,
    pub units: usize,
    pub skipped: usize,
}

/// Ingest every text file under `dir`, one paragraph number per file in path
/// order. Empty or unreadable files are skipped and counted.
pub async fn ingest_dir(service: &TextMatchService, dir: &Path, document: bool, show_progress: bool) -> anyhow::Result<DirSummary> {
    let files = text_files(dir);
    let pb = if show_progress { ProgressBar::new(files.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓▒░  "),
    );

    let mut summary = DirSummary::default();
    for (paragraph, path) in (1u64..).zip(&files) {
        pb.set_message(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let text = match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                summary.skipped += 1;
                pb.inc(1);
                continue;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                summary.skipped += 1;
                pb.inc(1);
                continue;
            }
        };
        let request = if document { IngestRequest::document(text) } else { IngestRequest::lines(text) };
        let report = service.ingest(request.with_paragraph(paragraph)).await?;
        summary.files += 1;
        summary.units += report.indexed;
        pb.inc(1);
    }
    pb.finish_with_message("done");
    Ok(summary)
}
