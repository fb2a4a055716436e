//! File system helpers around ingestion and assembly

use crate::constants::DEFAULT_OUTPUT_PREFIX;
use crate::ingest::{BatchOutcome, FailedUpload, Ingested, Ingestor, Upload};
use crate::types::*;
use std::path::Path;

/// Guess the MIME type of an input file from its extension
pub fn mime_from_path(path: impl AsRef<Path>) -> Result<&'static str> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok("application/pdf"),
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        "bmp" => Ok("image/bmp"),
        "tif" | "tiff" => Ok("image/tiff"),
        _ => Err(OrganizeError::UnsupportedMime(format!(
            "{} (unknown extension)",
            path.display()
        ))),
    }
}

/// Read a file into an [`Upload`], named after its file name
pub async fn load_upload(path: impl AsRef<Path>) -> Result<Upload> {
    let path = path.as_ref();
    let mime = mime_from_path(path)?;
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::new(name, mime, bytes))
}

/// Read and ingest a single file
pub async fn ingest_file(path: impl AsRef<Path>) -> Result<Ingested> {
    let upload = load_upload(path).await?;
    tokio::task::spawn_blocking(move || Ingestor::new().ingest(upload, |_, _| {})).await?
}

/// Read and ingest several files. Files that cannot be read or decoded
/// are reported in the outcome; the rest are ingested in order.
pub async fn ingest_files(paths: &[impl AsRef<Path>]) -> Result<BatchOutcome> {
    let mut uploads = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_upload(path).await {
            Ok(upload) => uploads.push(upload),
            Err(error) => {
                log::warn!("Skipping {}: {}", path.display(), error);
                unreadable.push(FailedUpload {
                    name: path.display().to_string(),
                    error,
                });
            }
        }
    }

    let mut outcome = tokio::task::spawn_blocking(move || {
        Ingestor::new().ingest_batch(uploads, |name, done, total| {
            log::debug!("{}: page {}/{}", name, done, total);
        })
    })
    .await?;
    outcome.failures.splice(0..0, unreadable);
    Ok(outcome)
}

/// Write an assembled document
pub async fn save_pdf(bytes: &[u8], path: impl AsRef<Path>) -> Result<()> {
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Download name for an assembly made now: `merged-pdf-<timestamp>.pdf`
pub fn default_output_name() -> String {
    format!(
        "{}-{}.pdf",
        DEFAULT_OUTPUT_PREFIX,
        chrono::Local::now().format("%Y-%m-%dT%H-%M-%S")
    )
}
