//! Source ingestion: uploaded blob in, page descriptors out
//!
//! Ingestion never touches a page list. It registers a new [`SourceBlob`]
//! and hands back one [`PageDescriptor`] per page; the caller decides where
//! they go.

mod render;

pub use render::{PageRenderer, PlaceholderRenderer, ThumbnailSink};

#[cfg(feature = "pdfium")]
pub use render::PdfiumRenderer;

use crate::constants::THUMBNAIL_SCALE;
use crate::types::*;
use lopdf::Document;
use std::io::Cursor;
use std::sync::Arc;

/// An uploaded file waiting to be ingested
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// Successful ingestion of one upload
#[derive(Debug)]
pub struct Ingested {
    pub source: Arc<SourceBlob>,
    pub pages: Vec<PageDescriptor>,
}

/// An upload that could not be ingested
#[derive(Debug)]
pub struct FailedUpload {
    pub name: String,
    pub error: OrganizeError,
}

/// Result of ingesting several uploads with per-file isolation
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub ingested: Vec<Ingested>,
    pub failures: Vec<FailedUpload>,
}

/// Turns uploads into sources and page descriptors
pub struct Ingestor {
    renderer: Box<dyn PageRenderer>,
    scale: f32,
    cancel: Option<CancelFlag>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Ingestor {
    pub fn new() -> Self {
        Self {
            renderer: default_renderer(),
            scale: THUMBNAIL_SCALE,
            cancel: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Ingest one upload.
    ///
    /// `progress` receives `(pages_done, total_pages)` after each rendered
    /// page of a document; it is not called for images.
    pub fn ingest(
        &self,
        upload: Upload,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Ingested> {
        let Upload { name, mime, bytes } = upload;
        let kind = SourceKind::from_mime(&mime)?;

        if bytes.is_empty() {
            return Err(OrganizeError::Decode {
                file: name,
                reason: "file is empty".to_string(),
            });
        }

        let source = Arc::new(SourceBlob::new(name, kind, Arc::from(bytes)));
        let pages = match source.kind() {
            SourceKind::Document => self.ingest_document(&source, &mut progress)?,
            SourceKind::Image(encoding) => vec![ingest_image(&source, encoding)?],
        };

        log::debug!(
            "Ingested {} ({} page{})",
            source.name(),
            pages.len(),
            if pages.len() == 1 { "" } else { "s" }
        );
        Ok(Ingested { source, pages })
    }

    /// Ingest several uploads. A file that fails is reported and skipped;
    /// the others still go through.
    pub fn ingest_batch(
        &self,
        uploads: Vec<Upload>,
        mut progress: impl FnMut(&str, usize, usize),
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for upload in uploads {
            let name = upload.name.clone();
            match self.ingest(upload, |done, total| progress(&name, done, total)) {
                Ok(ingested) => outcome.ingested.push(ingested),
                Err(OrganizeError::Cancelled) => {
                    outcome.failures.push(FailedUpload {
                        name,
                        error: OrganizeError::Cancelled,
                    });
                    break;
                }
                Err(error) => {
                    log::warn!("Skipping {}: {}", name, error);
                    outcome.failures.push(FailedUpload { name, error });
                }
            }
        }
        outcome
    }

    fn ingest_document(
        &self,
        source: &Arc<SourceBlob>,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PageDescriptor>> {
        let document = Document::load_mem(source.bytes()).map_err(|e| OrganizeError::Decode {
            file: source.name().to_string(),
            reason: e.to_string(),
        })?;

        let total = document.get_pages().len();
        if total == 0 {
            return Err(OrganizeError::Decode {
                file: source.name().to_string(),
                reason: "document has no pages".to_string(),
            });
        }

        if self.is_cancelled() {
            return Err(OrganizeError::Cancelled);
        }

        // a fallback run starts over at page 1; keep reported progress monotonic
        let mut reported = 0;
        let mut forward = |done: usize, total: usize| {
            if done > reported {
                reported = done;
                progress(done, total);
            }
        };

        match self.render_pages(self.renderer.as_ref(), source, &document, total, &mut forward) {
            Err(OrganizeError::Render(reason)) => {
                log::warn!(
                    "Rendering {} failed ({}); using size-only thumbnails",
                    source.name(),
                    reason
                );
                self.render_pages(&PlaceholderRenderer, source, &document, total, &mut forward)
            }
            other => other,
        }
    }

    fn render_pages(
        &self,
        renderer: &dyn PageRenderer,
        source: &Arc<SourceBlob>,
        document: &Document,
        total: usize,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PageDescriptor>> {
        let mut pages = Vec::with_capacity(total);
        let mut sink = |page_number: u32, thumbnail: Thumbnail| -> Result<()> {
            if self.is_cancelled() {
                return Err(OrganizeError::Cancelled);
            }
            let expected = pages.len() as u32 + 1;
            if page_number != expected {
                return Err(OrganizeError::Render(format!(
                    "renderer produced page {} of {}, expected {}",
                    page_number,
                    source.name(),
                    expected
                )));
            }
            pages.push(PageDescriptor::new(source, page_number, thumbnail));
            progress(pages.len(), total);
            Ok(())
        };

        renderer.render_document(source, document, self.scale, &mut sink)?;

        if pages.len() != total {
            return Err(OrganizeError::Render(format!(
                "renderer produced {} of {} pages for {}",
                pages.len(),
                total,
                source.name()
            )));
        }
        Ok(pages)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// Ingest one upload with the default renderer and no progress reporting
pub fn ingest(upload: Upload) -> Result<Ingested> {
    Ingestor::new().ingest(upload, |_, _| {})
}

fn default_renderer() -> Box<dyn PageRenderer> {
    #[cfg(feature = "pdfium")]
    {
        Box::new(PdfiumRenderer)
    }
    #[cfg(not(feature = "pdfium"))]
    {
        Box::new(PlaceholderRenderer)
    }
}

/// Images are a single implicit page whose thumbnail is the image itself
fn ingest_image(source: &Arc<SourceBlob>, encoding: &ImageEncoding) -> Result<PageDescriptor> {
    let (width, height) = probe_dimensions(source.bytes(), encoding).map_err(|reason| {
        OrganizeError::Decode {
            file: source.name().to_string(),
            reason,
        }
    })?;

    let thumbnail = Thumbnail::Image {
        encoding: encoding.clone(),
        width,
        height,
        bytes: source.shared_bytes(),
    };
    Ok(PageDescriptor::new(source, 1, thumbnail))
}

/// Read the header far enough to learn the pixel size
fn probe_dimensions(
    bytes: &[u8],
    encoding: &ImageEncoding,
) -> std::result::Result<(u32, u32), String> {
    let format = encoding
        .image_format()
        .ok_or_else(|| format!("no decoder for {}", encoding.mime_type()))?;
    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }
    Ok((width, height))
}
