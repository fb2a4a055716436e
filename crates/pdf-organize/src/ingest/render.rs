//! Thumbnail rendering for document pages

use crate::document::{displayed_size, page_ids};
use crate::types::{Result, SourceBlob, Thumbnail};
use lopdf::Document;

/// Receives one thumbnail per page, in page order. Returning an error stops rendering.
pub type ThumbnailSink<'a> = dyn FnMut(u32, Thumbnail) -> Result<()> + 'a;

/// Produces page thumbnails for an opened document.
///
/// Implementations are called once per document and must feed `sink` with
/// 1-based page numbers `1..=N` in order, where `N` is the page count of
/// `document`.
pub trait PageRenderer: Send + Sync {
    fn render_document(
        &self,
        source: &SourceBlob,
        document: &Document,
        scale: f32,
        sink: &mut ThumbnailSink<'_>,
    ) -> Result<()>;
}

/// Size-only thumbnails computed from the page boxes
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl PageRenderer for PlaceholderRenderer {
    fn render_document(
        &self,
        _source: &SourceBlob,
        document: &Document,
        scale: f32,
        sink: &mut ThumbnailSink<'_>,
    ) -> Result<()> {
        for (idx, page_id) in page_ids(document).into_iter().enumerate() {
            let (width, height) = displayed_size(document, page_id);
            sink(
                idx as u32 + 1,
                Thumbnail::Placeholder {
                    width: scaled(width, scale),
                    height: scaled(height, scale),
                },
            )?;
        }
        Ok(())
    }
}

fn scaled(length: f32, scale: f32) -> u32 {
    (length * scale).round().max(1.0) as u32
}

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRenderer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use super::*;
    use crate::types::OrganizeError;
    use pdfium_render::prelude::*;

    /// Initialize Pdfium, trying the vendored library first, then falling back to system
    fn init_pdfium() -> std::result::Result<Pdfium, PdfiumError> {
        let vendor_path = std::env::current_dir().ok().and_then(|mut p| {
            p.push("vendor/pdfium/lib");
            if p.exists() { Some(p) } else { None }
        });

        if let Some(vendor_path) = vendor_path {
            if let Ok(binding) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&vendor_path))
            {
                return Ok(Pdfium::new(binding));
            }
        }

        Pdfium::bind_to_system_library().map(Pdfium::new)
    }

    fn render_error(e: PdfiumError) -> OrganizeError {
        OrganizeError::Render(e.to_string())
    }

    /// Rasterises pages with pdfium
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PdfiumRenderer;

    impl PageRenderer for PdfiumRenderer {
        fn render_document(
            &self,
            source: &SourceBlob,
            document: &Document,
            scale: f32,
            sink: &mut ThumbnailSink<'_>,
        ) -> Result<()> {
            let pdfium = init_pdfium().map_err(render_error)?;
            let rendered = pdfium
                .load_pdf_from_byte_slice(source.bytes(), None)
                .map_err(render_error)?;

            let expected = document.get_pages().len();
            let pages = rendered.pages();
            if pages.len() as usize != expected {
                return Err(OrganizeError::Render(format!(
                    "pdfium sees {} pages in {}, expected {}",
                    pages.len(),
                    source.name(),
                    expected
                )));
            }

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            for (idx, page) in pages.iter().enumerate() {
                let bitmap = page.render_with_config(&config).map_err(render_error)?;
                sink(
                    idx as u32 + 1,
                    Thumbnail::Raster {
                        width: bitmap.width() as u32,
                        height: bitmap.height() as u32,
                        rgba: bitmap.as_rgba_bytes().to_vec(),
                    },
                )?;
            }
            Ok(())
        }
    }
}
