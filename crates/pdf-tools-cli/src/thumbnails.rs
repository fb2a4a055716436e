use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use pdf_organize::{PageDescriptor, Thumbnail};
use std::path::{Path, PathBuf};

/// Write a page's thumbnail as PNG on the blocking pool.
/// Returns false for size-only placeholders.
pub async fn write_thumbnail(page: PageDescriptor, position: usize, dir: PathBuf) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let path = dir.join(format!("page-{:03}.png", position));
        write_png(&page, &path)
    })
    .await?
}

fn write_png(page: &PageDescriptor, path: &Path) -> Result<bool> {
    match page.thumbnail() {
        Thumbnail::Image {
            encoding, bytes, ..
        } => {
            let format = encoding
                .image_format()
                .with_context(|| format!("no decoder for {}", encoding.mime_type()))?;
            let decoded = image::load_from_memory_with_format(bytes, format)?;
            decoded.save_with_format(path, ImageFormat::Png)?;
        }
        Thumbnail::Raster {
            width,
            height,
            rgba,
        } => {
            let raster = RgbaImage::from_raw(*width, *height, rgba.clone())
                .context("thumbnail buffer does not match its size")?;
            raster.save_with_format(path, ImageFormat::Png)?;
        }
        Thumbnail::Placeholder { .. } => return Ok(false),
    }

    log::debug!("Wrote {}", path.display());
    Ok(true)
}
