use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Could not decode {file}: {reason}")]
    Decode { file: String, reason: String },
    #[error("Unsupported image encoding in {file}: {reason}")]
    UnsupportedEncoding { file: String, reason: String },
    #[error("Source {source_id} is no longer available")]
    SourceUnavailable { source_id: SourceId },
    #[error("Unsupported file type: {0}")]
    UnsupportedMime(String),
    #[error("No pages to assemble")]
    EmptyInput,
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Render error: {0}")]
    Render(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, OrganizeError>;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an uploaded source blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl SourceId {
    pub(crate) fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Identity of a page descriptor. Never reused once allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    pub(crate) fn next() -> Self {
        PageId(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Raster encodings accepted for image sources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Gif,
    WebP,
    /// Any other `image/*` subtype the decoder understands (bmp, tiff, ...)
    Other(String),
}

impl ImageEncoding {
    /// PNG and JPEG embed without a conversion step
    pub fn is_native(&self) -> bool {
        matches!(self, ImageEncoding::Png | ImageEncoding::Jpeg)
    }

    pub fn mime_type(&self) -> String {
        match self {
            ImageEncoding::Png => "image/png".to_string(),
            ImageEncoding::Jpeg => "image/jpeg".to_string(),
            ImageEncoding::Gif => "image/gif".to_string(),
            ImageEncoding::WebP => "image/webp".to_string(),
            ImageEncoding::Other(subtype) => format!("image/{}", subtype),
        }
    }

    /// Decoder format for this encoding, if the image crate knows it
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            ImageEncoding::Png => Some(image::ImageFormat::Png),
            ImageEncoding::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageEncoding::Gif => Some(image::ImageFormat::Gif),
            ImageEncoding::WebP => Some(image::ImageFormat::WebP),
            ImageEncoding::Other(_) => image::ImageFormat::from_mime_type(self.mime_type()),
        }
    }
}

/// What an uploaded blob is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Document,
    Image(ImageEncoding),
}

impl SourceKind {
    /// Classify a declared MIME type. Parameters (`; charset=...`) are ignored.
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" => Ok(SourceKind::Document),
            "image/png" => Ok(SourceKind::Image(ImageEncoding::Png)),
            "image/jpeg" | "image/jpg" => Ok(SourceKind::Image(ImageEncoding::Jpeg)),
            "image/gif" => Ok(SourceKind::Image(ImageEncoding::Gif)),
            "image/webp" => Ok(SourceKind::Image(ImageEncoding::WebP)),
            other => match other.strip_prefix("image/") {
                Some(subtype) if !subtype.is_empty() => {
                    let encoding = ImageEncoding::Other(subtype.to_string());
                    if encoding.image_format().is_some() {
                        Ok(SourceKind::Image(encoding))
                    } else {
                        Err(OrganizeError::UnsupportedMime(mime.to_string()))
                    }
                }
                _ => Err(OrganizeError::UnsupportedMime(mime.to_string())),
            },
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, SourceKind::Document)
    }
}

/// Immutable uploaded payload
#[derive(Debug)]
pub struct SourceBlob {
    id: SourceId,
    name: String,
    kind: SourceKind,
    bytes: Arc<[u8]>,
}

impl SourceBlob {
    pub(crate) fn new(name: String, kind: SourceKind, bytes: Arc<[u8]>) -> Self {
        Self {
            id: SourceId::next(),
            name,
            kind,
            bytes,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// Clockwise page rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Snap an arbitrary angle to the nearest quarter turn
    pub fn from_degrees(degrees: i64) -> Self {
        let quarter = ((degrees.rem_euclid(360) + 45) / 90) % 4;
        match quarter {
            1 => Rotation::Clockwise90,
            2 => Rotation::Clockwise180,
            3 => Rotation::Clockwise270,
            _ => Rotation::None,
        }
    }

    /// One more quarter turn clockwise
    pub fn rotated(self) -> Self {
        Self::from_degrees(self.degrees() + 90)
    }

    pub fn plus(self, other: Rotation) -> Self {
        Self::from_degrees(self.degrees() + other.degrees())
    }

    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }
}

/// Lightweight preview of one page
#[derive(Debug, Clone, PartialEq)]
pub enum Thumbnail {
    /// The source image itself
    Image {
        encoding: ImageEncoding,
        width: u32,
        height: u32,
        bytes: Arc<[u8]>,
    },
    /// Rasterised document page, RGBA8
    Raster {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
    /// Size-only preview when no rasteriser is available
    Placeholder { width: u32, height: u32 },
}

impl Thumbnail {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Thumbnail::Image { width, height, .. }
            | Thumbnail::Raster { width, height, .. }
            | Thumbnail::Placeholder { width, height } => (*width, *height),
        }
    }
}

/// One renderable page of the final output
#[derive(Debug, Clone)]
pub struct PageDescriptor {
    id: PageId,
    source_id: SourceId,
    source: Weak<SourceBlob>,
    file_name: String,
    page_index: u32,
    pub(crate) rotation: Rotation,
    thumbnail: Thumbnail,
}

impl PageDescriptor {
    pub(crate) fn new(source: &Arc<SourceBlob>, page_index: u32, thumbnail: Thumbnail) -> Self {
        Self {
            id: PageId::next(),
            source_id: source.id(),
            source: Arc::downgrade(source),
            file_name: source.name().to_string(),
            page_index,
            rotation: Rotation::None,
            thumbnail,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Look the owning source up; `None` once its file was removed
    pub fn source(&self) -> Option<Arc<SourceBlob>> {
        self.source.upgrade()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 1-based page index inside the source
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Cached preview; rotation is a display transform on top of it
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }
}

/// Cooperative cancellation shared between a caller and a running ingest
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Short and long side in points
    pub fn sides_pt(self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        let (w, h) = (crate::constants::mm_to_pt(w), crate::constants::mm_to_pt(h));
        (w.min(h), w.max(h))
    }
}

/// Page orientation forced onto image pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageOrientation {
    /// Follow the image's own aspect ratio
    #[default]
    Auto,
    Portrait,
    Landscape,
}
