pub mod assemble;
pub mod constants;
pub mod document;
pub mod ingest;
mod io;
mod options;
mod pages;
mod session;
mod types;

pub use assemble::{
    Assembler, Assembly, ImageConverter, RasterConverter, SkippedPage, assemble, assemble_pages,
};
pub use ingest::{
    BatchOutcome, FailedUpload, Ingested, Ingestor, PageRenderer, PlaceholderRenderer,
    ThumbnailSink, Upload, ingest,
};
pub use io::{
    default_output_name, ingest_file, ingest_files, load_upload, mime_from_path, save_pdf,
};
pub use options::*;
pub use pages::PageList;
pub use session::{Session, UploadedFile};
pub use types::*;

#[cfg(feature = "pdfium")]
pub use ingest::PdfiumRenderer;
