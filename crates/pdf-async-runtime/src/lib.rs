use std::path::PathBuf;
use thiserror::Error;

mod worker;

pub use worker::worker_task;

// Re-export types from the library crate
pub use pdf_organize::{AssemblyOptions, OrganizeError, PageDescriptor, PageId, Rotation, SourceId};

/// Commands sent from a front end to the worker
#[derive(Debug)]
pub enum PdfCommand {
    /// Read and ingest files, appending their pages in order
    IngestFiles {
        paths: Vec<PathBuf>,
    },
    Reorder {
        page: PageId,
        target_index: usize,
    },
    Rotate {
        page: PageId,
    },
    RemovePage {
        page: PageId,
    },
    /// Remove a file together with all of its pages
    RemoveFile {
        source: SourceId,
    },
    /// Assemble the page list as it stands when the command is processed
    Assemble {
        options: AssemblyOptions,
        output_path: PathBuf,
    },
    ListPages,
}

/// Updates sent from the worker to the front end
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    FileIngested {
        source: SourceId,
        name: String,
        page_count: usize,
    },
    IngestFailed {
        name: String,
        message: String,
    },
    IngestFinished {
        ingested: usize,
        failed: usize,
    },
    PagesChanged {
        pages: Vec<PageSummary>,
    },
    AssemblyComplete {
        path: PathBuf,
        page_count: usize,
        skipped: Vec<SkippedSummary>,
    },
    Error {
        message: String,
    },
}

/// A page as the front end sees it
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub id: PageId,
    pub source: SourceId,
    pub file_name: String,
    pub page_index: u32,
    pub rotation: Rotation,
    pub thumbnail_size: (u32, u32),
}

impl From<&PageDescriptor> for PageSummary {
    fn from(page: &PageDescriptor) -> Self {
        Self {
            id: page.id(),
            source: page.source_id(),
            file_name: page.file_name().to_string(),
            page_index: page.page_index(),
            rotation: page.rotation(),
            thumbnail_size: page.thumbnail().dimensions(),
        }
    }
}

/// A page that assembly left out
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSummary {
    pub page: PageId,
    pub file_name: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("Update receiver dropped")]
    UpdatesClosed,
}
