//! Per-session bookkeeping: uploaded files and the page list built from them

use crate::ingest::Ingested;
use crate::pages::PageList;
use crate::types::*;
use std::sync::Arc;

/// An uploaded file held by the session. Owns its source blob.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    source: Arc<SourceBlob>,
    page_count: usize,
    thumbnail: Option<Thumbnail>,
}

impl UploadedFile {
    pub fn id(&self) -> SourceId {
        self.source.id()
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn size(&self) -> usize {
        self.source.bytes().len()
    }

    pub fn kind(&self) -> &SourceKind {
        self.source.kind()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Preview of the first page
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct Session {
    files: Vec<UploadedFile>,
    pages: PageList,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ingested file and append its pages
    pub fn add(&mut self, ingested: Ingested) -> &[PageDescriptor] {
        let Ingested { source, pages } = ingested;
        self.files.push(UploadedFile {
            source,
            page_count: pages.len(),
            thumbnail: pages.first().map(|p| p.thumbnail().clone()),
        });
        self.pages.append(pages)
    }

    /// Remove a file and, with it, every page that came from it
    pub fn remove_file(&mut self, source_id: SourceId) -> bool {
        let Some(idx) = self.files.iter().position(|f| f.id() == source_id) else {
            return false;
        };
        let file = self.files.remove(idx);
        let removed = self.pages.remove_by_source(source_id);
        log::debug!("Removed {} and {} page(s)", file.name(), removed);
        true
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn pages(&self) -> &PageList {
        &self.pages
    }

    pub fn reorder(&mut self, id: PageId, target_index: usize) -> bool {
        self.pages.reorder(id, target_index)
    }

    pub fn rotate(&mut self, id: PageId) -> bool {
        self.pages.rotate(id)
    }

    pub fn remove_page(&mut self, id: PageId) -> bool {
        self.pages.remove(id)
    }

    pub fn clear(&mut self) {
        self.pages = PageList::new();
        self.files.clear();
    }
}
