//! Assembly: an ordered page list in, one PDF byte stream out
//!
//! Pages are processed strictly in list order. A page that fails is rolled
//! back out of the output document and reported in [`Assembly::skipped`];
//! only an empty input list fails the whole call.

mod copy;
mod raster;
mod stamp;

pub use raster::{ImageConverter, RasterConverter};

use crate::constants::OUTPUT_PDF_VERSION;
use crate::options::AssemblyOptions;
use crate::types::*;
use copy::{LinkFixup, LoadedDocument, copy_document_page, retarget_links};
use raster::build_image_page;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Output of one assembly call
#[derive(Debug)]
pub struct Assembly {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub skipped: Vec<SkippedPage>,
}

/// A page left out of the output, and why
#[derive(Debug)]
pub struct SkippedPage {
    pub page: PageId,
    pub file_name: String,
    pub error: OrganizeError,
}

/// A page added to the output. Copied document pages remember which
/// source page they came from so links can follow them.
struct BuiltPage {
    id: ObjectId,
    origin: Option<(SourceId, ObjectId)>,
    links: Vec<LinkFixup>,
}

/// Parsed sources for the duration of one call. A source that fails to
/// parse is remembered so each of its pages reports the same reason.
type DocumentCache = HashMap<SourceId, std::result::Result<LoadedDocument, String>>;

pub struct Assembler {
    options: AssemblyOptions,
    converter: Box<dyn ImageConverter>,
}

impl Assembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            options,
            converter: Box::new(RasterConverter),
        }
    }

    pub fn with_converter(mut self, converter: impl ImageConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Build the output document. Never touches the caller's page list.
    pub fn assemble(&self, pages: &[PageDescriptor]) -> Result<Assembly> {
        if pages.is_empty() {
            return Err(OrganizeError::EmptyInput);
        }
        self.options.validate()?;

        let mut output = Document::with_version(OUTPUT_PDF_VERSION);
        let pages_id = output.new_object_id();
        let font_id = self
            .options
            .add_page_numbers
            .then(|| stamp::add_page_number_font(&mut output));

        let mut documents = DocumentCache::new();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        let mut skipped = Vec::new();
        let mut placed: HashMap<(SourceId, ObjectId), ObjectId> = HashMap::new();
        let mut links: Vec<(SourceId, LinkFixup)> = Vec::new();

        for page in pages {
            let checkpoint = output.max_id;
            let number = kids.len() + 1;

            match self.build_page(&mut output, &mut documents, page, pages_id, number, font_id) {
                Ok(built) => {
                    if let Some((source_id, source_page)) = built.origin {
                        placed.entry((source_id, source_page)).or_insert(built.id);
                        links.extend(built.links.into_iter().map(|link| (source_id, link)));
                    }
                    kids.push(Object::Reference(built.id));
                }
                Err(error) => {
                    rollback(&mut output, &mut documents, checkpoint);
                    log::warn!(
                        "Skipping {} ({} page {}): {}",
                        page.id(),
                        page.file_name(),
                        page.page_index(),
                        error
                    );
                    skipped.push(SkippedPage {
                        page: page.id(),
                        file_name: page.file_name().to_string(),
                        error,
                    });
                }
            }
        }

        retarget_links(&mut output, &links, &placed);

        let page_count = kids.len();
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_count as i64));
        output
            .objects
            .insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = output.add_object(catalog);
        output.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        output.save_to(&mut bytes)?;

        log::info!(
            "Assembled {} page(s), skipped {}, {} bytes",
            page_count,
            skipped.len(),
            bytes.len()
        );
        Ok(Assembly {
            bytes,
            page_count,
            skipped,
        })
    }

    fn build_page(
        &self,
        output: &mut Document,
        documents: &mut DocumentCache,
        page: &PageDescriptor,
        pages_id: ObjectId,
        number: usize,
        font_id: Option<ObjectId>,
    ) -> Result<BuiltPage> {
        let source = page.source().ok_or(OrganizeError::SourceUnavailable {
            source_id: page.source_id(),
        })?;

        let mut origin = None;
        let mut links = Vec::new();
        let mut page_dict = match source.kind() {
            SourceKind::Document => {
                let loaded = documents
                    .entry(source.id())
                    .or_insert_with(|| LoadedDocument::load(&source));
                match loaded {
                    Ok(loaded) => {
                        let copied = copy_document_page(
                            output,
                            loaded,
                            source.name(),
                            page.page_index(),
                            page.rotation(),
                        )?;
                        origin = Some((source.id(), copied.source_page));
                        links = copied.links;
                        copied.dict
                    }
                    Err(reason) => {
                        return Err(OrganizeError::Decode {
                            file: source.name().to_string(),
                            reason: reason.clone(),
                        });
                    }
                }
            }
            SourceKind::Image(encoding) => build_image_page(
                output,
                &source,
                encoding,
                page.rotation(),
                self.options.image_orientation,
                self.options.image_page_limit,
                self.converter.as_ref(),
            )?,
        };
        page_dict.set("Parent", Object::Reference(pages_id));

        if let Some(font_id) = font_id {
            stamp::stamp_page_number(output, &mut page_dict, number, font_id)?;
        }

        Ok(BuiltPage {
            id: output.add_object(page_dict),
            origin,
            links,
        })
    }
}

/// Drop every object created after `checkpoint` and forget cached copies of them
fn rollback(output: &mut Document, documents: &mut DocumentCache, checkpoint: u32) {
    output.objects.retain(|id, _| id.0 <= checkpoint);
    output.max_id = checkpoint;
    for loaded in documents.values_mut().flatten() {
        loaded.cache.retain(|_, copied| copied.0 <= checkpoint);
    }
}

/// Assemble with the default image converter
pub fn assemble_pages(pages: &[PageDescriptor], options: &AssemblyOptions) -> Result<Assembly> {
    Assembler::new(options.clone()).assemble(pages)
}

/// Async wrapper running assembly on the blocking pool.
///
/// Takes an owned snapshot of the page list, so edits made after the call
/// starts are not reflected in its output.
pub async fn assemble(pages: Vec<PageDescriptor>, options: AssemblyOptions) -> Result<Assembly> {
    options.validate()?;
    tokio::task::spawn_blocking(move || Assembler::new(options).assemble(&pages)).await?
}
