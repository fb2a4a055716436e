//! Copying pages out of source documents

use crate::document::{
    copy_object_deep, copy_object_without, intrinsic_rotation, is_page_tree_node, page_attribute,
    page_box,
};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Page attributes carried over to the copy. `Rotate` is handled separately.
const COPIED_PAGE_KEYS: [&[u8]; 9] = [
    b"Contents",
    b"Resources",
    b"MediaBox",
    b"CropBox",
    b"BleedBox",
    b"TrimBox",
    b"ArtBox",
    b"UserUnit",
    b"Group",
];

/// Annotation keys that point back into the source page tree
const ANNOTATION_BACKLINKS: [&[u8]; 3] = [b"P", b"Parent", b"Popup"];

/// A copied page, plus the links on it that point at other source pages
pub(crate) struct CopiedPage {
    pub dict: Dictionary,
    pub source_page: ObjectId,
    pub links: Vec<LinkFixup>,
}

/// Where a copied link annotation keeps its explicit destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DestinationKey {
    /// `/Dest [page ...]`
    Dest,
    /// `/A << /S /GoTo /D [page ...] >>`
    GoTo,
}

/// A link whose target page is only known once the whole output is built
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkFixup {
    pub annotation: ObjectId,
    pub key: DestinationKey,
    /// Target page id in the source document
    pub target: ObjectId,
}

/// A parsed source document plus the ids already copied out of it
pub(crate) struct LoadedDocument {
    document: Document,
    page_ids: Vec<ObjectId>,
    pub(crate) cache: HashMap<ObjectId, ObjectId>,
}

impl LoadedDocument {
    pub(crate) fn load(source: &SourceBlob) -> std::result::Result<Self, String> {
        let document = Document::load_mem(source.bytes()).map_err(|e| e.to_string())?;
        let page_ids = crate::document::page_ids(&document);
        Ok(Self {
            document,
            page_ids,
            cache: HashMap::new(),
        })
    }
}

/// Copy page `page_index` (1-based) into `output`, returning the new page
/// dictionary and its pending links. `Parent` is left to the caller;
/// `Rotate` is the page's own rotation plus `rotation`.
pub(crate) fn copy_document_page(
    output: &mut Document,
    loaded: &mut LoadedDocument,
    file_name: &str,
    page_index: u32,
    rotation: Rotation,
) -> Result<CopiedPage> {
    let page_id = page_index
        .checked_sub(1)
        .and_then(|idx| loaded.page_ids.get(idx as usize))
        .copied()
        .ok_or_else(|| OrganizeError::Decode {
            file: file_name.to_string(),
            reason: format!(
                "page {} out of range (document has {})",
                page_index,
                loaded.page_ids.len()
            ),
        })?;

    let source = &loaded.document;
    let cache = &mut loaded.cache;

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));

    for key in COPIED_PAGE_KEYS {
        if let Some(value) = page_attribute(source, page_id, key) {
            page_dict.set(key.to_vec(), copy_object_deep(output, source, &value, cache)?);
        }
    }
    if !page_dict.has(b"MediaBox") {
        page_dict.set("MediaBox", page_box(source, page_id).to_object());
    }

    let mut links = Vec::new();
    if let Some(annots) = copy_annotations(output, source, page_id, cache, &mut links)? {
        page_dict.set("Annots", annots);
    }

    let final_rotation = intrinsic_rotation(source, page_id).plus(rotation);
    if final_rotation != Rotation::None {
        page_dict.set("Rotate", Object::Integer(final_rotation.degrees()));
    }

    Ok(CopiedPage {
        dict: page_dict,
        source_page: page_id,
        links,
    })
}

/// Annotations lose their links to the source page and parent annotations
fn copy_annotations(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
    links: &mut Vec<LinkFixup>,
) -> Result<Option<Object>> {
    let Some(annots) = page_attribute(source, page_id, b"Annots") else {
        return Ok(None);
    };
    let Some(annots) = resolve(source, &annots).cloned() else {
        return Ok(None);
    };
    let Ok(items) = annots.as_array() else {
        return Ok(None);
    };

    let mut copied = Vec::with_capacity(items.len());
    for item in items {
        let Some(Ok(dict)) = resolve(source, item).map(Object::as_dict) else {
            continue;
        };
        let mut dict = dict.clone();
        let target = inline_page_destination(source, &mut dict);

        let annot = copy_object_without(
            output,
            source,
            &Object::Dictionary(dict),
            cache,
            &ANNOTATION_BACKLINKS,
        )?;
        let id = output.add_object(annot);
        if let Some((key, target)) = target {
            links.push(LinkFixup {
                annotation: id,
                key,
                target,
            });
        }
        copied.push(Object::Reference(id));
    }

    Ok((!copied.is_empty()).then_some(Object::Array(copied)))
}

fn resolve<'a>(source: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => source.get_object(*id).ok(),
        other => Some(other),
    }
}

/// If the annotation jumps to a page of its own document, make the
/// destination a direct array so the copy can be retargeted in place.
/// Returns where the destination lives and the source page it targets.
fn inline_page_destination(
    source: &Document,
    annot: &mut Dictionary,
) -> Option<(DestinationKey, ObjectId)> {
    if let Ok(dest) = annot.get(b"Dest") {
        let dest = resolve(source, dest)?.as_array().ok()?.clone();
        let target = page_target(source, &dest)?;
        annot.set("Dest", Object::Array(dest));
        return Some((DestinationKey::Dest, target));
    }

    let action = resolve(source, annot.get(b"A").ok()?)?.as_dict().ok()?;
    if !matches!(action.get(b"S"), Ok(Object::Name(name)) if name == b"GoTo") {
        return None;
    }
    let dest = resolve(source, action.get(b"D").ok()?)?.as_array().ok()?.clone();
    let target = page_target(source, &dest)?;
    let mut action = action.clone();
    action.set("D", Object::Array(dest));
    annot.set("A", Object::Dictionary(action));
    Some((DestinationKey::GoTo, target))
}

fn page_target(source: &Document, dest: &[Object]) -> Option<ObjectId> {
    let id = dest.first()?.as_reference().ok()?;
    is_page_tree_node(source.get_object(id).ok()?).then_some(id)
}

/// Point each link at the output copy of its target page. Links whose
/// target was not assembled lose their destination.
pub(crate) fn retarget_links(
    output: &mut Document,
    fixups: &[(SourceId, LinkFixup)],
    placed: &HashMap<(SourceId, ObjectId), ObjectId>,
) {
    for (source_id, fixup) in fixups {
        let new_target = placed.get(&(*source_id, fixup.target)).copied();
        let Ok(annot) = output
            .get_object_mut(fixup.annotation)
            .and_then(Object::as_dict_mut)
        else {
            continue;
        };

        let key: &[u8] = match fixup.key {
            DestinationKey::Dest => b"Dest",
            DestinationKey::GoTo => b"A",
        };
        let Some(page) = new_target else {
            annot.remove(key);
            continue;
        };
        let dest = match fixup.key {
            DestinationKey::Dest => annot.get_mut(b"Dest"),
            DestinationKey::GoTo => annot
                .get_mut(b"A")
                .and_then(Object::as_dict_mut)
                .and_then(|action| action.get_mut(b"D")),
        };
        if let Ok(Object::Array(items)) = dest {
            if let Some(first) = items.first_mut() {
                *first = Object::Reference(page);
            }
        }
    }
}
