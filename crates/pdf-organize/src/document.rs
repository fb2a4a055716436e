//! lopdf helpers shared by ingestion and assembly
//!
//! Page attributes may live on the page itself or be inherited from any
//! `Pages` node above it, so every lookup here walks the `Parent` chain.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::{Result, Rotation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};

/// Keys a page may inherit from its ancestors
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed page trees with parent cycles
const MAX_TREE_DEPTH: usize = 64;

/// A page rectangle in default user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            bottom: 0.0,
            right: width,
            top: height,
        }
    }

    pub(crate) fn from_array(arr: &[Object]) -> Option<Self> {
        if arr.len() != 4 {
            return None;
        }
        let nums: Vec<f32> = arr.iter().filter_map(extract_number).collect();
        if nums.len() != 4 {
            return None;
        }
        let rect = Self {
            left: nums[0].min(nums[2]),
            bottom: nums[1].min(nums[3]),
            right: nums[0].max(nums[2]),
            top: nums[1].max(nums[3]),
        };
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.left),
            Object::Real(self.bottom),
            Object::Real(self.right),
            Object::Real(self.top),
        ])
    }
}

/// Page object ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Look up a page attribute, following `Parent` links for inheritable keys
pub fn page_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let inheritable = INHERITABLE_KEYS.contains(&key);
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        if !inheritable {
            return None;
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Visible page area: CropBox when present, otherwise MediaBox
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media = resolved_box(doc, page_id, b"MediaBox")
        .unwrap_or_else(|| PageBox::from_size(DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1));
    resolved_box(doc, page_id, b"CropBox").unwrap_or(media)
}

fn resolved_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageBox> {
    let obj = page_attribute(doc, page_id, key)?;
    let obj = match obj {
        Object::Reference(id) => doc.get_object(id).ok()?.clone(),
        other => other,
    };
    PageBox::from_array(obj.as_array().ok()?)
}

/// The `/Rotate` a page already carries in its source document
pub fn intrinsic_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    page_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(Rotation::from_degrees)
        .unwrap_or_default()
}

/// Size of the page as it is displayed, after its intrinsic rotation
pub fn displayed_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let rect = page_box(doc, page_id);
    if intrinsic_rotation(doc, page_id).is_sideways() {
        (rect.height(), rect.width())
    } else {
        (rect.width(), rect.height())
    }
}

/// Extract numeric value from a PDF object
pub fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// The cache maps source ids to output ids. An id is reserved and cached
/// before its target is copied, so reference cycles terminate. References
/// to page tree nodes copy as null: following them would pull in every
/// page of the source.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    copy_filtered(output, source, obj, cache, &HashSet::new())
}

/// Like [`copy_object_deep`], dropping the given keys from the top-level dictionary
pub fn copy_object_without(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
    skip_keys: &[&[u8]],
) -> Result<Object> {
    let skip: HashSet<Vec<u8>> = skip_keys.iter().map(|k| k.to_vec()).collect();
    let resolved = match obj {
        Object::Reference(id) => source.get_object(*id)?,
        other => other,
    };
    copy_filtered(output, source, resolved, cache, &skip)
}

fn copy_filtered(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
    skip: &HashSet<Vec<u8>>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = match source.get_object(*id) {
                Ok(referenced) => referenced,
                // Dangling references are legal PDF and read as null
                Err(_) => return Ok(Object::Null),
            };
            if is_page_tree_node(referenced) {
                return Ok(Object::Null);
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_filtered(output, source, referenced, cache, &HashSet::new())?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache, skip,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_filtered(output, source, item, cache, &HashSet::new()))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let dict = copy_dictionary(output, source, &stream.dict, cache, skip)?;
            Ok(Object::Stream(Stream {
                dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

/// `/Type /Page` or `/Type /Pages`
pub fn is_page_tree_node(obj: &Object) -> bool {
    let Ok(dict) = obj.as_dict() else {
        return false;
    };
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Page" || name == b"Pages")
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
    skip: &HashSet<Vec<u8>>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if skip.contains(key) {
            continue;
        }
        new_dict.set(
            key.clone(),
            copy_filtered(output, source, value, cache, &HashSet::new())?,
        );
    }
    Ok(new_dict)
}
