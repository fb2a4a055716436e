#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_organize::*;
use std::io::Cursor;

/// A PDF whose page `i` (1-based) is `600 + i` points wide, so copies can
/// be told apart in the output
pub fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 1..=num_pages {
        let content = format!("% source page {}\nq Q\n", i);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(600 + i as i64),
                    Object::Integer(800),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn pdf_bytes(num_pages: usize) -> Vec<u8> {
    to_bytes(create_test_pdf(num_pages))
}

/// Like [`pdf_bytes`], with a link on page `from` jumping to page `to`
pub fn linked_pdf_bytes(num_pages: usize, from: usize, to: usize) -> Vec<u8> {
    let mut doc = create_test_pdf(num_pages);
    let pages = doc.get_pages();
    let from_id = pages[&(from as u32)];
    let to_id = pages[&(to as u32)];

    let link_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        (
            "Rect",
            Object::Array(vec![
                Object::Integer(10),
                Object::Integer(10),
                Object::Integer(100),
                Object::Integer(30),
            ]),
        ),
        (
            "Dest",
            Object::Array(vec![Object::Reference(to_id), Object::Name(b"Fit".to_vec())]),
        ),
        ("P", Object::Reference(from_id)),
    ]));
    doc.get_dictionary_mut(from_id)
        .unwrap()
        .set("Annots", Object::Array(vec![Object::Reference(link_id)]));
    to_bytes(doc)
}

/// Like [`pdf_bytes`], with `/Rotate` set on the page tree root
pub fn rotated_pdf_bytes(num_pages: usize, degrees: i64) -> Vec<u8> {
    let mut doc = create_test_pdf(num_pages);
    let pages_id = doc
        .catalog()
        .unwrap()
        .get(b"Pages")
        .unwrap()
        .as_reference()
        .unwrap();
    doc.get_dictionary_mut(pages_id)
        .unwrap()
        .set("Rotate", Object::Integer(degrees));
    to_bytes(doc)
}

pub fn encode(image: image::DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
    encode(img.into(), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 200]));
    encode(img.into(), ImageFormat::Jpeg)
}

/// Four-component (CMYK) JPEG, which decoders hand back as RGB
pub fn cmyk_jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
    let pixels = [30u8, 200, 0, 10].repeat(width as usize * height as usize);
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, 90)
        .encode(&pixels, width, height, jpeg_encoder::ColorType::Cmyk)
        .unwrap();
    out
}

pub fn webp_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 255, 0, 255]));
    encode(img.into(), ImageFormat::WebP)
}

pub fn pdf_upload(name: &str, num_pages: usize) -> Upload {
    Upload::new(name, "application/pdf", pdf_bytes(num_pages))
}

pub fn png_upload(name: &str) -> Upload {
    Upload::new(name, "image/png", png_bytes(40, 30))
}

/// Converter that always fails, standing in for a broken re-encoder
pub struct FailingConverter;

impl ImageConverter for FailingConverter {
    fn convert_to_png(&self, _bytes: &[u8], encoding: &ImageEncoding) -> Result<Vec<u8>> {
        Err(OrganizeError::Render(format!(
            "cannot convert {}",
            encoding.mime_type()
        )))
    }
}

// =============================================================================
// Output inspection
// =============================================================================

pub fn output_pages(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("not a number: {:?}", other),
    }
}

pub fn media_width(doc: &Document, page_id: ObjectId) -> f32 {
    let page = doc.get_dictionary(page_id).unwrap();
    let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
    number(&media[2]) - number(&media[0])
}

pub fn rotate_of(doc: &Document, page_id: ObjectId) -> i64 {
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0)
}

pub fn content_text(doc: &Document, page_id: ObjectId) -> String {
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

/// Every `/Type /Page` dictionary in the file, reachable or not
pub fn page_objects(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|obj| {
            matches!(
                obj.as_dict().and_then(|d| d.get(b"Type")),
                Ok(Object::Name(name)) if name == b"Page"
            )
        })
        .count()
}

/// The annotation objects on an output page
pub fn annotations(doc: &Document, page_id: ObjectId) -> Vec<Dictionary> {
    let page = doc.get_dictionary(page_id).unwrap();
    let Ok(annots) = page.get(b"Annots").and_then(Object::as_array) else {
        return Vec::new();
    };
    annots
        .iter()
        .map(|a| doc.get_dictionary(a.as_reference().unwrap()).unwrap().clone())
        .collect()
}

pub fn has_image(doc: &Document, page_id: ObjectId) -> bool {
    let page = doc.get_dictionary(page_id).unwrap();
    page.get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .map(|x| x.has(b"Im0"))
        .unwrap_or(false)
}
