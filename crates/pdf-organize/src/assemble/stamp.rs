//! Page number stamps

use crate::constants::{
    HELVETICA_DIGIT_WIDTH_RATIO, PAGE_NUMBER_FONT_NAME, PAGE_NUMBER_FONT_SIZE, PAGE_NUMBER_GRAY,
    PAGE_NUMBER_OFFSET,
};
use crate::document::PageBox;
use crate::types::{Result, Rotation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Add the shared Helvetica font used for every stamp
pub(crate) fn add_page_number_font(output: &mut Document) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    output.add_object(font_dict)
}

/// Stamp `number` centered at the visual bottom of `page`.
///
/// Reads the page's final `/Rotate`, so call it after rotation is set. The
/// existing content is wrapped in `q`/`Q` so its graphics state cannot
/// leak into the stamp.
pub(crate) fn stamp_page_number(
    output: &mut Document,
    page: &mut Dictionary,
    number: usize,
    font_id: ObjectId,
) -> Result<()> {
    let rect = visible_box(output, page);
    let rotation = page
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .map(Rotation::from_degrees)
        .unwrap_or_default();

    register_font(output, page, font_id)?;

    let text = number.to_string();
    // leading newline: the original content may end mid-line
    let content = format!("\nQ\n{}", page_number_ops(&text, &rect, rotation));
    let stamp_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut contents = vec![Object::Reference(
        output.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
    )];
    match page.get(b"Contents") {
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        Ok(Object::Reference(id)) => match output.get_object(*id) {
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            _ => contents.push(Object::Reference(*id)),
        },
        _ => {}
    }
    contents.push(Object::Reference(stamp_id));
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Text operators placing `text` upright at the visual bottom center
fn page_number_ops(text: &str, rect: &PageBox, rotation: Rotation) -> String {
    let text_width = text.len() as f32 * PAGE_NUMBER_FONT_SIZE * HELVETICA_DIGIT_WIDTH_RATIO;
    let center_x = rect.left + rect.width() / 2.0;
    let center_y = rect.bottom + rect.height() / 2.0;

    // Text matrix: baseline direction, up direction, origin
    let (a, b, c, d, x, y) = match rotation {
        Rotation::None => (
            1.0,
            0.0,
            0.0,
            1.0,
            center_x - text_width / 2.0,
            rect.bottom + PAGE_NUMBER_OFFSET,
        ),
        Rotation::Clockwise90 => (
            0.0,
            1.0,
            -1.0,
            0.0,
            rect.right - PAGE_NUMBER_OFFSET,
            center_y - text_width / 2.0,
        ),
        Rotation::Clockwise180 => (
            -1.0,
            0.0,
            0.0,
            -1.0,
            center_x + text_width / 2.0,
            rect.top - PAGE_NUMBER_OFFSET,
        ),
        Rotation::Clockwise270 => (
            0.0,
            -1.0,
            1.0,
            0.0,
            rect.left + PAGE_NUMBER_OFFSET,
            center_y + text_width / 2.0,
        ),
    };

    format!(
        "q {} g BT /{} {} Tf {} {} {} {} {} {} Tm ({}) Tj ET Q\n",
        PAGE_NUMBER_GRAY,
        PAGE_NUMBER_FONT_NAME,
        PAGE_NUMBER_FONT_SIZE,
        a,
        b,
        c,
        d,
        x,
        y,
        text
    )
}

fn visible_box(output: &Document, page: &Dictionary) -> PageBox {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .find_map(|key| {
            let obj = page.get(key).ok()?;
            let obj = match obj {
                Object::Reference(id) => output.get_object(*id).ok()?,
                other => other,
            };
            PageBox::from_array(obj.as_array().ok()?)
        })
        .unwrap_or_else(|| {
            let (w, h) = crate::constants::DEFAULT_PAGE_DIMENSIONS;
            PageBox::from_size(w, h)
        })
}

/// Put the stamp font into the page's `/Resources /Font`, turning shared
/// dictionaries into page-local ones first
fn register_font(output: &mut Document, page: &mut Dictionary, font_id: ObjectId) -> Result<()> {
    let mut resources = match page.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => output.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    };

    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => output.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    };

    fonts.set(PAGE_NUMBER_FONT_NAME, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}
