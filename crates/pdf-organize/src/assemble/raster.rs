//! Image sources: conversion, embedding and page geometry

use crate::types::*;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

/// Re-encodes rasters that cannot be embedded directly
pub trait ImageConverter: Send + Sync {
    /// Convert `bytes` in `encoding` to PNG
    fn convert_to_png(&self, bytes: &[u8], encoding: &ImageEncoding) -> Result<Vec<u8>>;
}

/// Decodes with the `image` crate and writes PNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterConverter;

impl ImageConverter for RasterConverter {
    fn convert_to_png(&self, bytes: &[u8], encoding: &ImageEncoding) -> Result<Vec<u8>> {
        let format = encoding.image_format().ok_or_else(|| {
            OrganizeError::UnsupportedMime(encoding.mime_type())
        })?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        let mut png = Cursor::new(Vec::new());
        decoded.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

/// An image XObject added to the output document
#[derive(Debug, Clone, Copy)]
pub(crate) struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Where an image sits on its page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ImageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub draw_width: f32,
    pub draw_height: f32,
}

/// Build a page showing one image source. `Parent` is left to the caller.
pub(crate) fn build_image_page(
    output: &mut Document,
    source: &SourceBlob,
    encoding: &ImageEncoding,
    rotation: Rotation,
    orientation: ImageOrientation,
    limit: PaperSize,
    converter: &dyn ImageConverter,
) -> Result<Dictionary> {
    let image = embed_image(output, source, encoding, converter)?;
    let layout = layout_image_page(
        image.width as f32,
        image.height as f32,
        orientation,
        limit,
    );

    let content = format!(
        "q {} 0 0 {} {} {} cm /Im0 Do Q\n",
        layout.draw_width, layout.draw_height, layout.x, layout.y
    );
    let content_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image.id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(layout.page_width),
            Object::Real(layout.page_height),
        ]),
    );
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Reference(content_id));
    if rotation != Rotation::None {
        page_dict.set("Rotate", Object::Integer(rotation.degrees()));
    }

    Ok(page_dict)
}

/// Size the page against the limit and center the image on it.
///
/// One pixel is one point. Pages are only ever scaled down. When the
/// requested orientation disagrees with the image, the page takes the
/// image's box with its sides swapped and the image is fit inside.
pub(crate) fn layout_image_page(
    image_width: f32,
    image_height: f32,
    orientation: ImageOrientation,
    limit: PaperSize,
) -> ImageLayout {
    let (short, long) = limit.sides_pt();
    let image_landscape = image_width > image_height;
    let page_landscape = match orientation {
        ImageOrientation::Auto => image_landscape,
        ImageOrientation::Portrait => false,
        ImageOrientation::Landscape => true,
    };

    let (box_width, box_height) = if page_landscape == image_landscape {
        (image_width, image_height)
    } else {
        (image_height, image_width)
    };
    let (limit_width, limit_height) = if page_landscape {
        (long, short)
    } else {
        (short, long)
    };

    let page_scale = (limit_width / box_width)
        .min(limit_height / box_height)
        .min(1.0);
    let page_width = box_width * page_scale;
    let page_height = box_height * page_scale;

    let fit = (page_width / image_width).min(page_height / image_height);
    let draw_width = image_width * fit;
    let draw_height = image_height * fit;

    ImageLayout {
        page_width,
        page_height,
        x: (page_width - draw_width) / 2.0,
        y: (page_height - draw_height) / 2.0,
        draw_width,
        draw_height,
    }
}

fn embed_image(
    output: &mut Document,
    source: &SourceBlob,
    encoding: &ImageEncoding,
    converter: &dyn ImageConverter,
) -> Result<EmbeddedImage> {
    let decode_error = |e: image::ImageError| OrganizeError::Decode {
        file: source.name().to_string(),
        reason: e.to_string(),
    };

    match encoding {
        ImageEncoding::Jpeg => embed_jpeg(output, source),
        ImageEncoding::Png => {
            let decoded = image::load_from_memory_with_format(source.bytes(), ImageFormat::Png)
                .map_err(decode_error)?;
            embed_decoded(output, &decoded)
        }
        other => {
            let png = converter
                .convert_to_png(source.bytes(), other)
                .map_err(|e| OrganizeError::UnsupportedEncoding {
                    file: source.name().to_string(),
                    reason: e.to_string(),
                })?;
            log::debug!("Converted {} from {} to PNG", source.name(), other.mime_type());
            let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).map_err(
                |e| OrganizeError::UnsupportedEncoding {
                    file: source.name().to_string(),
                    reason: format!("converter produced unreadable PNG: {}", e),
                },
            )?;
            embed_decoded(output, &decoded)
        }
    }
}

/// JPEG data is a valid `DCTDecode` stream as-is for gray and RGB images.
///
/// The decoder reports CMYK scans as RGB, so the component count comes
/// from the frame header instead.
fn embed_jpeg(output: &mut Document, source: &SourceBlob) -> Result<EmbeddedImage> {
    let decode_error = |e: image::ImageError| OrganizeError::Decode {
        file: source.name().to_string(),
        reason: e.to_string(),
    };

    let decoder = ImageReader::with_format(Cursor::new(source.bytes()), ImageFormat::Jpeg)
        .into_decoder()
        .map_err(decode_error)?;
    let (width, height) = decoder.dimensions();
    let color_space: &[u8] = match jpeg_components(source.bytes()) {
        Some(1) => b"DeviceGray",
        Some(3) => b"DeviceRGB",
        // CMYK/YCCK: decode and embed the RGB rendition
        _ => {
            let decoded = image::load_from_memory_with_format(source.bytes(), ImageFormat::Jpeg)
                .map_err(decode_error)?;
            return embed_decoded(output, &decoded);
        }
    };

    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    let id = output.add_object(Stream::new(dict, source.bytes().to_vec()).with_compression(false));

    Ok(EmbeddedImage { id, width, height })
}

/// Component count from the first start-of-frame segment
pub(crate) fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        // fill bytes
        while *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos + 1)?;
        pos += 2;
        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            // start of scan before any frame header
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let length = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]) as usize;
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            return bytes.get(pos + 7).copied();
        }
        if length < 2 {
            return None;
        }
        pos += length;
    }
}

/// Flate-compressed RGB, with the alpha channel as a soft mask
fn embed_decoded(output: &mut Document, decoded: &DynamicImage) -> Result<EmbeddedImage> {
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let smask_id = if decoded.color().has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mut dict = image_dict(width, height, b"DeviceGray");
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        Some(output.add_object(Stream::new(dict, deflate(&alpha)?).with_compression(false)))
    } else {
        None
    };

    let mut dict = image_dict(width, height, b"DeviceRGB");
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    if let Some(smask_id) = smask_id {
        dict.set("SMask", Object::Reference(smask_id));
    }
    let id = output.add_object(Stream::new(dict, deflate(rgb.as_raw())?).with_compression(false));

    Ok(EmbeddedImage { id, width, height })
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
