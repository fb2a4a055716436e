mod common;

use common::*;
use lopdf::{Document, Object};
use pdf_organize::*;

fn numbered() -> AssemblyOptions {
    AssemblyOptions {
        add_page_numbers: true,
        ..Default::default()
    }
}

#[test]
fn test_scenario_rotated_image_moved_to_front() {
    let mut session = Session::new();
    session.add(ingest(pdf_upload("doc.pdf", 3)).unwrap());
    session.add(ingest(png_upload("pic.png")).unwrap());

    let indices: Vec<(String, u32)> = session
        .pages()
        .iter()
        .map(|p| (p.file_name().to_string(), p.page_index()))
        .collect();
    assert_eq!(
        indices,
        vec![
            ("doc.pdf".to_string(), 1),
            ("doc.pdf".to_string(), 2),
            ("doc.pdf".to_string(), 3),
            ("pic.png".to_string(), 1),
        ]
    );

    let image_page = session.pages().ids()[3];
    session.rotate(image_page);
    session.rotate(image_page);
    session.reorder(image_page, 0);

    let assembly = assemble_pages(session.pages().as_slice(), &numbered()).unwrap();
    assert_eq!(assembly.page_count, 4);
    assert!(assembly.skipped.is_empty());

    let output = Document::load_mem(&assembly.bytes).unwrap();
    let pages = output_pages(&output);
    assert_eq!(pages.len(), 4);

    // the rotated image comes first
    assert!(has_image(&output, pages[0]));
    assert_eq!(rotate_of(&output, pages[0]), 180);
    assert!(content_text(&output, pages[0]).contains("(1) Tj"));

    // then the document in source order, numbered by output position
    for (position, page_id) in pages.iter().enumerate().skip(1) {
        assert!(!has_image(&output, *page_id));
        assert_eq!(media_width(&output, *page_id), 600.0 + position as f32);
        assert_eq!(rotate_of(&output, *page_id), 0);

        let text = content_text(&output, *page_id);
        assert!(text.contains(&format!("% source page {}", position)));
        assert!(text.contains(&format!("({}) Tj", position + 1)));
    }

    // assembly reads the list without changing it
    assert_eq!(session.pages().ids()[0], image_page);
    assert_eq!(session.pages().len(), 4);
}

#[test]
fn test_empty_list_is_an_error() {
    let result = assemble_pages(&[], &AssemblyOptions::default());
    assert!(matches!(result, Err(OrganizeError::EmptyInput)));
}

#[tokio::test]
async fn test_async_empty_list_is_an_error() {
    let result = assemble(Vec::new(), AssemblyOptions::default()).await;
    assert!(matches!(result, Err(OrganizeError::EmptyInput)));
}

#[test]
fn test_failed_conversion_skips_page() {
    let upload = Upload::new("anim.webp", "image/webp", webp_bytes(16, 16));
    let ingested = ingest(upload).unwrap();

    let assembly = Assembler::new(AssemblyOptions::default())
        .with_converter(FailingConverter)
        .assemble(&ingested.pages)
        .unwrap();

    assert_eq!(assembly.page_count, 0);
    assert_eq!(assembly.skipped.len(), 1);
    assert_eq!(assembly.skipped[0].file_name, "anim.webp");
    assert_eq!(assembly.skipped[0].page, ingested.pages[0].id());
    assert!(matches!(
        assembly.skipped[0].error,
        OrganizeError::UnsupportedEncoding { .. }
    ));

    let output = Document::load_mem(&assembly.bytes).unwrap();
    assert_eq!(output.get_pages().len(), 0);
}

#[test]
fn test_skipped_page_leaves_no_objects_behind() {
    let doc = ingest(pdf_upload("doc.pdf", 2)).unwrap();
    let webp = ingest(Upload::new("x.webp", "image/webp", webp_bytes(8, 8))).unwrap();
    let pages = vec![
        doc.pages[0].clone(),
        webp.pages[0].clone(),
        doc.pages[1].clone(),
    ];

    let with_failure = Assembler::new(numbered())
        .with_converter(FailingConverter)
        .assemble(&pages)
        .unwrap();
    let without = assemble_pages(&[doc.pages[0].clone(), doc.pages[1].clone()], &numbered())
        .unwrap();

    assert_eq!(with_failure.page_count, 2);
    assert_eq!(with_failure.skipped.len(), 1);

    let a = Document::load_mem(&with_failure.bytes).unwrap();
    let b = Document::load_mem(&without.bytes).unwrap();
    assert_eq!(a.objects.len(), b.objects.len());

    // numbering follows the output, not the input list
    let out = output_pages(&a);
    assert!(content_text(&a, out[0]).contains("(1) Tj"));
    assert!(content_text(&a, out[1]).contains("(2) Tj"));
}

#[test]
fn test_default_converter_handles_webp() {
    let ingested = ingest(Upload::new("leaf.webp", "image/webp", webp_bytes(30, 60))).unwrap();

    let assembly = assemble_pages(&ingested.pages, &AssemblyOptions::default()).unwrap();
    assert_eq!(assembly.page_count, 1);
    assert!(assembly.skipped.is_empty());

    let output = Document::load_mem(&assembly.bytes).unwrap();
    let page = output_pages(&output)[0];
    assert!(has_image(&output, page));
    assert_eq!(media_width(&output, page), 30.0);
}

#[test]
fn test_dropped_source_is_unavailable() {
    let ingested = ingest(pdf_upload("gone.pdf", 2)).unwrap();
    let Ingested { source, pages } = ingested;
    drop(source);

    let assembly = assemble_pages(&pages, &AssemblyOptions::default()).unwrap();
    assert_eq!(assembly.page_count, 0);
    assert_eq!(assembly.skipped.len(), 2);
    for skipped in &assembly.skipped {
        assert!(matches!(
            skipped.error,
            OrganizeError::SourceUnavailable { .. }
        ));
        assert_eq!(skipped.file_name, "gone.pdf");
    }
}

#[test]
fn test_output_follows_list_order() {
    let a = ingest(pdf_upload("a.pdf", 3)).unwrap();
    let pages = vec![
        a.pages[2].clone(),
        a.pages[0].clone(),
        a.pages[1].clone(),
        a.pages[0].clone(),
    ];

    let assembly = assemble_pages(&pages, &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();
    let widths: Vec<f32> = output_pages(&output)
        .into_iter()
        .map(|id| media_width(&output, id))
        .collect();
    assert_eq!(widths, vec![603.0, 601.0, 602.0, 601.0]);
}

#[test]
fn test_rotation_adds_to_intrinsic_rotation() {
    let upload = Upload::new("turned.pdf", "application/pdf", rotated_pdf_bytes(1, 90));
    let ingested = ingest(upload).unwrap();

    let mut list = PageList::new();
    list.append(ingested.pages);
    let id = list.ids()[0];

    let untouched = assemble_pages(list.as_slice(), &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&untouched.bytes).unwrap();
    assert_eq!(rotate_of(&output, output_pages(&output)[0]), 90);

    list.rotate(id);
    list.rotate(id);
    list.rotate(id);
    let turned = assemble_pages(list.as_slice(), &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&turned.bytes).unwrap();
    // 90 + 270 wraps to upright, which carries no /Rotate
    assert!(
        output
            .get_dictionary(output_pages(&output)[0])
            .unwrap()
            .get(b"Rotate")
            .is_err()
    );
}

#[test]
fn test_jpeg_is_embedded_without_reencoding() {
    let bytes = jpeg_bytes(64, 32);
    let ingested = ingest(Upload::new("photo.jpeg", "image/jpeg", bytes.clone())).unwrap();

    let assembly = assemble_pages(&ingested.pages, &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();

    let jpeg_stream = output.objects.values().find_map(|obj| match obj {
        Object::Stream(stream)
            if matches!(stream.dict.get(b"Filter"), Ok(Object::Name(name)) if name == b"DCTDecode") =>
        {
            Some(stream.content.clone())
        }
        _ => None,
    });
    assert_eq!(jpeg_stream, Some(bytes));
}

#[test]
fn test_link_to_missing_page_does_not_pull_in_source() {
    let ingested = ingest(Upload::new(
        "linked.pdf",
        "application/pdf",
        linked_pdf_bytes(3, 1, 3),
    ))
    .unwrap();

    let assembly =
        assemble_pages(&ingested.pages[..1], &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();

    assert_eq!(assembly.page_count, 1);
    assert_eq!(page_objects(&output), 1);
    let sources: Vec<_> = output
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|stream| stream.content.starts_with(b"% source page"))
        .collect();
    assert_eq!(sources.len(), 1);

    // the link stays, without a destination
    let page = output_pages(&output)[0];
    let links = annotations(&output, page);
    assert_eq!(links.len(), 1);
    assert!(!links[0].has(b"Dest"));
    assert!(!links[0].has(b"P"));
}

#[test]
fn test_link_follows_its_target_page() {
    let ingested = ingest(Upload::new(
        "linked.pdf",
        "application/pdf",
        linked_pdf_bytes(3, 1, 3),
    ))
    .unwrap();

    // target placed before the page holding the link
    let pages = vec![ingested.pages[2].clone(), ingested.pages[0].clone()];
    let assembly = assemble_pages(&pages, &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();

    assert_eq!(page_objects(&output), 2);
    let out = output_pages(&output);
    let links = annotations(&output, out[1]);
    let dest = links[0].get(b"Dest").unwrap().as_array().unwrap();
    assert_eq!(dest[0].as_reference().unwrap(), out[0]);
    assert_eq!(media_width(&output, out[0]), 603.0);
}

#[test]
fn test_cmyk_jpeg_is_decoded_to_rgb() {
    let bytes = cmyk_jpeg_bytes(16, 8);
    let ingested = ingest(Upload::new("print.jpg", "image/jpeg", bytes)).unwrap();

    let assembly = assemble_pages(&ingested.pages, &AssemblyOptions::default()).unwrap();
    assert_eq!(assembly.page_count, 1);
    assert!(assembly.skipped.is_empty());

    let output = Document::load_mem(&assembly.bytes).unwrap();
    let images: Vec<_> = output
        .objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream)
                if matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image") =>
            {
                Some(&stream.dict)
            }
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 1);
    let image = images[0];
    assert_eq!(image.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
    assert_eq!(image.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
    assert_eq!(image.get(b"Width").unwrap().as_i64().unwrap(), 16);
}

#[test]
fn test_png_alpha_becomes_soft_mask() {
    let ingested = ingest(png_upload("alpha.png")).unwrap();

    let assembly = assemble_pages(&ingested.pages, &AssemblyOptions::default()).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();

    let has_smask = output.objects.values().any(|obj| match obj {
        Object::Stream(stream) => stream.dict.has(b"SMask"),
        _ => false,
    });
    assert!(has_smask);
}

#[test]
fn test_forced_landscape_image_page() {
    let ingested = ingest(Upload::new("tall.png", "image/png", png_bytes(100, 200))).unwrap();
    let options = AssemblyOptions {
        image_orientation: ImageOrientation::Landscape,
        ..Default::default()
    };

    let assembly = assemble_pages(&ingested.pages, &options).unwrap();
    let output = Document::load_mem(&assembly.bytes).unwrap();
    assert_eq!(media_width(&output, output_pages(&output)[0]), 200.0);
}

#[test]
fn test_invalid_options_are_rejected() {
    let ingested = ingest(png_upload("pic.png")).unwrap();
    let options = AssemblyOptions {
        image_page_limit: PaperSize::Custom {
            width_mm: 0.0,
            height_mm: 100.0,
        },
        ..Default::default()
    };

    assert!(matches!(
        assemble_pages(&ingested.pages, &options),
        Err(OrganizeError::Config(_))
    ));
}
