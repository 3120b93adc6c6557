//! End-to-end conversion tests.
//!
//! Images are generated in memory and served through a `MemoryResolver`, so
//! nothing here touches the network.

use std::io::{Cursor, Read};
use std::sync::Arc;

use html2wordml::transform::XML_DECLARATION;
use html2wordml::{ConvertConfig, Converter, Error, MemoryResolver, Output};
use image::{ImageFormat, RgbImage};
use zip::ZipArchive;

const BASE: &str = "http://host";

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::new(width, height).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn converter(resolver: MemoryResolver, create_package: bool) -> Converter {
    Converter::builder()
        .resolver(Arc::new(resolver))
        .config(ConvertConfig::default().with_create_package(create_package))
        .build()
        .expect("bundled assets are valid")
}

fn entry(package: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    let mut out = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
}

fn entry_names(package: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(package)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

// ============================================================================
// Package mode
// ============================================================================

#[test]
fn test_text_only_document() {
    let converter = converter(MemoryResolver::new(), true);
    let output = converter
        .convert(BASE, b"<h1>Title</h1><p>Hello <b>world</b></p>")
        .unwrap();

    let Output::Package(package) = output else {
        panic!("expected a package");
    };
    let document = entry(&package, "word/document.xml");
    assert!(document.starts_with(XML_DECLARATION));
    assert!(document.contains(r#"<w:pStyle w:val="Heading1"/>"#));
    assert!(document.contains(">Hello </w:t>"));
    assert!(document.contains("<w:rPr><w:b/></w:rPr>"));
    assert!(!document.contains("-$"));

    // Nothing to add, so the manifest is the template's, byte for byte.
    let template = converter.template();
    let mut original = String::new();
    ZipArchive::new(Cursor::new(template.as_bytes()))
        .unwrap()
        .by_name("word/_rels/document.xml.rels")
        .unwrap()
        .read_to_string(&mut original)
        .unwrap();
    assert_eq!(entry(&package, "word/_rels/document.xml.rels"), original);
}

#[test]
fn test_image_is_embedded() {
    let png = encode(96, 48, ImageFormat::Png);
    let resolver = MemoryResolver::new().with("http://host/a/b/pic.png", png.clone());
    let converter = converter(resolver, true);

    let package = converter
        .convert(BASE, br#"<p>Look: <img src="a/b/pic.png" alt="A picture"></p>"#)
        .unwrap()
        .into_bytes();

    let document = entry(&package, "word/document.xml");
    assert!(document.contains(r#"<wp:extent cx="914400" cy="457200"/>"#));
    assert!(document.contains(r#"<a:blip r:embed="pic.png"/>"#));
    assert!(document.contains(r#"descr="A picture""#));
    assert!(!document.contains("-$"));

    let rels = entry(&package, "word/_rels/document.xml.rels");
    assert!(rels.contains(
        r#"<Relationship Id="pic.png" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/pic.png"/>"#
    ));

    let mut archive = ZipArchive::new(Cursor::new(&package[..])).unwrap();
    let mut media = Vec::new();
    archive
        .by_name("word/media/pic.png")
        .unwrap()
        .read_to_end(&mut media)
        .unwrap();
    assert_eq!(media, png);
}

#[test]
fn test_media_precedes_document_and_order_is_kept() {
    let resolver = MemoryResolver::new()
        .with("http://host/z.gif", encode(2, 2, ImageFormat::Gif))
        .with("http://host/m.jpg", encode(4, 3, ImageFormat::Jpeg));
    let converter = converter(resolver, true);

    let package = converter
        .convert(BASE, br#"<img src="z.gif"><img src="m.jpg">"#)
        .unwrap()
        .into_bytes();

    let names = entry_names(&package);
    let doc = names.iter().position(|n| n == "word/document.xml").unwrap();
    assert_eq!(&names[doc - 2..doc], ["word/media/m.jpg", "word/media/z.gif"]);

    let others: Vec<&String> = names.iter().filter(|n| !n.starts_with("word/media/")).collect();
    let template: Vec<&String> = converter.template().entries().iter().collect();
    assert_eq!(others, template);
}

#[test]
fn test_identical_input_gives_identical_package() {
    let resolver = MemoryResolver::new().with("http://host/p.bmp", encode(5, 5, ImageFormat::Bmp));
    let converter = converter(resolver, true);
    let html = br#"<ul><li>one</li><li>two <img src="p.bmp"></li></ul>"#;

    let first = converter.convert(BASE, html).unwrap();
    let second = converter.convert(BASE, html).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_image_fails_and_writes_nothing() {
    let converter = converter(MemoryResolver::new(), true);

    let mut sink = Vec::new();
    let err = converter
        .convert_to_writer(BASE, br#"<img src="img/gone.png">"#, &mut sink)
        .unwrap_err();

    match err {
        Error::ImageFetch { src, location, .. } => {
            assert_eq!(src, "img/gone.png");
            assert_eq!(location, "http://host/img/gone.png");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.is_empty());
}

// Two different sources with the same file name end up as one media entry:
// the first source's bytes are embedded and both drawings point at it. The
// base and src are joined literally, hence the double slash.
#[test]
fn test_file_name_collision_uses_literal_join() {
    let first = encode(1, 2, ImageFormat::Png);
    let resolver = MemoryResolver::new()
        .with("http://host//x/pic.png", first.clone())
        .with("http://host//y/pic.png", encode(9, 9, ImageFormat::Png));
    let converter = converter(resolver, true);

    let package = converter
        .convert(BASE, br#"<img src="/x/pic.png"><img src="/y/pic.png">"#)
        .unwrap()
        .into_bytes();

    let names = entry_names(&package);
    let media: Vec<&String> = names.iter().filter(|n| n.starts_with("word/media/")).collect();
    assert_eq!(media, ["word/media/pic.png"]);

    let document = entry(&package, "word/document.xml");
    assert_eq!(document.matches(r#"r:embed="pic.png""#).count(), 2);
    assert_eq!(document.matches(r#"<wp:extent cx="9525" cy="19050"/>"#).count(), 2);

    let rels = entry(&package, "word/_rels/document.xml.rels");
    assert_eq!(rels.matches(r#"Id="pic.png""#).count(), 1);
}

// ============================================================================
// Markup mode
// ============================================================================

#[test]
fn test_markup_mode_keeps_placeholders() {
    let resolver = MemoryResolver::new().with("http://host/a/b/pic.png", encode(3, 3, ImageFormat::Png));
    let converter = converter(resolver, false);

    let output = converter
        .convert(BASE, br#"<p><img src="a/b/pic.png"></p>"#)
        .unwrap();
    let Output::Markup(markup) = output else {
        panic!("expected markup");
    };
    let markup = String::from_utf8(markup).unwrap();

    assert!(markup.starts_with(XML_DECLARATION));
    assert!(markup.contains(r#"<wp:extent cx="a/b/pic.png-$width" cy="a/b/pic.png-$height"/>"#));
    assert!(markup.contains(r#"r:embed="a/b/pic.png-$rid""#));
}

#[test]
fn test_markup_mode_fails_on_missing_image() {
    let converter = converter(MemoryResolver::new(), false);

    let err = converter
        .convert(BASE, br#"<p><img src="gone.png"></p>"#)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ImageFetch { ref location, .. } if location == "http://host/gone.png"
    ));
}

#[test]
fn test_markup_mode_fails_on_undecodable_image() {
    let resolver = MemoryResolver::new().with("http://host/bad.png", b"not an image".to_vec());
    let converter = converter(resolver, false);

    let err = converter.convert(BASE, br#"<img src="bad.png">"#).unwrap_err();
    assert!(matches!(err, Error::ImageDecode { ref src, .. } if src == "bad.png"));
}

// Alt text and file names come from the document and must never be taken
// for image placeholders.
#[test]
fn test_placeholder_shaped_alt_text() {
    let png = encode(2, 2, ImageFormat::Png);
    let resolver = MemoryResolver::new()
        .with("http://host/a.png", png.clone())
        .with("http://host/x/b.png-$rid", png);
    let converter = converter(resolver, true);

    let package = converter
        .convert(
            BASE,
            br#"<img src="a.png" alt="b.png-$rid"><img src="a.png" alt="a.png-$width"><img src="x/b.png-$rid">"#,
        )
        .unwrap()
        .into_bytes();

    let document = entry(&package, "word/document.xml");
    assert!(document.contains(r#"descr="b.png-&#36;rid""#));
    assert!(document.contains(r#"descr="a.png-&#36;width""#));
    assert!(document.contains(r#"name="b.png-&#36;rid""#));
    assert!(!document.contains("-$"));
}

#[test]
fn test_markup_equals_package_document_for_text() {
    let html = b"<h2>Section</h2><p>Some <i>text</i>.</p><pre>a\n  b</pre>";
    let markup = converter(MemoryResolver::new(), false)
        .convert(BASE, html)
        .unwrap()
        .into_bytes();
    let package = converter(MemoryResolver::new(), true)
        .convert(BASE, html)
        .unwrap()
        .into_bytes();

    assert_eq!(entry(&package, "word/document.xml").into_bytes(), markup);
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_malformed_html_converts() {
    let converter = converter(MemoryResolver::new(), false);
    let html = b"<p>unclosed <b>bold <i>both</b> italic? <p>next &amp; last";

    let markup = String::from_utf8(converter.convert(BASE, html).unwrap().into_bytes()).unwrap();
    assert!(markup.contains(">unclosed </w:t>"));
    assert!(markup.contains(">next &amp; last</w:t>"));
    assert_eq!(markup.matches("<w:p>").count(), 2);
}

#[test]
fn test_lists_and_levels() {
    let converter = converter(MemoryResolver::new(), false);
    let html = b"<ol><li>one<ol><li>nested</li></ol></li></ol><ul><li>dot</li></ul>";

    let markup = String::from_utf8(converter.convert(BASE, html).unwrap().into_bytes()).unwrap();
    assert!(markup.contains(r#"<w:ilvl w:val="0"/><w:numId w:val="2"/>"#));
    assert!(markup.contains(r#"<w:ilvl w:val="1"/><w:numId w:val="2"/>"#));
    assert!(markup.contains(r#"<w:ilvl w:val="0"/><w:numId w:val="1"/>"#));
}

#[test]
fn test_convenience_function_markup() {
    let out = html2wordml::convert(BASE, b"<p>plain</p>", false).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with(XML_DECLARATION));
    assert!(out.contains(">plain</w:t>"));
}
