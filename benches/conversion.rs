//! Benchmarks for the conversion pipeline.
//!
//! Run with: cargo bench

use std::io::Cursor;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use html2wordml::{
    ConvertConfig, Converter, ImageResolver, MemoryResolver, Stylesheet, Template, Transformer,
    assemble, parse_html,
};

/// A long article with headings, lists, inline formatting and images.
fn sample_html(sections: usize) -> String {
    let mut html = String::from("<html><head><title>Sample</title></head><body>");
    for i in 0..sections {
        html.push_str(&format!(
            "<h2>Section {i}</h2>\
             <p>Lorem <b>ipsum</b> dolor sit <i>amet</i>, consectetur <a href='#'>adipiscing</a> elit.\n\
             Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.</p>\
             <ul><li>first</li><li>second<ol><li>nested</li></ol></li></ul>\
             <pre>fn main() {{\n    println!(\"{i}\");\n}}</pre>\
             <p><img src='img/figure{}.png' alt='Figure {i}'></p>",
            i % 8
        ));
    }
    html.push_str("</body></html>");
    html
}

fn resolver() -> MemoryResolver {
    let mut resolver = MemoryResolver::new();
    for i in 0..8 {
        let mut buf = Cursor::new(Vec::new());
        image::RgbImage::new(64 + i, 48)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        resolver.insert(format!("http://host/img/figure{i}.png"), buf.into_inner());
    }
    resolver
}

// ============================================================================
// Pipeline stages
// ============================================================================

fn bench_parse_html(c: &mut Criterion) {
    let html = sample_html(100);

    c.bench_function("parse_html", |b| {
        b.iter(|| parse_html(html.as_bytes()));
    });
}

fn bench_transform(c: &mut Criterion) {
    let doc = parse_html(sample_html(100).as_bytes());
    let transformer = Transformer::new(Arc::new(Stylesheet::bundled().unwrap()));

    c.bench_function("transform", |b| {
        b.iter(|| transformer.transform(&doc));
    });
}

fn bench_assemble(c: &mut Criterion) {
    let doc = parse_html(sample_html(100).as_bytes());
    let transformer = Transformer::new(Arc::new(Stylesheet::bundled().unwrap()));
    let markup = transformer.transform(&doc);
    let images = resolver().resolve("http://host", &doc).unwrap();
    let template = Template::bundled().unwrap();

    c.bench_function("assemble", |b| {
        b.iter(|| assemble(&template, &markup, &images).unwrap());
    });
}

// ============================================================================
// End to end
// ============================================================================

fn bench_convert_package(c: &mut Criterion) {
    let html = sample_html(100);
    let converter = Converter::builder()
        .resolver(Arc::new(resolver()))
        .build()
        .unwrap();

    c.bench_function("convert_package", |b| {
        b.iter(|| converter.convert("http://host", html.as_bytes()).unwrap());
    });
}

fn bench_convert_markup(c: &mut Criterion) {
    let html = sample_html(100);
    let converter = Converter::builder()
        .resolver(Arc::new(resolver()))
        .config(ConvertConfig::default().with_create_package(false))
        .build()
        .unwrap();

    c.bench_function("convert_markup", |b| {
        b.iter(|| converter.convert("http://host", html.as_bytes()).unwrap());
    });
}

criterion_group!(
    benches,
    // Stages
    bench_parse_html,
    bench_transform,
    bench_assemble,
    // End to end
    bench_convert_package,
    bench_convert_markup,
);
criterion_main!(benches);
