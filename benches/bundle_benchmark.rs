// SPDX-License-Identifier: MIT
//! Benchmark comparing the inline (V2) and archive (V3) container formats

use casebundle::{
    ArchiveCodec, Bundle, BundleMetadata, ContainerCodec, Document, DocumentContent, InlineCodec,
    Section,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn create_test_bundle() -> Bundle {
    let mut bundle = Bundle::new(BundleMetadata {
        title: "Benchmark v Benchmark".to_string(),
        case_number: "HC-2024-9999".to_string(),
        ..BundleMetadata::default()
    });

    let mut section = Section::new("Exhibits", 0);
    for index in 0..20u32 {
        // 256KB of PDF-like data per document
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend(std::iter::repeat(0xFF).take(256 * 1024));

        let mut doc = Document::new(
            format!("Exhibit {index}"),
            12,
            DocumentContent::new(
                format!("exhibit-{index}.pdf"),
                "application/pdf",
                bytes,
            ),
        );
        doc.order = index;
        section.documents.push(doc);
    }
    bundle.sections.push(section);
    bundle
}

fn benchmark_encode_inline(c: &mut Criterion) {
    let bundle = create_test_bundle();
    let codec = InlineCodec::new();

    c.bench_function("inline_encode", |b| {
        b.iter(|| codec.encode(black_box(&bundle)).unwrap())
    });
}

fn benchmark_encode_archive(c: &mut Criterion) {
    let bundle = create_test_bundle();
    let codec = ArchiveCodec::new();

    c.bench_function("archive_encode", |b| {
        b.iter(|| codec.encode(black_box(&bundle)).unwrap())
    });
}

fn benchmark_decode_inline(c: &mut Criterion) {
    let bundle = create_test_bundle();
    let codec = InlineCodec::new();
    let bytes = codec.encode(&bundle).unwrap();

    c.bench_function("inline_decode", |b| {
        b.iter(|| codec.decode(black_box(bytes.clone())).unwrap())
    });
}

fn benchmark_decode_archive(c: &mut Criterion) {
    let bundle = create_test_bundle();
    let codec = ArchiveCodec::new();
    let bytes = codec.encode(&bundle).unwrap();

    c.bench_function("archive_decode", |b| {
        b.iter(|| codec.decode(black_box(bytes.clone())).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_encode_inline,
    benchmark_encode_archive,
    benchmark_decode_inline,
    benchmark_decode_archive
);
criterion_main!(benches);
