use criterion::{Criterion, black_box, criterion_group, criterion_main};
use xaurum_processor::normalize::{normalize_cert_name, normalize_date_text, normalize_id};

const IDS: &[&str] = &["SAP-0010001", "G100", "  00123 ", "", "12", "DE 4711-0815-42"];

const DATES: &[&str] = &[
    "2025-06-01",
    "01/02/2023",
    "31-12-2026",
    "20250304",
    "2024-05-01 00:00:00",
    "onbeperkt",
    "not a date",
];

const CERT_NAMES: &[&str] = &[
    "EQUANS_VCA",
    "EA-E-204-BA5 Safety",
    "EA-E-101   BA5 Safety  refresher",
    "Hoogspanning   Niveau 2",
];

fn bench_normalizers(c: &mut Criterion) {
    c.bench_function("normalize_id", |b| {
        b.iter(|| {
            for raw in IDS {
                black_box(normalize_id(black_box(raw)));
            }
        })
    });

    c.bench_function("normalize_date_text", |b| {
        b.iter(|| {
            for raw in DATES {
                black_box(normalize_date_text(black_box(raw)));
            }
        })
    });

    c.bench_function("normalize_cert_name", |b| {
        b.iter(|| {
            for raw in CERT_NAMES {
                black_box(normalize_cert_name(black_box(raw)));
            }
        })
    });
}

criterion_group!(benches, bench_normalizers);
criterion_main!(benches);
