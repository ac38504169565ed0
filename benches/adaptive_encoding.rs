use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use vfd_display::{AdaptiveEncoder, CodePage, classify};

const SAMPLES: [(&str, &str); 5] = [
    ("Total: 19.99", "ASCII"),
    ("Crème brûlée", "PC437 accents"),
    ("Ørsted Åbyhøj", "PC850 letters"),
    ("Promoção de verão", "Portuguese"),
    ("Preço: €4,50", "Euro with Portuguese"),
];

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Classify");
    for (text, description) in SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(description), text, |b, input| {
            b.iter(|| classify(black_box(input)))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("Encode");
    for (text, description) in SAMPLES {
        group.bench_with_input(
            BenchmarkId::new("Fresh encoder", description),
            text,
            |b, input| {
                b.iter(|| AdaptiveEncoder::new().encode_text(black_box(input)))
            },
        );
        group.bench_with_input(
            BenchmarkId::new("Warm encoder", description),
            text,
            |b, input| {
                let mut encoder = AdaptiveEncoder::new();
                encoder.encode_text(input);
                b.iter(|| encoder.encode_text(black_box(input)))
            },
        );
    }
    group.finish();

    c.bench_function("Decode PC858 upper half", |b| {
        let bytes: Vec<u8> = (0x80..=0xFF).collect();
        let table = CodePage::CP_858.table();
        b.iter(|| table.decode(black_box(&bytes)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
