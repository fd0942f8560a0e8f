use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memlens::core::types::AobPattern;
use memlens::memory::scanner::find_pattern_matches;

fn haystack(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(97)).collect();
    // plant a handful of needles
    for at in (0..len).step_by(len / 8) {
        if at + 4 <= len {
            data[at..at + 4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        }
    }
    data
}

fn benchmark_exact_scan(c: &mut Criterion) {
    let data = haystack(1024 * 1024);
    let pattern = AobPattern::from_hex_string("de ad be ef").unwrap();
    c.bench_function("exact_scan_1mib", |b| {
        b.iter(|| find_pattern_matches(black_box(&data), black_box(&pattern)));
    });
}

fn benchmark_wildcard_scan(c: &mut Criterion) {
    let data = haystack(1024 * 1024);
    let pattern = AobPattern::from_hex_string("de ?? be ??").unwrap();
    c.bench_function("wildcard_scan_1mib", |b| {
        b.iter(|| find_pattern_matches(black_box(&data), black_box(&pattern)));
    });
}

criterion_group!(benches, benchmark_exact_scan, benchmark_wildcard_scan);
criterion_main!(benches);
