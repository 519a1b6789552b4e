use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use phashstore::imaging::{ImageHasher, PerceptualAlgorithm, PerceptualHasher};
use phashstore::index::DedupIndex;
use phashstore::matcher::{MatchMode, Matcher};
use phashstore::sampler::Sampler;
use phashstore::{Fingerprint, Identifier};

// Spread values so neighbours are far apart in Hamming space
fn populated_index(size: usize) -> DedupIndex {
    let index = DedupIndex::new();
    index.rebuild((0..size as u64).map(|i| {
        Fingerprint::new(i.wrapping_mul(0x9E37_79B9_7F4A_7C15)).to_identifier()
    }));
    index
}

// 1. Similarity scan, sequential below the parallel cutoff and rayon above it
fn bench_similarity_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_scan");
    let matcher = Matcher::new();
    // No stored fingerprint is this close, so every scan is a full miss
    let candidate = Fingerprint::new(0x0123_4567_89AB_CDEF);

    for size in [1_000usize, 10_000, 100_000] {
        let index = populated_index(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| {
                let hit = matcher.find_match(index, candidate, MatchMode::Similar { threshold: 2 });
                black_box(hit);
            })
        });
    }
    group.finish();
}

// 2. Exact lookups through the prefix buckets
fn bench_exact_lookup(c: &mut Criterion) {
    let index = populated_index(100_000);
    let present = Fingerprint::new(777u64.wrapping_mul(0x9E37_79B9_7F4A_7C15)).to_identifier();

    c.bench_function("exists_100k", |b| {
        b.iter(|| black_box(index.exists(present.as_str()).unwrap()))
    });
}

// 3. Random picks with light and heavy exclusion
fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    let index = populated_index(10_000);
    let all = index.enumerate();
    let sampler = Sampler::with_seed(7);

    let light: Vec<Identifier> = all.iter().take(10).cloned().collect();
    let heavy: Vec<Identifier> = all.iter().take(9_000).cloned().collect();

    group.bench_function("rejection", |b| {
        b.iter(|| black_box(sampler.pick(&index, &light)))
    });
    group.bench_function("linear", |b| {
        b.iter(|| black_box(sampler.pick(&index, &heavy)))
    });
    group.finish();
}

// 4. Perceptual hashing of a decoded image
fn bench_perceptual(c: &mut Criterion) {
    let mut group = c.benchmark_group("perceptual_hasher");
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(256, 256, |x, y| {
        Rgb([x as u8, y as u8, 128u8])
    }));

    for alg in [
        PerceptualAlgorithm::Phash,
        PerceptualAlgorithm::Dhash,
        PerceptualAlgorithm::Ahash,
    ] {
        let hasher = PerceptualHasher::new(alg);
        group.bench_with_input(format!("{:?}", alg), &img, |b, img| {
            b.iter(|| black_box(hasher.fingerprint(img).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_similarity_scan,
    bench_exact_lookup,
    bench_sampler,
    bench_perceptual
);
criterion_main!(benches);
