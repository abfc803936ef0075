//! Frame encoding benchmark suite.
//!
//! Benchmarks the per-cycle encode cost at capture resolutions:
//! - Resolutions: 640x360, 1280x720
//! - Formats: JPEG at the default quality, PNG
//!
//! Run with: cargo bench --bench encode
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use safety_stream::{FrameEncoder, ImageFormat, VideoSample};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const RESOLUTIONS: &[(u32, u32)] = &[(640, 360), (1280, 720)];

fn sample(width: u32, height: u32) -> VideoSample {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    VideoSample::from_image(&image)
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.sample_size(20);

    for &(width, height) in RESOLUTIONS {
        let frame = sample(width, height);
        let id = format!("{width}x{height}");
        group.throughput(Throughput::Bytes(frame.pixels().len() as u64));

        for format in [ImageFormat::default(), ImageFormat::Png] {
            let encoder = FrameEncoder::new(format);
            let name = match format {
                ImageFormat::Jpeg(_) => "jpeg",
                ImageFormat::Png => "png",
            };

            group.bench_with_input(BenchmarkId::new(name, &id), &frame, |b, frame| {
                b.iter(|| encoder.encode(black_box(frame)));
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Encode + Base64
// ============================================================================

fn bench_wire_payload(c: &mut Criterion) {
    let frame = sample(1280, 720);
    let encoder = FrameEncoder::default();

    c.bench_function("wire_payload_1280x720", |b| {
        b.iter(|| encoder.encode(black_box(&frame)).map(|payload| payload.into_base64()));
    });
}

criterion_group!(benches, bench_encode, bench_wire_payload);
criterion_main!(benches);
