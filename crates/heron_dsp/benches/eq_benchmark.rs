//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p heron_dsp

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use heron_dsp::{BitDepth, Equalizer, EqualizerSettings};

fn stereo_frame(frames: usize) -> Vec<i32> {
    (0..frames * 2)
        .map(|i| ((i as f32 * 0.001).sin() * 16000.0) as i32)
        .collect()
}

fn benchmark_equalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalizer");

    // Common buffer sizes in audio applications
    let buffer_sizes = [64, 256, 1024, 2048];

    for size in buffer_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("equalize_default_{}_frames", size), |b| {
            let settings = Arc::new(EqualizerSettings::default());
            let mut eq = Equalizer::new(settings, 2, BitDepth::Sixteen).unwrap();
            let frame = stereo_frame(size);

            b.iter(|| {
                black_box(eq.equalize(black_box(&frame), 48000).unwrap());
            });
        });
    }

    group.finish();
}

fn benchmark_band_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalizer_bands");

    for bands in [1_u32, 4, 10] {
        group.bench_function(format!("equalize_{}_bands_1024_frames", bands), |b| {
            let settings = Arc::new(EqualizerSettings::flat());
            for id in 0..bands {
                let freq = 250.0 * 1.5_f64.powi(id as i32);
                settings.add_or_update_band(id, freq, 3.0, 1.0).unwrap();
            }
            let mut eq = Equalizer::new(settings, 2, BitDepth::Sixteen).unwrap();
            let frame = stereo_frame(1024);

            b.iter(|| {
                black_box(eq.equalize(black_box(&frame), 96000).unwrap());
            });
        });
    }

    group.finish();
}

fn benchmark_lookahead(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalizer_lookahead");

    // Per-call cost as streamed: 1024-frame buffer plus look-ahead
    for lookahead in [0_usize, 1024, 4096, 16384] {
        group.bench_function(format!("lookahead_{}_frames", lookahead), |b| {
            let settings = Arc::new(EqualizerSettings::default());
            let mut eq = Equalizer::new(settings, 2, BitDepth::Sixteen)
                .unwrap()
                .with_lookahead(lookahead);
            let signal = stereo_frame(1024 + lookahead);
            let (frame, ahead) = signal.split_at(2048);

            b.iter(|| {
                black_box(
                    eq.equalize_with_lookahead(black_box(frame), black_box(ahead), 48000)
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

fn benchmark_live_update(c: &mut Criterion) {
    c.bench_function("equalize_after_gain_change", |b| {
        let settings = Arc::new(EqualizerSettings::default());
        let mut eq = Equalizer::new(Arc::clone(&settings), 2, BitDepth::Sixteen).unwrap();
        let frame = stereo_frame(512);
        let mut gain = 0.0_f64;

        b.iter(|| {
            // Simulate moving a gain slider while audio runs
            settings.add_or_update_band(1, 4000.0, gain, 1.0).unwrap();
            gain = (gain + 1.0) % 24.0;
            black_box(eq.equalize(black_box(&frame), 48000).unwrap());
        });
    });
}

criterion_group!(
    benches,
    benchmark_equalize,
    benchmark_band_count,
    benchmark_lookahead,
    benchmark_live_update
);

criterion_main!(benches);
