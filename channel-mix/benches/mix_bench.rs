//! Benchmarks for channel-mix
//!
//! Measures matrix construction and per-buffer mixing for common layout pairs.

use channel_mix::{AudioFormat, ChannelMix, MixFlags, MixMatrix, SpeakerLayout};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const FRAMES: usize = 1024;

const CONVERSIONS: [(&str, SpeakerLayout, SpeakerLayout); 4] = [
    ("stereo_to_mono", SpeakerLayout::Stereo, SpeakerLayout::Mono),
    ("5.1_to_stereo", SpeakerLayout::FiveOne, SpeakerLayout::Stereo),
    ("stereo_to_5.1", SpeakerLayout::Stereo, SpeakerLayout::FiveOne),
    ("7.1_to_5.1", SpeakerLayout::SevenOne, SpeakerLayout::FiveOne),
];

fn bench_matrix_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_build");

    for (name, input, output) in CONVERSIONS {
        group.bench_function(name, |b| {
            b.iter(|| {
                let matrix = MixMatrix::build(
                    MixFlags::empty(),
                    black_box(input.positions()),
                    black_box(output.positions()),
                );
                black_box(matrix);
            });
        });
    }

    group.finish();
}

fn bench_mix_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_f64");

    for (name, input, output) in CONVERSIONS {
        let mut mix = ChannelMix::new(
            MixFlags::empty(),
            AudioFormat::F64,
            input.positions(),
            output.positions(),
        )
        .unwrap();

        let src: Vec<f64> = (0..FRAMES * input.channel_count())
            .map(|i| ((i as f64) * 0.01).sin() * 0.8)
            .collect();
        let mut dst = vec![0.0; FRAMES * output.channel_count()];

        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, _| {
            b.iter(|| {
                mix.mix(black_box(&src), &mut dst, FRAMES);
                black_box(&dst);
            });
        });
    }

    group.finish();
}

fn bench_mix_s32(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_s32");

    for (name, input, output) in CONVERSIONS {
        let mut mix = ChannelMix::new(
            MixFlags::empty(),
            AudioFormat::S32,
            input.positions(),
            output.positions(),
        )
        .unwrap();

        let src: Vec<i32> = (0..FRAMES * input.channel_count())
            .map(|i| (((i as f64) * 0.01).sin() * 1.0e9) as i32)
            .collect();
        let mut dst = vec![0; FRAMES * output.channel_count()];

        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, _| {
            b.iter(|| {
                mix.mix(black_box(&src), &mut dst, FRAMES);
                black_box(&dst);
            });
        });
    }

    group.finish();
}

fn bench_mix_in_place(c: &mut Criterion) {
    let mut mix = ChannelMix::new(
        MixFlags::empty(),
        AudioFormat::F64,
        SpeakerLayout::Stereo.positions(),
        SpeakerLayout::SevenOne.positions(),
    )
    .unwrap();
    let mut buffer = vec![0.25f64; FRAMES * 8];

    c.bench_function("mix_in_place_stereo_to_7.1", |b| {
        b.iter(|| {
            mix.mix_in_place(black_box(&mut buffer), FRAMES);
        });
    });
}

fn bench_mix_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_parallel");
    let mix = ChannelMix::new(
        MixFlags::empty(),
        AudioFormat::F64,
        SpeakerLayout::SevenOne.positions(),
        SpeakerLayout::Stereo.positions(),
    )
    .unwrap();

    for frames in [4096usize, 65536, 262144].iter() {
        let src: Vec<f64> = (0..frames * 8).map(|i| ((i as f64) * 0.001).cos()).collect();
        let mut dst = vec![0.0; frames * 2];

        group.bench_with_input(BenchmarkId::from_parameter(frames), frames, |b, &frames| {
            b.iter(|| {
                mix.mix_parallel(black_box(&src), &mut dst, frames);
                black_box(&dst);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_matrix_build,
    bench_mix_f64,
    bench_mix_s32,
    bench_mix_in_place,
    bench_mix_parallel
);
criterion_main!(benches);
