use criterion::{black_box, criterion_group, criterion_main, Criterion};
use naviplay::audio::{EffectsChain, EqSource};
use naviplay::eq::{build_effects_string, get_default_presets, Gains, BAND_COUNT};
use naviplay::model::{RepeatMode, Track};
use naviplay::queue::QueueEngine;
use rodio::buffer::SamplesBuffer;

fn preset_gains(name: &str) -> Gains {
    let mut gains = [0.0; BAND_COUNT];
    if let Some(preset) = get_default_presets().into_iter().find(|p| p.name == name) {
        for (g, v) in gains.iter_mut().zip(preset.gains) {
            *g = v;
        }
    }
    gains
}

fn bench_effects_string(c: &mut Criterion) {
    let gains = preset_gains("Loudness");
    c.bench_function("build_effects_string", |b| {
        b.iter(|| build_effects_string(black_box(&gains), true))
    });
}

fn bench_eq_source(c: &mut Criterion) {
    let chain = EffectsChain::default();
    let _ = chain.apply(&build_effects_string(&preset_gains("Rock"), true));
    let samples: Vec<f32> = (0..44_100 * 2).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

    c.bench_function("eq_source_1s_stereo", |b| {
        b.iter(|| {
            let source = SamplesBuffer::new(2, 44_100, samples.clone());
            EqSource::new(source, chain.clone()).fold(0.0f32, |acc, s| acc + s)
        })
    });
}

fn bench_shuffled_next(c: &mut Criterion) {
    let tracks: Vec<Track> = (0..2_000)
        .map(|i| Track::new(&format!("t{}", i), "Track", 180))
        .collect();
    let mut queue = QueueEngine::with_seed(42);
    queue.set_queue(tracks, 0);
    queue.set_repeat(RepeatMode::All);
    queue.set_shuffle(true);

    c.bench_function("queue_next_shuffled_2000", |b| b.iter(|| black_box(queue.next())));
}

criterion_group!(benches, bench_effects_string, bench_eq_source, bench_shuffled_next);
criterion_main!(benches);
