//! Criterion benchmarks for the polyvox voice engine
//!
//! Run with: cargo bench -p polyvox-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polyvox_config::EngineConfig;
use polyvox_synth::{SynthEngine, SynthStore, WaveformKind};

const BLOCK_SIZES: &[usize] = &[128, 256, 512, 1024];

fn playing_engine(notes: &[u8], voices: u32) -> SynthEngine {
    let mut engine = SynthEngine::new(&EngineConfig::default()).unwrap();
    let mut store = SynthStore::new();
    store.set_waveform(WaveformKind::Sawtooth);
    store.set_voices(voices);
    store.set_detune(25.0);
    store.set_vibrato_depth(10.0);
    for &note in notes {
        store.note_on(note, 100);
    }
    engine.sync(&store);
    engine
}

// ============================================================================
// Render throughput
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_Render");

    for (name, notes, voices) in [
        ("1note_1voice", &[60u8][..], 1),
        ("4notes_3voices", &[48, 55, 60, 64][..], 3),
        ("8notes_7voices", &[36, 43, 48, 52, 55, 60, 64, 67][..], 7),
    ] {
        for &block_size in BLOCK_SIZES {
            let mut engine = playing_engine(notes, voices);
            let mut buffer = vec![0.0f32; block_size];

            group.bench_with_input(BenchmarkId::new(name, block_size), &block_size, |b, _| {
                b.iter(|| {
                    engine.render(&mut buffer);
                    black_box(buffer[0])
                })
            });
        }
    }

    group.finish();
}

// ============================================================================
// Reconciliation
// ============================================================================

fn bench_note_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_Sync");

    for voices in [1u32, 4, 8] {
        let mut engine = SynthEngine::new(&EngineConfig::default()).unwrap();
        let mut store = SynthStore::new();
        store.set_voices(voices);
        store.set_release(0.01);
        let mut buffer = vec![0.0f32; 128];
        let mut note = 36u8;

        group.bench_with_input(BenchmarkId::new("press_release", voices), &voices, |b, _| {
            b.iter(|| {
                store.note_on(note, 100);
                engine.sync(&store);
                store.note_off(note);
                engine.sync(&store);
                engine.render(&mut buffer);
                note = if note >= 96 { 36 } else { note + 1 };
            })
        });
    }

    group.finish();
}

fn bench_spectrum(c: &mut Criterion) {
    let mut engine = playing_engine(&[57, 60, 64], 2);
    let mut buffer = vec![0.0f32; 2048];
    engine.render(&mut buffer);

    c.bench_function("Engine_Spectrum/byte_frequency_data", |b| {
        b.iter(|| black_box(engine.byte_frequency_data()[0]))
    });
}

criterion_group!(benches, bench_render, bench_note_churn, bench_spectrum);
criterion_main!(benches);
