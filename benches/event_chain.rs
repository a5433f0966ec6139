//! Criterion benchmarks for the event tap hot path
//!
//! Covers: full dispatcher chains over scroll and pinch streams, single
//! pinch-to-wheel integration, and flag purification for preset lookup.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pinchbar::app::config::Config;
use pinchbar::chain::{Dispatcher, TimingSource};
use pinchbar::event::{synth, Event, EventFlags, EventType, Phase, ScrollUnit};
use pinchbar::mapping::{MapContext, MappingSettings, PinchMapping, PinchSettings};
use pinchbar::preset::Preset;
use pinchbar::sensor::{StaticSensor, Surface};
use pinchbar::time::timebase::{MachTimebase, Timestamp};
use std::sync::Arc;

fn make_scroll_event(phase: Phase, delta: i32, millis: u64) -> Event {
    let mut event = Event::new(EventType::ScrollWheel, Timestamp::from_millis(millis));
    event.scroll_unit = ScrollUnit::Pixel;
    event.phase = phase;
    event.scroll_point_delta = [delta, 0, 0];
    event
}

/// One scroll gesture of `len` events, separated from the next by 1s
fn scroll_gesture(len: usize, start_millis: u64) -> Vec<Event> {
    (0..len)
        .map(|i| {
            let phase = match i {
                0 => Phase::Began,
                i if i + 1 == len => Phase::Ended,
                _ => Phase::Changed,
            };
            make_scroll_event(phase, (i % 7) as i32 - 3, start_millis + i as u64 * 8)
        })
        .collect()
}

fn pinch_gesture(len: usize) -> Vec<Event> {
    (0..len)
        .map(|i| {
            let phase = match i {
                0 => Phase::Began,
                i if i + 1 == len => Phase::Ended,
                _ => Phase::Changed,
            };
            synth::magnify(0.004 * ((i % 5) as f64 - 2.0), phase)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dispatcher benchmarks
// ---------------------------------------------------------------------------

fn bench_dispatch_scroll_to_pinch(c: &mut Criterion) {
    MachTimebase::init();

    let mut group = c.benchmark_group("dispatch_scroll_to_pinch");
    for len in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let config = Config::default();
            let sensor = Arc::new(StaticSensor::new());
            sensor.set_touch_count(Surface::Mousepad, 2);
            let mut dispatcher =
                Dispatcher::new(config.chain_for(Some("Cubase")), sensor).with_timing(TimingSource::Event);
            let mut offset = 0;

            b.iter(|| {
                offset += 1_000;
                for event in scroll_gesture(len, offset) {
                    black_box(dispatcher.process(black_box(event)));
                }
            });
        });
    }
    group.finish();
}

fn bench_dispatch_passthrough(c: &mut Criterion) {
    MachTimebase::init();

    c.bench_function("dispatch_passthrough_scroll", |b| {
        let config = Config::default();
        let mut dispatcher = Dispatcher::new(config.chain_for(None), Arc::new(StaticSensor::new()));
        let event = make_scroll_event(Phase::Other, 3, 0);

        b.iter(|| {
            black_box(dispatcher.process(black_box(event.clone())));
        });
    });
}

fn bench_dispatch_preset_pinch(c: &mut Criterion) {
    MachTimebase::init();

    let mut group = c.benchmark_group("dispatch_preset_pinch");
    for len in [16, 64, 256] {
        let gesture = pinch_gesture(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &gesture, |b, gesture| {
            let config = Config::default();
            let sensor = Arc::new(StaticSensor::new());
            sensor.set_double_tap(true);
            let mut dispatcher = Dispatcher::new(config.chain_for(Some("Cubase")), sensor);

            b.iter(|| {
                for event in gesture {
                    black_box(dispatcher.process(black_box(event.clone())));
                }
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Single mapping benchmarks
// ---------------------------------------------------------------------------

fn bench_pinch_to_wheel(c: &mut Criterion) {
    MachTimebase::init();

    let gesture = pinch_gesture(128);
    let sensor = StaticSensor::new();
    let ctx = MapContext {
        sensor: &sensor,
        now: Timestamp::default(),
    };

    c.bench_function("pinch_to_wheel_128", |b| {
        let mut mapping = PinchMapping::new(PinchSettings::default_wheel());
        b.iter(|| {
            for event in &gesture {
                black_box(mapping.map(black_box(event.clone()), &ctx));
            }
        });
    });

    c.bench_function("multi_click_passthrough", |b| {
        let mut mapping = MappingSettings::multi_click().build();
        let event = make_scroll_event(Phase::Changed, 1, 0);
        b.iter(|| {
            black_box(mapping.map(black_box(event.clone()), &ctx));
        });
    });
}

fn bench_preset_lookup(c: &mut Criterion) {
    let preset = Preset::cubase();
    let flags = [
        EventFlags::empty(),
        EventFlags::from_bits_retain(EventFlags::COMMAND.bits() | 0x08),
        EventFlags::from_bits_retain(EventFlags::ALTERNATE.bits() | 0x20 | 0x100),
        EventFlags::SHIFT,
    ];

    c.bench_function("preset_lookup", |b| {
        b.iter(|| {
            for f in &flags {
                black_box(preset.lookup(black_box(*f)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_dispatch_scroll_to_pinch,
    bench_dispatch_passthrough,
    bench_dispatch_preset_pinch,
    bench_pinch_to_wheel,
    bench_preset_lookup,
);
criterion_main!(benches);
