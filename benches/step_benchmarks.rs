//! Benchmarks for the fixed-step engine loop over representative scenes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rigid2d::body::{Body, BodyOptions};
use rigid2d::engine::{Engine, EngineOptions};
use rigid2d::vector::Vector2;

fn stack_scene(height: usize) -> Engine {
    let mut engine = Engine::new(EngineOptions::default());
    let ctx = engine.context_mut();

    let floor_opts = BodyOptions { is_static: true, ..BodyOptions::default() };
    let floor = Body::rectangle(ctx, Vector2::new(400.0, 600.0), 400.0, 40.0, floor_opts);
    engine.add_body(floor);

    let ctx = engine.context_mut();
    for i in 0..height {
        let y = 580.0 - (i as f64) * 40.0;
        let b = Body::rectangle(ctx, Vector2::new(400.0, y), 40.0, 40.0, BodyOptions::default());
        engine.add_body(b);
    }
    engine
}

fn scattered_scene(count: usize) -> Engine {
    let mut engine = Engine::new(EngineOptions::default());
    let ctx = engine.context_mut();
    for i in 0..count {
        let x = 40.0 + (i as f64 % 20.0) * 40.0;
        let y = 40.0 + (i as f64 / 20.0).floor() * 40.0;
        let b = Body::circle(ctx, Vector2::new(x, y), 15.0, BodyOptions::default());
        engine.add_body(b);
    }
    engine
}

fn step_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_step");

    for height in [5usize, 10, 20] {
        group.bench_with_input(BenchmarkId::new("stack", height), &height, |b, &height| {
            let mut engine = stack_scene(height);
            b.iter(|| {
                engine.update(black_box(None));
            });
        });
    }

    for count in [50usize, 200] {
        group.bench_with_input(BenchmarkId::new("scattered", count), &count, |b, &count| {
            let mut engine = scattered_scene(count);
            b.iter(|| {
                engine.update(black_box(None));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, step_benchmarks);
criterion_main!(benches);
