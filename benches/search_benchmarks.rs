//! Benchmarks for the search core's performance-sensitive paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gat_engine::board::GameState;
use gat_engine::engine::Engine;
use gat_engine::eval::{evaluate, Weights};
use gat_engine::movegen;

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut state = GameState::new();
                movegen::perft(&mut state, black_box(depth))
            })
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let startpos = GameState::new();
    group.bench_function("startpos", |b| {
        b.iter(|| black_box(movegen::generate_all(&startpos)))
    });

    let midgame = GameState::from_fen("7/2r2b23/7/3RG3/3BG3/7/7 r");
    group.bench_function("scattered_towers", |b| {
        b.iter(|| black_box(movegen::generate_all(&midgame)))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for depth in [3, 4, 5] {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut engine = Engine::new();
                engine.find_best_depth(depth).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");
    let weights = Weights::default();

    let positions = [
        ("startpos", GameState::new()),
        (
            "endgame",
            GameState::from_fen("7/7/7/3b13/7/3RG3/3BG3 r"),
        ),
    ];

    for (name, state) in positions {
        group.bench_with_input(BenchmarkId::new("position", name), &state, |b, state| {
            b.iter(|| black_box(evaluate(state, &weights, 0)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_perft, bench_movegen, bench_search, bench_eval);
criterion_main!(benches);
