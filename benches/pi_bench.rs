//! Benchmarks for the policy iteration solver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_pi_solver::games::tictactoe::TicTacToe;
use rust_pi_solver::mdp::{PIConfig, PolicyIterationSolver};

fn tictactoe_evaluation_benchmark(c: &mut Criterion) {
    let config = PIConfig::default().with_seed(42);
    let mut solver = PolicyIterationSolver::new(TicTacToe::new(), config).unwrap();

    c.bench_function("tictactoe_policy_evaluation", |b| {
        b.iter(|| {
            solver.reset_values();
            black_box(solver.evaluate_policy())
        })
    });
}

fn tictactoe_parallel_evaluation_benchmark(c: &mut Criterion) {
    let config = PIConfig::default().with_seed(42).with_parallel(true);
    let mut solver = PolicyIterationSolver::new(TicTacToe::new(), config).unwrap();

    c.bench_function("tictactoe_policy_evaluation_parallel", |b| {
        b.iter(|| {
            solver.reset_values();
            black_box(solver.evaluate_policy())
        })
    });
}

fn tictactoe_training_benchmark(c: &mut Criterion) {
    c.bench_function("tictactoe_full_training", |b| {
        b.iter(|| {
            let config = PIConfig::default().with_seed(42);
            let mut solver = PolicyIterationSolver::new(TicTacToe::new(), config).unwrap();
            black_box(solver.train())
        })
    });
}

criterion_group!(
    benches,
    tictactoe_evaluation_benchmark,
    tictactoe_parallel_evaluation_benchmark,
    tictactoe_training_benchmark
);
criterion_main!(benches);
