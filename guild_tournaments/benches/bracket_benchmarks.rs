use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use guild_tournaments::tournament::{
    CreateTournamentRequest, PoolBonus, Tournament, TournamentSettings, TournamentStatus,
    TournamentType, generate_bracket,
};
use rand::{SeedableRng, rngs::StdRng};
use std::hint::black_box;

/// Helper to create a registered, not yet started tournament with N participants
fn registered_tournament(n: usize) -> Tournament {
    let now = Utc::now();
    let settings = TournamentSettings::default();
    let request = CreateTournamentRequest::new("Bench Cup", TournamentType::Combat, "bench", 1)
        .with_capacity(2, n.max(2));
    let mut t = Tournament::new(request, &settings, now).unwrap();
    for id in 1..=n as i64 {
        t.register(id, format!("player{id}"), None, now).unwrap();
    }
    t
}

/// Benchmark bracket generation for various roster sizes
fn bench_generate_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_bracket");

    for n in [5usize, 16, 100, 256] {
        let roster: Vec<i64> = (1..=n as i64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &roster, |b, roster| {
            b.iter(|| generate_bracket(black_box(roster)));
        });
    }

    group.finish();
}

/// Benchmark start (shuffle + bracket + byes) followed by playing every match
fn bench_full_tournament(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tournament");

    for n in [8usize, 33, 128] {
        let template = registered_tournament(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &template, |b, template| {
            b.iter(|| {
                let mut t = template.clone();
                let mut rng = StdRng::seed_from_u64(1);
                t.start(&mut rng, Utc::now()).unwrap();
                while t.status == TournamentStatus::InProgress {
                    let m = t.ready_matches()[0];
                    let (id, winner) = (m.id, m.player1.unwrap());
                    t.record_result(id, winner, None, Utc::now()).unwrap();
                }
                black_box(t.winner_id)
            });
        });
    }

    group.finish();
}

/// Benchmark pool bonus split
fn bench_pool_bonus(c: &mut Criterion) {
    c.bench_function("pool_bonus", |b| {
        b.iter(|| PoolBonus::from_pool(black_box(123_456_789)));
    });
}

criterion_group!(
    benches,
    bench_generate_bracket,
    bench_full_tournament,
    bench_pool_bonus
);
criterion_main!(benches);
