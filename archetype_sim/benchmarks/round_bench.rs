use archetype_sim::{
    apply_ladder_bonus, calculate_connection_strength, calculate_synergy_score, compute_alignment,
    generate_population, pair_users, run_matching_round, ArchetypeCatalog, ConnectionParams,
    PreparedPopulation,
};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_round(c: &mut Criterion) {
    let catalog = ArchetypeCatalog::builtin();
    let mut group = c.benchmark_group("round");

    for users in [1_000usize, 10_000, 25_000] {
        let mut rng = ChaCha8Rng::seed_from_u64(users as u64);
        let population = generate_population(&mut rng, users, catalog.interest_count(), 5);
        let prepared = PreparedPopulation::new(&population, &catalog);

        group.bench_with_input(BenchmarkId::new("match_and_pair", users), &prepared, |b, prepared| {
            b.iter_batched(
                || ChaCha8Rng::seed_from_u64(7),
                |mut rng| {
                    let selections = run_matching_round(prepared, &mut rng);
                    pair_users(selections, &mut rng)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_synergy(c: &mut Criterion) {
    let catalog = ArchetypeCatalog::builtin();
    let params = ConnectionParams::default();
    let first = catalog.interest_set(["cars", "gaming", "yoga", "music", "chess"]);
    let second = catalog.interest_set(["photography", "hiking", "reading", "cooking", "travel"]);
    let profile_a = apply_ladder_bonus(&compute_alignment(first, &catalog), catalog.ladder());
    let profile_b = apply_ladder_bonus(&compute_alignment(second, &catalog), catalog.ladder());

    c.bench_function("pair_synergy", |b| {
        b.iter(|| {
            let connections =
                calculate_connection_strength(&profile_a, &profile_b, &catalog, &params);
            calculate_synergy_score(&connections, &params)
        })
    });
}

criterion_group!(round_benches, bench_round, bench_synergy);
criterion_main!(round_benches);
