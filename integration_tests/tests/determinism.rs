mod common;

use archetype_sim::{run_monte_carlo, ArchetypeCatalog, MonteCarloRunner, SimulationResults};

fn run(seed: u64, parallel: bool) -> SimulationResults {
    run_monte_carlo(ArchetypeCatalog::builtin(), common::small_config(seed, parallel))
        .expect("config fits builtin catalog")
}

#[test]
fn same_seed_reproduces_results() {
    let first = run(1234, true);
    let second = run(1234, true);

    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert_eq!(first.simulations, second.simulations);
    assert_eq!(first.mixed_pairs, second.mixed_pairs);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let parallel = run(99, true);
    let sequential = run(99, false);

    assert_eq!(parallel.simulations, sequential.simulations);
    assert_eq!(parallel.mixed_pairs, sequential.mixed_pairs);
    assert_eq!(parallel.digest().unwrap(), sequential.digest().unwrap());
}

#[test]
fn different_seeds_diverge() {
    let a = run(1, false);
    let b = run(2, false);
    assert_ne!(a.digest().unwrap(), b.digest().unwrap());
}

#[test]
fn simulations_are_ordered_by_index() {
    let results = run(5, true);
    let indices: Vec<usize> = results.simulations.iter().map(|tally| tally.simulation).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
    assert!(results
        .mixed_pairs
        .windows(2)
        .all(|pair| (pair[0].simulation, pair[0].round) <= (pair[1].simulation, pair[1].round)));
}

#[test]
fn entropy_seed_is_reported_and_replayable() {
    let mut config = common::small_config(0, true);
    config.seed = None;
    let runner = MonteCarloRunner::new(ArchetypeCatalog::builtin(), config).unwrap();
    let first = runner.run();

    let replay = run(first.parameters.seed, false);
    assert_eq!(first.simulations, replay.simulations);
}
