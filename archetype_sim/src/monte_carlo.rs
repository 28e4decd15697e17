//! Monte Carlo orchestration: independent simulations over fresh populations,
//! each running several matching rounds, merged into [`SimulationResults`].
//!
//! Every simulation draws from its own ChaCha stream seeded with
//! [`simulation_seed`], so results do not depend on whether simulations run
//! sequentially or on the rayon pool.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use crossbeam_channel::Sender;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    alignment::AlignmentRanking,
    catalog::{ArchetypeCatalog, InterestSet},
    hashing::{digest, simulation_seed},
    pairing::{pair_users, run_matching_round, MatchKind, PreparedPopulation, PreparedUser},
    population::{generate_population, UserId},
    run_config::{RunConfig, RunConfigError},
};

const PROGRESS_LOG_INTERVAL: usize = 5;

/// Shared flag checked before each simulation starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    SimulationCompleted {
        simulation: usize,
        mixed_pairs: usize,
    },
    Cancelled {
        completed: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchTypeCounts {
    pub same_archetype: u64,
    pub mixed: u64,
}

impl MatchTypeCounts {
    pub fn record(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::SameArchetype => self.same_archetype += 1,
            MatchKind::Mixed => self.mixed += 1,
        }
    }

    pub fn merge(&mut self, other: &MatchTypeCounts) {
        self.same_archetype += other.same_archetype;
        self.mixed += other.mixed;
    }

    pub fn total(&self) -> u64 {
        self.same_archetype + self.mixed
    }
}

/// Counters accumulated over every round of one simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationTally {
    pub simulation: usize,
    /// Selections per archetype name; archetypes never selected are absent.
    pub archetype_counts: BTreeMap<String, u64>,
    /// Selections per 1-based alignment rank.
    pub rank_counts: BTreeMap<usize, u64>,
    pub match_counts: MatchTypeCounts,
    /// Users left without a partner, summed over rounds.
    pub unmatched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairMember {
    pub user: UserId,
    pub interests: InterestSet,
    pub ranking: AlignmentRanking,
}

impl PairMember {
    fn from_prepared(prepared: &PreparedUser) -> Self {
        Self {
            user: prepared.user.id,
            interests: prepared.user.interests,
            ranking: prepared.ranking.clone(),
        }
    }
}

/// A cross-archetype match kept for connection analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixedPairRecord {
    pub simulation: usize,
    pub round: usize,
    pub first: PairMember,
    pub second: PairMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub num_users: usize,
    pub num_rounds: usize,
    pub num_simulations: usize,
    pub interests_per_user: usize,
    pub seed: u64,
    pub total_events: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResults {
    pub parameters: RunParameters,
    /// One tally per completed simulation, in simulation order.
    pub simulations: Vec<SimulationTally>,
    pub mixed_pairs: Vec<MixedPairRecord>,
    pub cancelled: bool,
}

impl SimulationResults {
    pub fn completed_simulations(&self) -> usize {
        self.simulations.len()
    }

    pub fn archetype_selections(&self) -> impl Iterator<Item = &BTreeMap<String, u64>> {
        self.simulations.iter().map(|tally| &tally.archetype_counts)
    }

    pub fn rank_distributions(&self) -> impl Iterator<Item = &BTreeMap<usize, u64>> {
        self.simulations.iter().map(|tally| &tally.rank_counts)
    }

    pub fn match_patterns(&self) -> impl Iterator<Item = &MatchTypeCounts> {
        self.simulations.iter().map(|tally| &tally.match_counts)
    }

    /// Stable fingerprint of the full result set.
    pub fn digest(&self) -> bincode::Result<u64> {
        digest(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub tally: SimulationTally,
    pub mixed_pairs: Vec<MixedPairRecord>,
}

/// Runs one simulation: a fresh population and `num_rounds` rounds against it.
pub fn run_simulation<R: Rng + ?Sized>(
    catalog: &ArchetypeCatalog,
    config: &RunConfig,
    simulation: usize,
    rng: &mut R,
) -> SimulationOutcome {
    let users = generate_population(
        rng,
        config.num_users,
        catalog.interest_count(),
        config.interests_per_user,
    );
    let population = PreparedPopulation::new(&users, catalog);
    run_simulation_with_population(catalog, &population, config.num_rounds, simulation, rng)
}

/// Runs `rounds` rounds against an existing population.
pub fn run_simulation_with_population<R: Rng + ?Sized>(
    catalog: &ArchetypeCatalog,
    population: &PreparedPopulation,
    rounds: usize,
    simulation: usize,
    rng: &mut R,
) -> SimulationOutcome {
    let mut archetype_counts = vec![0u64; catalog.len()];
    let mut tally = SimulationTally {
        simulation,
        ..SimulationTally::default()
    };
    let mut mixed_pairs = Vec::new();

    for round in 0..rounds {
        let selections = run_matching_round(population, rng);
        for selection in &selections {
            if let Some(count) = archetype_counts.get_mut(selection.archetype.index()) {
                *count += 1;
            }
            *tally.rank_counts.entry(selection.rank).or_insert(0) += 1;
        }

        let pairing = pair_users(selections, rng);
        tally.unmatched += pairing.leftover.len() as u64;
        for matched in &pairing.matches {
            tally.match_counts.record(matched.kind);
            if matched.kind != MatchKind::Mixed {
                continue;
            }
            if let (Some(first), Some(second)) = (
                population.get(matched.first.user),
                population.get(matched.second.user),
            ) {
                mixed_pairs.push(MixedPairRecord {
                    simulation,
                    round,
                    first: PairMember::from_prepared(first),
                    second: PairMember::from_prepared(second),
                });
            }
        }
    }

    tally.archetype_counts = catalog
        .archetypes()
        .iter()
        .zip(archetype_counts)
        .filter(|(_, count)| *count > 0)
        .map(|(archetype, count)| (archetype.name.clone(), count))
        .collect();

    SimulationOutcome { tally, mixed_pairs }
}

pub struct MonteCarloRunner {
    catalog: Arc<ArchetypeCatalog>,
    config: RunConfig,
    seed: u64,
    cancel: CancelToken,
    events: Option<Sender<RunEvent>>,
}

impl MonteCarloRunner {
    pub fn new(catalog: Arc<ArchetypeCatalog>, config: RunConfig) -> Result<Self, RunConfigError> {
        config.validate(&catalog)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            catalog,
            config,
            seed,
            cancel: CancelToken::new(),
            events: None,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_events(mut self, sender: Sender<RunEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Effective base seed, drawn from entropy when the config has none.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn parameters(&self) -> RunParameters {
        RunParameters {
            num_users: self.config.num_users,
            num_rounds: self.config.num_rounds,
            num_simulations: self.config.num_simulations,
            interests_per_user: self.config.interests_per_user,
            seed: self.seed,
            total_events: self.config.total_events(),
        }
    }

    pub fn run(&self) -> SimulationResults {
        let total = self.config.num_simulations;
        tracing::info!(
            target: "archetype_sim::monte_carlo",
            simulations = total,
            users = self.config.num_users,
            rounds = self.config.num_rounds,
            seed = self.seed,
            parallel = self.config.parallel,
            "monte_carlo.run_started"
        );

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<Option<SimulationOutcome>> = if self.config.parallel {
            (0..total)
                .into_par_iter()
                .map(|simulation| self.run_one(simulation, &completed))
                .collect()
        } else {
            (0..total)
                .map(|simulation| self.run_one(simulation, &completed))
                .collect()
        };

        let mut simulations = Vec::with_capacity(total);
        let mut mixed_pairs = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            simulations.push(outcome.tally);
            mixed_pairs.extend(outcome.mixed_pairs);
        }

        let cancelled = simulations.len() < total && self.cancel.is_cancelled();
        if cancelled {
            tracing::warn!(
                target: "archetype_sim::monte_carlo",
                completed = simulations.len(),
                total,
                "monte_carlo.cancelled"
            );
            self.emit(RunEvent::Cancelled {
                completed: simulations.len(),
            });
        }

        tracing::info!(
            target: "archetype_sim::monte_carlo",
            completed = simulations.len(),
            mixed_pairs = mixed_pairs.len(),
            "monte_carlo.run_finished"
        );

        SimulationResults {
            parameters: self.parameters(),
            simulations,
            mixed_pairs,
            cancelled,
        }
    }

    fn run_one(&self, simulation: usize, completed: &AtomicUsize) -> Option<SimulationOutcome> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(simulation_seed(self.seed, simulation));
        let outcome = run_simulation(&self.catalog, &self.config, simulation, &mut rng);

        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            target: "archetype_sim::monte_carlo",
            simulation,
            mixed_pairs = outcome.mixed_pairs.len(),
            "monte_carlo.simulation_completed"
        );
        if done % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!(
                target: "archetype_sim::monte_carlo",
                completed = done,
                total = self.config.num_simulations,
                "monte_carlo.progress"
            );
        }
        self.emit(RunEvent::SimulationCompleted {
            simulation,
            mixed_pairs: outcome.mixed_pairs.len(),
        });

        Some(outcome)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(event);
        }
    }
}

/// Convenience wrapper: validate, run, and return results.
pub fn run_monte_carlo(
    catalog: Arc<ArchetypeCatalog>,
    config: RunConfig,
) -> Result<SimulationResults, RunConfigError> {
    Ok(MonteCarloRunner::new(catalog, config)?.run())
}
