//! Monte Carlo engine for interest-based archetype matching.
//!
//! Users are scored against a fixed [`ArchetypeCatalog`], roll an archetype
//! with rank-weighted dice every round, and are paired with someone who
//! rolled the same archetype when possible. Mixed pairs are retained so the
//! directional connection and synergy scoring in [`connection`] can be run
//! over them afterwards.
//!
//! [`MonteCarloRunner`] drives many independent simulations, optionally on
//! the rayon pool, and returns [`SimulationResults`].

pub mod alignment;
pub mod analysis;
pub mod catalog;
pub mod connection;
pub mod dice;
pub mod hashing;
pub mod lobby;
pub mod monte_carlo;
pub mod pairing;
pub mod population;
pub mod run_config;
pub mod summary;

pub use alignment::{compute_alignment, AlignmentRanking, AlignmentScore};
pub use analysis::{
    analyze_aggregate_connections, analyze_pair, find_curated_pair, top_connections,
    AggregateConnectionStats, CuratedPair, PairConnectionReport, TopConnection,
};
pub use catalog::{
    load_archetype_catalog_from_env, Archetype, ArchetypeCatalog, ArchetypeDefinition,
    ArchetypeId, CatalogError, InterestSet, LadderBonuses,
};
pub use connection::{
    apply_ladder_bonus, calculate_connection_strength, calculate_synergy_score,
    find_top_asym_pair, ConnectionMap, ConnectionParams, DiagnosticKind, DirectionalConnections,
    Pathway, SynergyDiagnostic, SynergyReport, WeightedProfile,
};
pub use dice::{create_weighted_dice, roll_weighted_dice, DiceFace, WeightedDice};
pub use lobby::{form_lobbies, Lobby, LobbyOutcome};
pub use monte_carlo::{
    run_monte_carlo, run_simulation, CancelToken, MatchTypeCounts, MixedPairRecord,
    MonteCarloRunner, PairMember, RunEvent, RunParameters, SimulationResults, SimulationTally,
};
pub use pairing::{
    pair_users, run_matching_round, Match, MatchKind, PairingOutcome, PreparedPopulation,
    PreparedUser, Selection,
};
pub use population::{generate_population, generate_random_user_interests, User, UserId};
pub use run_config::{load_run_config_from_env, RunConfig, RunConfigError};
pub use summary::{RankBuckets, RunSummary};
