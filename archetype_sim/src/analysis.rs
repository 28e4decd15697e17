use rand::{seq::index, Rng};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    catalog::{ArchetypeCatalog, ArchetypeId},
    connection::{
        apply_ladder_bonus, calculate_connection_strength, calculate_synergy_score,
        ConnectionMap, ConnectionParams, DirectionalConnections, SynergyDiagnostic, SynergyReport,
    },
    monte_carlo::MixedPairRecord,
};

pub const DEFAULT_SAMPLE_SIZE: usize = 100;
pub const DEFAULT_CURATED_SAMPLES: usize = 500;
pub const DEFAULT_TOP_CONNECTIONS: usize = 5;

/// A forward edge at least this strong with a reverse below
/// [`ONE_SIDED_REVERSE`] is flagged one-sided.
pub const ONE_SIDED_STRENGTH: f64 = 0.15;
pub const ONE_SIDED_REVERSE: f64 = 0.08;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairConnectionReport {
    pub first_top: Option<ArchetypeId>,
    pub second_top: Option<ArchetypeId>,
    pub connections: DirectionalConnections,
    pub synergy: SynergyReport,
    pub top_asymmetric: Option<SynergyDiagnostic>,
}

pub fn analyze_pair(
    pair: &MixedPairRecord,
    catalog: &ArchetypeCatalog,
    params: &ConnectionParams,
) -> PairConnectionReport {
    let profile_a = apply_ladder_bonus(&pair.first.ranking, catalog.ladder());
    let profile_b = apply_ladder_bonus(&pair.second.ranking, catalog.ladder());
    let connections = calculate_connection_strength(&profile_a, &profile_b, catalog, params);
    let synergy = calculate_synergy_score(&connections, params);
    let top_asymmetric = synergy.top_asymmetric().copied();

    PairConnectionReport {
        first_top: pair.first.ranking.top().map(|score| score.archetype),
        second_top: pair.second.ranking.top().map(|score| score.archetype),
        connections,
        synergy,
        top_asymmetric,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateConnectionStats {
    pub sampled: usize,
    pub avg_strength_a_to_b: f64,
    pub avg_strength_b_to_a: f64,
    pub avg_synergy: f64,
    pub strengths_a_to_b: Vec<f64>,
    pub strengths_b_to_a: Vec<f64>,
    pub synergy_scores: Vec<f64>,
    pub diagnostic_count: usize,
}

/// Connection statistics over `min(sample_size, pairs.len())` pairs sampled
/// without replacement. `None` when there are no mixed pairs.
pub fn analyze_aggregate_connections<R: Rng + ?Sized>(
    pairs: &[MixedPairRecord],
    sample_size: usize,
    catalog: &ArchetypeCatalog,
    params: &ConnectionParams,
    rng: &mut R,
) -> Option<AggregateConnectionStats> {
    if pairs.is_empty() {
        return None;
    }

    let amount = sample_size.min(pairs.len());
    let sampled: Vec<usize> = index::sample(rng, pairs.len(), amount).into_vec();
    let reports: Vec<PairConnectionReport> = sampled
        .par_iter()
        .map(|&idx| analyze_pair(&pairs[idx], catalog, params))
        .collect();

    let mut stats = AggregateConnectionStats {
        sampled: reports.len(),
        avg_strength_a_to_b: 0.0,
        avg_strength_b_to_a: 0.0,
        avg_synergy: 0.0,
        strengths_a_to_b: Vec::new(),
        strengths_b_to_a: Vec::new(),
        synergy_scores: Vec::with_capacity(reports.len()),
        diagnostic_count: 0,
    };
    for report in &reports {
        stats
            .strengths_a_to_b
            .extend(report.connections.a_to_b.strengths());
        stats
            .strengths_b_to_a
            .extend(report.connections.b_to_a.strengths());
        stats.synergy_scores.push(report.synergy.score);
        stats.diagnostic_count += report.synergy.diagnostics.len();
    }
    stats.avg_strength_a_to_b = mean(&stats.strengths_a_to_b);
    stats.avg_strength_b_to_a = mean(&stats.strengths_b_to_a);
    stats.avg_synergy = mean(&stats.synergy_scores);

    tracing::debug!(
        target: "archetype_sim::analysis",
        sampled = stats.sampled,
        avg_synergy = stats.avg_synergy,
        diagnostics = stats.diagnostic_count,
        "analysis.aggregate_computed"
    );

    Some(stats)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedPair {
    /// Position of the pair in the scanned mixed-pair list.
    pub index: usize,
    pub pair: MixedPairRecord,
    pub report: PairConnectionReport,
}

/// Highest-synergy pair among the first `max_samples`; the first wins ties.
pub fn find_curated_pair(
    pairs: &[MixedPairRecord],
    max_samples: usize,
    catalog: &ArchetypeCatalog,
    params: &ConnectionParams,
) -> Option<CuratedPair> {
    let reports: Vec<PairConnectionReport> = pairs
        .par_iter()
        .take(max_samples)
        .map(|pair| analyze_pair(pair, catalog, params))
        .collect();

    let mut best: Option<(usize, PairConnectionReport)> = None;
    for (idx, report) in reports.into_iter().enumerate() {
        match &best {
            Some((_, current)) if report.synergy.score <= current.synergy.score => {}
            _ => best = Some((idx, report)),
        }
    }

    best.map(|(index, report)| CuratedPair {
        index,
        pair: pairs[index].clone(),
        report,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopConnection {
    pub from: ArchetypeId,
    pub to: ArchetypeId,
    pub strength: f64,
    /// Strength of the `to → from` edge in the opposite map, 0 when absent.
    pub reverse: f64,
    pub one_sided: bool,
}

/// Strongest `limit` edges of `forward`, each paired with its reverse.
pub fn top_connections(
    forward: &ConnectionMap,
    reverse: &ConnectionMap,
    limit: usize,
) -> Vec<TopConnection> {
    let mut edges = forward.edges().to_vec();
    edges.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    edges
        .into_iter()
        .take(limit)
        .map(|edge| {
            let reverse = reverse.get(edge.to, edge.from).unwrap_or(0.0);
            TopConnection {
                from: edge.from,
                to: edge.to,
                strength: edge.strength,
                reverse,
                one_sided: edge.strength > ONE_SIDED_STRENGTH && reverse < ONE_SIDED_REVERSE,
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
