//! Directional connection strengths between two users' archetype affinities
//! and the asymmetry/synergy diagnostics derived from them.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    alignment::AlignmentRanking,
    catalog::{ArchetypeCatalog, ArchetypeId, LadderBonuses},
};

/// Tunables of the connection formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionParams {
    /// Normalisation constant; strengths are divided by its square.
    pub max_possible: f64,
    /// Weight on the counterpart's score.
    pub partner_weight: f64,
    /// Weight on the source's own score; breaks A→B / B→A symmetry.
    pub self_weight: f64,
    /// Edges at or below this strength are dropped from the sparse maps.
    pub retention_threshold: f64,
    pub gap_lower_bound: f64,
    pub gap_upper_bound: f64,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            max_possible: 60.0,
            partner_weight: 0.8,
            self_weight: 0.2,
            retention_threshold: 0.01,
            gap_lower_bound: 0.01,
            gap_upper_bound: 1.0,
        }
    }
}

impl ConnectionParams {
    /// Strength of the pull from a source score toward a partner score.
    #[inline]
    pub fn directional_strength(&self, own: f64, partner: f64) -> f64 {
        own * (self.partner_weight * partner + self.self_weight * own)
            / (self.max_possible * self.max_possible)
    }

    fn gap_in_bounds(&self, gap: f64) -> bool {
        self.gap_lower_bound <= gap && gap <= self.gap_upper_bound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedEntry {
    pub raw_percentage: f64,
    pub ladder_bonus: f64,
    pub weighted_score: f64,
    pub rank: usize,
}

/// Rank-weighted score per archetype for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightedProfile {
    entries: BTreeMap<ArchetypeId, WeightedEntry>,
}

impl WeightedProfile {
    /// Profile from bare weighted scores, ranked in the given order.
    pub fn from_scores<I: IntoIterator<Item = (ArchetypeId, f64)>>(scores: I) -> Self {
        let entries = scores
            .into_iter()
            .enumerate()
            .map(|(idx, (archetype, weighted_score))| {
                (
                    archetype,
                    WeightedEntry {
                        raw_percentage: 0.0,
                        ladder_bonus: 1.0,
                        weighted_score,
                        rank: idx + 1,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn entry(&self, archetype: ArchetypeId) -> Option<&WeightedEntry> {
        self.entries.get(&archetype)
    }

    /// Weighted score, zero for archetypes missing from the profile.
    pub fn weighted_score(&self, archetype: ArchetypeId) -> f64 {
        self.entries
            .get(&archetype)
            .map_or(0.0, |entry| entry.weighted_score)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ArchetypeId, &WeightedEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn apply_ladder_bonus(ranking: &AlignmentRanking, ladder: &LadderBonuses) -> WeightedProfile {
    let entries = ranking
        .ranked()
        .map(|(rank, score)| {
            let ladder_bonus = ladder.bonus_for_rank(rank);
            (
                score.archetype,
                WeightedEntry {
                    raw_percentage: score.percentage,
                    ladder_bonus,
                    weighted_score: score.percentage * ladder_bonus,
                    rank,
                },
            )
        })
        .collect();
    WeightedProfile { entries }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionEdge {
    pub from: ArchetypeId,
    pub to: ArchetypeId,
    pub strength: f64,
}

/// Sparse directional map keeping edges in insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionMap {
    edges: Vec<ConnectionEdge>,
    #[serde(skip)]
    lookup: HashMap<(ArchetypeId, ArchetypeId), usize>,
}

impl ConnectionMap {
    pub fn insert(&mut self, from: ArchetypeId, to: ArchetypeId, strength: f64) {
        match self.lookup.get(&(from, to)) {
            Some(&idx) => self.edges[idx].strength = strength,
            None => {
                self.lookup.insert((from, to), self.edges.len());
                self.edges.push(ConnectionEdge { from, to, strength });
            }
        }
    }

    pub fn get(&self, from: ArchetypeId, to: ArchetypeId) -> Option<f64> {
        self.lookup
            .get(&(from, to))
            .map(|&idx| self.edges[idx].strength)
    }

    pub fn edges(&self) -> &[ConnectionEdge] {
        &self.edges
    }

    pub fn strengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.edges.iter().map(|edge| edge.strength)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl PartialEq for ConnectionMap {
    fn eq(&self, other: &Self) -> bool {
        self.edges == other.edges
    }
}

/// Both directions of a pair's connection strengths.
///
/// `a_to_b` is keyed `(a, b)`; `b_to_a` is keyed `(b, a)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectionalConnections {
    pub a_to_b: ConnectionMap,
    pub b_to_a: ConnectionMap,
}

pub fn calculate_connection_strength(
    profile_a: &WeightedProfile,
    profile_b: &WeightedProfile,
    catalog: &ArchetypeCatalog,
    params: &ConnectionParams,
) -> DirectionalConnections {
    let mut connections = DirectionalConnections::default();
    for a in catalog.ids() {
        let score_a = profile_a.weighted_score(a);
        for b in catalog.ids() {
            let score_b = profile_b.weighted_score(b);
            let a_to_b = params.directional_strength(score_a, score_b);
            let b_to_a = params.directional_strength(score_b, score_a);
            if a_to_b > params.retention_threshold {
                connections.a_to_b.insert(a, b, a_to_b);
            }
            if b_to_a > params.retention_threshold {
                connections.b_to_a.insert(b, a, b_to_a);
            }
        }
    }
    connections
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DirectAsymmetry,
    CrossPathSynergy,
}

impl DiagnosticKind {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::DirectAsymmetry => "Direct Asymmetry",
            DiagnosticKind::CrossPathSynergy => "Cross-Path Synergy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Pathway {
    pub from: ArchetypeId,
    pub to: ArchetypeId,
}

impl Pathway {
    pub fn describe(&self, catalog: &ArchetypeCatalog) -> String {
        format!("{} → {}", catalog.name(self.from), catalog.name(self.to))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SynergyDiagnostic {
    pub a_to_b: Pathway,
    pub b_to_a: Pathway,
    pub gap_a_to_b: f64,
    pub gap_b_to_a: f64,
    pub kind: DiagnosticKind,
}

impl SynergyDiagnostic {
    pub fn asymmetry(&self) -> f64 {
        (self.gap_a_to_b - self.gap_b_to_a).abs()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynergyReport {
    pub score: f64,
    pub diagnostics: Vec<SynergyDiagnostic>,
}

impl SynergyReport {
    /// Diagnostic with the largest `|gap_a_to_b - gap_b_to_a|`; earliest wins ties.
    pub fn top_asymmetric(&self) -> Option<&SynergyDiagnostic> {
        let mut best: Option<&SynergyDiagnostic> = None;
        for diagnostic in &self.diagnostics {
            match best {
                Some(current) if diagnostic.asymmetry() <= current.asymmetry() => {}
                _ => best = Some(diagnostic),
            }
        }
        best
    }
}

pub fn calculate_synergy_score(
    connections: &DirectionalConnections,
    params: &ConnectionParams,
) -> SynergyReport {
    let strong_ab: Vec<&ConnectionEdge> = connections
        .a_to_b
        .edges()
        .iter()
        .filter(|edge| edge.strength >= params.retention_threshold)
        .collect();
    let strong_ba: Vec<&ConnectionEdge> = connections
        .b_to_a
        .edges()
        .iter()
        .filter(|edge| edge.strength >= params.retention_threshold)
        .collect();

    let mut report = SynergyReport::default();

    for edge in &strong_ab {
        let (a, b) = (edge.from, edge.to);
        let reverse = connections.b_to_a.get(b, a).unwrap_or(0.0);
        let diff = edge.strength - reverse;
        let gap = diff.abs();
        if params.gap_in_bounds(gap) {
            report.diagnostics.push(SynergyDiagnostic {
                a_to_b: Pathway { from: a, to: b },
                b_to_a: Pathway { from: b, to: a },
                gap_a_to_b: round_to_4(diff),
                gap_b_to_a: round_to_4(-diff),
                kind: DiagnosticKind::DirectAsymmetry,
            });
            report.score += gap;
        }
    }

    for edge_ab in &strong_ab {
        let (a, b) = (edge_ab.from, edge_ab.to);
        for edge_ba in &strong_ba {
            let (b2, a2) = (edge_ba.from, edge_ba.to);
            if a == a2 || b == b2 {
                continue;
            }
            let gap = (edge_ab.strength - edge_ba.strength).abs();
            if params.gap_in_bounds(gap) {
                report.diagnostics.push(SynergyDiagnostic {
                    a_to_b: Pathway { from: a, to: b },
                    b_to_a: Pathway { from: b2, to: a2 },
                    gap_a_to_b: round_to_4(edge_ab.strength),
                    gap_b_to_a: round_to_4(edge_ba.strength),
                    kind: DiagnosticKind::CrossPathSynergy,
                });
                report.score += gap / 2.0;
            }
        }
    }

    report
}

pub fn find_top_asym_pair(
    connections: &DirectionalConnections,
    params: &ConnectionParams,
) -> Option<SynergyDiagnostic> {
    calculate_synergy_score(connections, params)
        .top_asymmetric()
        .copied()
}

fn round_to_4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
