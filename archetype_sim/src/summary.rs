use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    catalog::ArchetypeCatalog,
    monte_carlo::{MatchTypeCounts, RunParameters, SimulationResults},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeShare {
    pub archetype: String,
    pub selections: u64,
    /// Percentage of all selections in the run.
    pub share: f64,
}

/// Selections grouped by how highly the chosen archetype ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankBuckets {
    /// Ranks 1-3.
    pub top: u64,
    /// Ranks 4-8.
    pub middle: u64,
    /// Ranks 9 and beyond.
    pub tail: u64,
}

impl RankBuckets {
    pub fn record(&mut self, rank: usize, count: u64) {
        match rank {
            0..=3 => self.top += count,
            4..=8 => self.middle += count,
            _ => self.tail += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.top + self.middle + self.tail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LadderImpact {
    pub rank: usize,
    pub bonus: f64,
    pub selections: u64,
}

/// Run-wide totals derived from per-simulation tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub parameters: RunParameters,
    pub completed_simulations: usize,
    pub cancelled: bool,
    pub total_selections: u64,
    /// Sorted by selections, descending; ties keep catalog order.
    pub archetype_shares: Vec<ArchetypeShare>,
    pub rank_totals: BTreeMap<usize, u64>,
    pub rank_buckets: RankBuckets,
    pub match_totals: MatchTypeCounts,
    pub unmatched: u64,
    pub mixed_pairs: usize,
    pub ladder_impact: Vec<LadderImpact>,
}

impl RunSummary {
    pub fn from_results(results: &SimulationResults, catalog: &ArchetypeCatalog) -> Self {
        let mut archetype_totals: BTreeMap<&str, u64> = BTreeMap::new();
        let mut rank_totals: BTreeMap<usize, u64> = BTreeMap::new();
        let mut match_totals = MatchTypeCounts::default();
        let mut unmatched = 0;

        for tally in &results.simulations {
            for (name, count) in &tally.archetype_counts {
                *archetype_totals.entry(name.as_str()).or_insert(0) += count;
            }
            for (rank, count) in &tally.rank_counts {
                *rank_totals.entry(*rank).or_insert(0) += count;
            }
            match_totals.merge(&tally.match_counts);
            unmatched += tally.unmatched;
        }

        let total_selections: u64 = archetype_totals.values().sum();
        let mut archetype_shares: Vec<ArchetypeShare> = catalog
            .archetypes()
            .iter()
            .map(|archetype| {
                let selections = archetype_totals
                    .get(archetype.name.as_str())
                    .copied()
                    .unwrap_or(0);
                ArchetypeShare {
                    archetype: archetype.name.clone(),
                    selections,
                    share: percentage(selections, total_selections),
                }
            })
            .collect();
        archetype_shares.sort_by(|a, b| b.selections.cmp(&a.selections));

        let mut rank_buckets = RankBuckets::default();
        for (rank, count) in &rank_totals {
            rank_buckets.record(*rank, *count);
        }

        let ladder_impact = catalog
            .ladder()
            .as_slice()
            .iter()
            .enumerate()
            .map(|(idx, bonus)| LadderImpact {
                rank: idx + 1,
                bonus: *bonus,
                selections: rank_totals.get(&(idx + 1)).copied().unwrap_or(0),
            })
            .collect();

        Self {
            parameters: results.parameters.clone(),
            completed_simulations: results.completed_simulations(),
            cancelled: results.cancelled,
            total_selections,
            archetype_shares,
            rank_totals,
            rank_buckets,
            match_totals,
            unmatched,
            mixed_pairs: results.mixed_pairs.len(),
            ladder_impact,
        }
    }

    /// Share of matches that paired users who rolled the same archetype.
    pub fn same_archetype_rate(&self) -> f64 {
        percentage(self.match_totals.same_archetype, self.match_totals.total())
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
