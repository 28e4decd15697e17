use rand::Rng;
use serde::Serialize;

use crate::{
    alignment::AlignmentRanking,
    catalog::{ArchetypeCatalog, ArchetypeId, LadderBonuses},
};

/// Total width of the dice; cumulative maxima end at this value.
pub const DICE_SPAN: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiceFace {
    pub archetype: ArchetypeId,
    pub weighted_score: f64,
    pub cumulative_max: f64,
}

/// Cumulative distribution over archetypes built from a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedDice {
    faces: Vec<DiceFace>,
    uniform: bool,
}

/// Builds the rank-weighted dice for one user.
///
/// Weighted score is `percentage * ladder[rank - 1]`. When every weighted
/// score is zero the dice is uniform over the ranked archetypes, and an empty
/// ranking yields a uniform dice over the whole catalog.
pub fn create_weighted_dice(
    ranking: &AlignmentRanking,
    ladder: &LadderBonuses,
    catalog: &ArchetypeCatalog,
) -> WeightedDice {
    if ranking.is_empty() {
        return WeightedDice::uniform(catalog.ids());
    }

    let weighted: Vec<(ArchetypeId, f64)> = ranking
        .ranked()
        .map(|(rank, score)| (score.archetype, score.percentage * ladder.bonus_for_rank(rank)))
        .collect();
    let total: f64 = weighted.iter().map(|(_, score)| score).sum();

    if total == 0.0 {
        return WeightedDice::uniform(weighted.into_iter().map(|(archetype, _)| archetype));
    }

    let mut cumulative = 0.0;
    let faces = weighted
        .into_iter()
        .map(|(archetype, weighted_score)| {
            cumulative += weighted_score / total * DICE_SPAN;
            DiceFace {
                archetype,
                weighted_score,
                cumulative_max: cumulative,
            }
        })
        .collect();

    WeightedDice {
        faces,
        uniform: false,
    }
}

impl WeightedDice {
    pub fn uniform<I: IntoIterator<Item = ArchetypeId>>(archetypes: I) -> Self {
        let archetypes: Vec<ArchetypeId> = archetypes.into_iter().collect();
        let increment = DICE_SPAN / archetypes.len().max(1) as f64;
        let mut cumulative = 0.0;
        let faces = archetypes
            .into_iter()
            .map(|archetype| {
                cumulative += increment;
                DiceFace {
                    archetype,
                    weighted_score: 0.0,
                    cumulative_max: cumulative,
                }
            })
            .collect();
        Self {
            faces,
            uniform: true,
        }
    }

    pub fn faces(&self) -> &[DiceFace] {
        &self.faces
    }

    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    /// Designed probability (0..=1) of rolling `archetype`.
    pub fn probability_of(&self, archetype: ArchetypeId) -> f64 {
        let mut previous = 0.0;
        for face in &self.faces {
            if face.archetype == archetype {
                return (face.cumulative_max - previous) / DICE_SPAN;
            }
            previous = face.cumulative_max;
        }
        0.0
    }

    /// Archetype selected by a draw `r` in `[0, DICE_SPAN)`.
    ///
    /// A draw past the last cumulative maximum (floating-point drift) selects
    /// the first face.
    pub fn select(&self, r: f64) -> ArchetypeId {
        self.faces
            .iter()
            .find(|face| r <= face.cumulative_max)
            .or_else(|| self.faces.first())
            .map_or(ArchetypeId(0), |face| face.archetype)
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> ArchetypeId {
        let r = rng.gen::<f64>() * DICE_SPAN;
        self.select(r)
    }
}

pub fn roll_weighted_dice<R: Rng + ?Sized>(dice: &WeightedDice, rng: &mut R) -> ArchetypeId {
    dice.roll(rng)
}
