use serde::{Deserialize, Serialize};

use crate::catalog::{ArchetypeCatalog, ArchetypeId, InterestSet};

/// Share of a user's interests that an archetype owns, as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentScore {
    pub archetype: ArchetypeId,
    pub percentage: f64,
}

/// Alignment scores sorted by descending percentage.
///
/// Position `i` holds rank `i + 1`. Equal percentages keep catalog
/// declaration order. Empty only for a user with no interests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignmentRanking {
    scores: Vec<AlignmentScore>,
}

impl AlignmentRanking {
    /// Wraps scores that are already in rank order.
    pub fn from_ranked(scores: Vec<AlignmentScore>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &[AlignmentScore] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn top(&self) -> Option<&AlignmentScore> {
        self.scores.first()
    }

    /// 1-based rank of `archetype`, if it appears in the ranking.
    pub fn rank_of(&self, archetype: ArchetypeId) -> Option<usize> {
        self.scores
            .iter()
            .position(|score| score.archetype == archetype)
            .map(|idx| idx + 1)
    }

    pub fn ranked(&self) -> impl Iterator<Item = (usize, &AlignmentScore)> {
        self.scores.iter().enumerate().map(|(idx, score)| (idx + 1, score))
    }
}

pub fn compute_alignment(user: InterestSet, catalog: &ArchetypeCatalog) -> AlignmentRanking {
    let user_ones = user.len();
    if user_ones == 0 {
        return AlignmentRanking::default();
    }

    let mut scores: Vec<AlignmentScore> = catalog
        .archetypes()
        .iter()
        .map(|archetype| {
            let shared = user.shared_with(archetype.interests);
            AlignmentScore {
                archetype: archetype.id,
                percentage: round_hundredths(shared as f64 / user_ones as f64 * 100.0),
            }
        })
        .collect();

    // Stable: ties stay in declaration order.
    scores.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    AlignmentRanking { scores }
}

/// Exact halves round to even, so 3.125 becomes 3.12.
fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(catalog: &ArchetypeCatalog, interests: &[&str]) -> InterestSet {
        catalog.interest_set(interests.iter().copied())
    }

    #[test]
    fn empty_user_has_no_ranking() {
        let catalog = ArchetypeCatalog::builtin();
        let ranking = compute_alignment(InterestSet::empty(), &catalog);
        assert!(ranking.is_empty());
        assert_eq!(ranking.top(), None);
    }

    #[test]
    fn ranking_covers_catalog_in_descending_order() {
        let catalog = ArchetypeCatalog::builtin();
        let interests = user(
            &catalog,
            &["programming", "chess", "history", "reading", "woodworking"],
        );
        let ranking = compute_alignment(interests, &catalog);

        assert_eq!(ranking.len(), catalog.len());
        assert!(ranking
            .scores()
            .windows(2)
            .all(|pair| pair[0].percentage >= pair[1].percentage));

        let top = ranking.top().unwrap();
        assert_eq!(catalog.name(top.archetype), "System Weaver");
        assert_eq!(top.percentage, 100.0);
        assert_eq!(ranking.rank_of(top.archetype), Some(1));
    }

    #[test]
    fn ties_keep_declaration_order() {
        let catalog = ArchetypeCatalog::builtin();
        // Photography is owned by ten archetypes; every owner scores 100%.
        let ranking = compute_alignment(user(&catalog, &["photography"]), &catalog);
        let leaders: Vec<ArchetypeId> = ranking
            .scores()
            .iter()
            .take_while(|score| score.percentage == 100.0)
            .map(|score| score.archetype)
            .collect();
        let mut sorted = leaders.clone();
        sorted.sort();
        assert_eq!(leaders, sorted);
        assert_eq!(leaders.len(), 10);
    }

    #[test]
    fn percentages_are_rounded_to_hundredths() {
        let catalog = ArchetypeCatalog::builtin();
        let ranking = compute_alignment(user(&catalog, &["cars", "gaming", "yoga"]), &catalog);
        let captain = catalog.find("Grid Captain").unwrap();
        let score = ranking
            .scores()
            .iter()
            .find(|score| score.archetype == captain)
            .unwrap();
        assert_eq!(score.percentage, 66.67);
    }

    #[test]
    fn exact_halves_round_to_even() {
        let catalog = ArchetypeCatalog::builtin();
        let weaver = catalog.find("System Weaver").unwrap();
        let owned = catalog.archetype(weaver).unwrap().interests;
        let outside: Vec<usize> = (0..catalog.interest_count())
            .filter(|idx| !owned.contains(*idx))
            .collect();

        let percentage_for = |shared: usize| {
            let interests = InterestSet::from_indices(
                owned
                    .iter()
                    .take(shared)
                    .chain(outside.iter().copied().take(32 - shared)),
            );
            assert_eq!(interests.len(), 32);
            compute_alignment(interests, &catalog)
                .scores()
                .iter()
                .find(|score| score.archetype == weaver)
                .map(|score| score.percentage)
                .unwrap()
        };

        // 1/32 = 3.125% and 5/32 = 15.625%
        assert_eq!(percentage_for(1), 3.12);
        assert_eq!(percentage_for(5), 15.62);
    }
}
