use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    alignment::{compute_alignment, AlignmentRanking},
    catalog::{ArchetypeCatalog, ArchetypeId},
    dice::{create_weighted_dice, roll_weighted_dice, WeightedDice},
    population::{User, UserId},
};

/// Archetype rolled by one user in one round.
///
/// `rank` is the archetype's position in the user's unweighted alignment
/// ranking, not a post-bonus rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub user: UserId,
    pub archetype: ArchetypeId,
    pub rank: usize,
}

/// User with ranking and dice precomputed; both depend only on interests.
#[derive(Debug, Clone)]
pub struct PreparedUser {
    pub user: User,
    pub ranking: AlignmentRanking,
    pub dice: WeightedDice,
}

impl PreparedUser {
    pub fn new(user: User, catalog: &ArchetypeCatalog) -> Self {
        let ranking = compute_alignment(user.interests, catalog);
        let dice = create_weighted_dice(&ranking, catalog.ladder(), catalog);
        Self {
            user,
            ranking,
            dice,
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Selection {
        let archetype = roll_weighted_dice(&self.dice, rng);
        Selection {
            user: self.user.id,
            archetype,
            rank: self.ranking.rank_of(archetype).unwrap_or(1),
        }
    }
}

/// A simulation's fixed population with per-user alignment state.
#[derive(Debug, Clone, Default)]
pub struct PreparedPopulation {
    users: Vec<PreparedUser>,
}

impl PreparedPopulation {
    pub fn new(users: &[User], catalog: &ArchetypeCatalog) -> Self {
        Self {
            users: users
                .iter()
                .map(|user| PreparedUser::new(*user, catalog))
                .collect(),
        }
    }

    pub fn users(&self) -> &[PreparedUser] {
        &self.users
    }

    pub fn get(&self, id: UserId) -> Option<&PreparedUser> {
        self.users
            .get(id.index())
            .filter(|prepared| prepared.user.id == id)
            .or_else(|| self.users.iter().find(|prepared| prepared.user.id == id))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Rolls one archetype for every user, in population order.
pub fn run_matching_round<R: Rng + ?Sized>(
    population: &PreparedPopulation,
    rng: &mut R,
) -> Vec<Selection> {
    population
        .users()
        .iter()
        .map(|prepared| prepared.roll(rng))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    SameArchetype,
    Mixed,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::SameArchetype => "same_archetype",
            MatchKind::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Match {
    pub first: Selection,
    pub second: Selection,
    pub kind: MatchKind,
}

impl Match {
    /// Shared archetype of a same-archetype match.
    pub fn archetype(&self) -> Option<ArchetypeId> {
        match self.kind {
            MatchKind::SameArchetype => Some(self.first.archetype),
            MatchKind::Mixed => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairingOutcome {
    pub matches: Vec<Match>,
    pub leftover: Vec<Selection>,
}

/// Greedy two-phase pairing.
///
/// Selections are grouped by archetype (groups visited in archetype order),
/// each group is shuffled and popped two at a time into same-archetype
/// matches. Odd members go to a shared pool which is shuffled and popped into
/// mixed matches. At most one selection is left over.
pub fn pair_users<R: Rng + ?Sized>(selections: Vec<Selection>, rng: &mut R) -> PairingOutcome {
    let mut groups: BTreeMap<ArchetypeId, Vec<Selection>> = BTreeMap::new();
    for selection in selections {
        groups.entry(selection.archetype).or_default().push(selection);
    }

    let mut matches = Vec::new();
    let mut remaining = Vec::new();

    for mut members in groups.into_values() {
        members.shuffle(rng);
        while members.len() >= 2 {
            let (Some(first), Some(second)) = (members.pop(), members.pop()) else {
                break;
            };
            matches.push(Match {
                first,
                second,
                kind: MatchKind::SameArchetype,
            });
        }
        remaining.append(&mut members);
    }

    if remaining.len() >= 2 {
        remaining.shuffle(rng);
        while remaining.len() >= 2 {
            let (Some(first), Some(second)) = (remaining.pop(), remaining.pop()) else {
                break;
            };
            matches.push(Match {
                first,
                second,
                kind: MatchKind::Mixed,
            });
        }
    }

    PairingOutcome {
        matches,
        leftover: remaining,
    }
}
