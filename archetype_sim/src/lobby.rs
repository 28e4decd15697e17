use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::{
    pairing::{pair_users, Selection},
    population::UserId,
};

pub const MIN_LOBBY_SIZE: usize = 5;
pub const MAX_LOBBY_SIZE: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lobby {
    pub seats: Vec<Selection>,
}

impl Lobby {
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LobbyOutcome {
    pub lobbies: Vec<Lobby>,
    pub leftovers: Vec<UserId>,
}

/// Seats players into lobbies of 5 to 7.
///
/// Players are first ordered by same-archetype pairing, then shuffled as a
/// whole and cut into lobbies of `min(7, remaining)` while at least five
/// remain. Fewer than five selections produce no lobbies.
pub fn form_lobbies<R: Rng + ?Sized>(selections: Vec<Selection>, rng: &mut R) -> LobbyOutcome {
    if selections.len() < MIN_LOBBY_SIZE {
        return LobbyOutcome {
            lobbies: Vec::new(),
            leftovers: selections.iter().map(|selection| selection.user).collect(),
        };
    }

    let pairing = pair_users(selections, rng);
    let mut players: Vec<Selection> = pairing
        .matches
        .iter()
        .flat_map(|m| [m.first, m.second])
        .chain(pairing.leftover)
        .collect();
    players.shuffle(rng);

    let mut lobbies = Vec::new();
    let mut cursor = 0;
    while players.len() - cursor >= MIN_LOBBY_SIZE {
        let size = MAX_LOBBY_SIZE.min(players.len() - cursor);
        lobbies.push(Lobby {
            seats: players[cursor..cursor + size].to_vec(),
        });
        cursor += size;
    }

    tracing::debug!(
        target: "archetype_sim::lobby",
        lobbies = lobbies.len(),
        leftovers = players.len() - cursor,
        "lobby.formed"
    );

    LobbyOutcome {
        lobbies,
        leftovers: players[cursor..].iter().map(|seat| seat.user).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ArchetypeId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn selections(count: u32) -> Vec<Selection> {
        (0..count)
            .map(|user| Selection {
                user: UserId(user),
                archetype: ArchetypeId((user % 3) as u16),
                rank: 1,
            })
            .collect()
    }

    #[test]
    fn too_few_players_are_all_leftovers() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let outcome = form_lobbies(selections(4), &mut rng);
        assert!(outcome.lobbies.is_empty());
        assert_eq!(outcome.leftovers.len(), 4);
    }

    #[test]
    fn lobby_sizes_follow_cut_rule() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let cases = [
            (5, vec![5], 0),
            (7, vec![7], 0),
            (8, vec![7], 1),
            (12, vec![7, 5], 0),
            (18, vec![7, 7], 4),
        ];
        for (count, sizes, leftovers) in cases {
            let outcome = form_lobbies(selections(count), &mut rng);
            let actual: Vec<usize> = outcome.lobbies.iter().map(Lobby::len).collect();
            assert_eq!(actual, sizes, "lobby sizes for {count} players");
            assert_eq!(outcome.leftovers.len(), leftovers);
        }
    }

    #[test]
    fn every_player_is_seated_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let outcome = form_lobbies(selections(40), &mut rng);
        let mut seen = HashSet::new();
        for lobby in &outcome.lobbies {
            assert!((MIN_LOBBY_SIZE..=MAX_LOBBY_SIZE).contains(&lobby.len()));
            for seat in &lobby.seats {
                assert!(seen.insert(seat.user));
            }
        }
        for user in &outcome.leftovers {
            assert!(seen.insert(*user));
        }
        assert_eq!(seen.len(), 40);
    }
}
