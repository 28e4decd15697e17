use std::fmt;

use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};

use crate::catalog::InterestSet;

pub const DEFAULT_INTERESTS_PER_USER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl UserId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User_{}", self.0)
    }
}

/// Synthetic user; interests are fixed for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub interests: InterestSet,
}

/// Picks `picks` distinct interests uniformly out of `interest_count`.
///
/// `picks` is clamped to `interest_count`.
pub fn generate_random_user_interests<R: Rng + ?Sized>(
    rng: &mut R,
    interest_count: usize,
    picks: usize,
) -> InterestSet {
    let amount = picks.min(interest_count);
    InterestSet::from_indices(index::sample(rng, interest_count, amount).into_iter())
}

pub fn generate_population<R: Rng + ?Sized>(
    rng: &mut R,
    users: usize,
    interest_count: usize,
    interests_per_user: usize,
) -> Vec<User> {
    (0..users)
        .map(|idx| User {
            id: UserId(idx as u32),
            interests: generate_random_user_interests(rng, interest_count, interests_per_user),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn users_receive_exactly_k_interests() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let population = generate_population(&mut rng, 200, 52, DEFAULT_INTERESTS_PER_USER);
        assert_eq!(population.len(), 200);
        for (idx, user) in population.iter().enumerate() {
            assert_eq!(user.id, UserId(idx as u32));
            assert_eq!(user.interests.len(), DEFAULT_INTERESTS_PER_USER);
            assert!(user.interests.iter().all(|interest| interest < 52));
        }
    }

    #[test]
    fn picks_are_clamped_to_vocabulary() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let interests = generate_random_user_interests(&mut rng, 4, 9);
        assert_eq!(interests.len(), 4);
        let none = generate_random_user_interests(&mut rng, 52, 0);
        assert!(none.is_empty());
    }

    #[test]
    fn user_ids_render_like_labels() {
        assert_eq!(UserId(42).to_string(), "User_42");
    }
}
