use std::collections::HashMap;

use archetype_sim::{
    compute_alignment, create_weighted_dice, ArchetypeCatalog, InterestSet, PreparedUser, User,
    UserId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const ROLLS: usize = 100_000;

#[test]
fn roll_frequencies_track_designed_probabilities() {
    let catalog = ArchetypeCatalog::builtin();
    let interests = catalog.interest_set(["cars", "gaming", "yoga", "music", "chess"]);
    let ranking = compute_alignment(interests, &catalog);
    let dice = create_weighted_dice(&ranking, catalog.ladder(), &catalog);
    assert!(!dice.is_uniform());

    let mut rng = ChaCha8Rng::seed_from_u64(0xD1CE);
    let mut counts = HashMap::new();
    for _ in 0..ROLLS {
        *counts.entry(dice.roll(&mut rng)).or_insert(0usize) += 1;
    }

    for face in dice.faces() {
        let expected = dice.probability_of(face.archetype);
        let observed = counts.get(&face.archetype).copied().unwrap_or(0) as f64 / ROLLS as f64;
        assert!(
            (observed - expected).abs() < 0.01,
            "{}: observed {observed:.4}, expected {expected:.4}",
            catalog.name(face.archetype)
        );
    }

    let zero_weight: Vec<_> = dice
        .faces()
        .iter()
        .filter(|face| face.weighted_score == 0.0)
        .map(|face| face.archetype)
        .collect();
    for archetype in zero_weight {
        assert_eq!(counts.get(&archetype), None, "{} was rolled", catalog.name(archetype));
    }
}

#[test]
fn top_rank_is_favoured_over_bottom_rank() {
    let catalog = ArchetypeCatalog::builtin();
    let user = User {
        id: UserId(0),
        interests: catalog.interest_set(["cars", "gaming", "working_out", "motorcycles", "sports"]),
    };
    let prepared = PreparedUser::new(user, &catalog);

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut ranks = vec![0usize; catalog.len() + 1];
    for _ in 0..ROLLS {
        ranks[prepared.roll(&mut rng).rank] += 1;
    }
    assert!(ranks[1] > ranks[catalog.len()]);
    assert_eq!(ranks[0], 0);
    assert_eq!(ranks.iter().sum::<usize>(), ROLLS);
}

#[test]
fn interestless_user_rolls_uniformly() {
    let catalog = ArchetypeCatalog::builtin();
    let prepared = PreparedUser::new(
        User {
            id: UserId(3),
            interests: InterestSet::empty(),
        },
        &catalog,
    );
    assert!(prepared.dice.is_uniform());

    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let mut counts = vec![0usize; catalog.len()];
    for _ in 0..ROLLS {
        let selection = prepared.roll(&mut rng);
        assert_eq!(selection.rank, 1);
        counts[selection.archetype.index()] += 1;
    }

    let expected = 1.0 / catalog.len() as f64;
    for count in counts {
        assert!((count as f64 / ROLLS as f64 - expected).abs() < 0.01);
    }
}
