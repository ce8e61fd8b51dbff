//! First-round placement: standard seed order and bye assignment.

use super::models::EntrantId;
use rand::Rng;

/// Seeds in bracket line order for a power-of-two bracket.
///
/// Consecutive pairs are the first-round matches, so `seed_order(8)` is
/// `[1, 8, 4, 5, 2, 7, 3, 6]`: seed `s` meets seed `size + 1 - s`, and
/// seeds 1 and 2 sit in opposite halves.
pub fn seed_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());

    let mut order = vec![1];
    while order.len() < size {
        let width = order.len() * 2;
        order = order
            .iter()
            .flat_map(|&seed| [seed, width + 1 - seed])
            .collect();
    }
    order
}

/// Entrants indexed by placement seed (index 0 holds placement seed 1).
///
/// Placement seeds `1..=byes` are the ones paired against an empty line. With
/// deterministic byes the placement is the seeding itself; with random byes
/// the recipients are sampled uniformly, moved to the front, and everyone
/// keeps their relative seed order otherwise.
pub fn place_entrants<R: Rng + ?Sized>(
    entrants: &[EntrantId],
    byes: usize,
    random_byes: bool,
    rng: &mut R,
) -> Vec<EntrantId> {
    if !random_byes || byes == 0 {
        return entrants.to_vec();
    }

    let mut recipients = rand::seq::index::sample(rng, entrants.len(), byes).into_vec();
    recipients.sort_unstable();

    let mut placement: Vec<EntrantId> = recipients.iter().map(|&i| entrants[i]).collect();
    placement.extend(
        entrants
            .iter()
            .enumerate()
            .filter(|(i, _)| recipients.binary_search(i).is_err())
            .map(|(_, &id)| id),
    );
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_seed_order_small_sizes() {
        assert_eq!(seed_order(1), vec![1]);
        assert_eq!(seed_order(2), vec![1, 2]);
        assert_eq!(seed_order(4), vec![1, 4, 2, 3]);
        assert_eq!(seed_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn test_seed_order_pairs_sum_to_size_plus_one() {
        let size = 32;
        let order = seed_order(size);
        assert_eq!(order.len(), size);
        for pair in order.chunks(2) {
            assert_eq!(pair[0] + pair[1], size + 1);
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_top_seeds_split_into_opposite_halves() {
        let order = seed_order(16);
        let (top, bottom) = order.split_at(8);
        assert!(top.contains(&1));
        assert!(bottom.contains(&2));
    }

    #[test]
    fn test_deterministic_placement_keeps_seeding() {
        let mut rng = StdRng::seed_from_u64(7);
        let placement = place_entrants(&[10, 20, 30], 1, false, &mut rng);
        assert_eq!(placement, vec![10, 20, 30]);
    }

    #[test]
    fn test_random_placement_is_a_permutation() {
        let entrants: Vec<EntrantId> = (1..=11).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let placement = place_entrants(&entrants, 5, true, &mut rng);

        assert_eq!(placement.len(), entrants.len());
        let unique: HashSet<_> = placement.iter().collect();
        assert_eq!(unique.len(), entrants.len());

        // Non-recipients keep their relative order
        let rest = &placement[5..];
        assert!(rest.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_random_recipients_vary_with_seed() {
        let entrants: Vec<EntrantId> = (1..=9).collect();
        let picks: HashSet<Vec<EntrantId>> = (0..20)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                place_entrants(&entrants, 7, true, &mut rng)[..7].to_vec()
            })
            .collect();
        assert!(picks.len() > 1);
    }
}
