use rand::Rng;

use crate::proxy::candidate::Candidate;

/// Weighted random member of `tier`.
///
/// Draws in `[0, total)` and returns the first member whose cumulative
/// weight is at least the draw. A tier with no weight at all has only the
/// draw `0` available, so its first member is returned.
pub fn select(tier: &[Candidate]) -> usize {
    let mut total = 0u64;
    let cumulative: Vec<u64> = tier
        .iter()
        .map(|candidate| {
            total += u64::from(candidate.weight());
            total
        })
        .collect();

    if total == 0 {
        return 0;
    }

    let draw = rand::thread_rng().gen_range(0..total);
    cumulative.partition_point(|&upto| upto < draw)
}
