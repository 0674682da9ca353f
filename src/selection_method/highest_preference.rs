use rand::Rng;

use crate::proxy::candidate::Candidate;

/// Uniform random member of `tier`.
pub fn select(tier: &[Candidate]) -> usize {
    rand::thread_rng().gen_range(0..tier.len())
}
