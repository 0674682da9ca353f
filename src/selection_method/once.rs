use rand::Rng;

use crate::proxy::candidate::Candidate;

/// Uniform random member of the whole set, ignoring rank.
pub fn select(candidates: &[Candidate]) -> usize {
    rand::thread_rng().gen_range(0..candidates.len())
}
