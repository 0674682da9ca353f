use crate::proxy::candidate::Candidate;

/// Leading run of `candidates` sharing the first candidate's rank.
///
/// `candidates` must already be in [`Candidate::compare`] order.
pub fn top_tier(candidates: &[Candidate]) -> &[Candidate] {
    let Some(first) = candidates.first() else {
        return candidates;
    };

    let len = candidates
        .iter()
        .position(|candidate| candidate.rank() != first.rank())
        .unwrap_or(candidates.len());

    &candidates[..len]
}
