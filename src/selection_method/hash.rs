use sha1::{Digest, Sha1};

use crate::proxy::candidate::Candidate;

/// Tier member chosen by hashing a correlation key.
///
/// Without a key the first member is returned, which keeps unkeyed traffic
/// on a stable, reproducible hop. The hash is SHA-1 based so the mapping
/// does not change between processes or builds.
pub fn select(tier: &[Candidate], key: Option<&str>) -> usize {
    match key {
        None => 0,
        Some(key) => (stable_hash(key) % tier.len() as u64) as usize,
    }
}

fn stable_hash(key: &str) -> u64 {
    let digest = Sha1::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
