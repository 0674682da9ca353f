use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::common::error::ValidationError;
use crate::common::types::{Transport, DEFAULT_RANK, DEFAULT_WEIGHT};

/// One concrete next hop a request may be sent to.
///
/// Identity is `(address, port, transport)`; `rank` and `weight` only affect
/// ordering. Two candidates that differ only in rank or weight are duplicates.
#[derive(Debug, Clone)]
pub struct Candidate {
    address: String,
    port: u16,
    transport: Transport,
    rank: u32,
    weight: u32,
    membership_key: OnceLock<String>,
}

impl Candidate {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        transport: Transport,
    ) -> Result<Self, ValidationError> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        if port == 0 {
            return Err(ValidationError::MissingPort(address));
        }

        Ok(Self {
            address,
            port,
            transport,
            rank: DEFAULT_RANK,
            weight: DEFAULT_WEIGHT,
            membership_key: OnceLock::new(),
        })
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Preference of this hop; lower ranks are tried first.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Stable key used by health tracking to refer to this hop.
    pub fn group_membership_key(&self) -> &str {
        self.membership_key
            .get_or_init(|| format!("{}:{}:{}", self.address, self.port, self.transport))
    }

    /// Total order used for the working set of a selector.
    ///
    /// Rank ascending, then weight descending, then host, port and transport
    /// code ascending. `Ordering::Equal` means the two are duplicates.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| other.weight.cmp(&self.weight))
            .then_with(|| compare_hosts(&self.address, &other.address))
            .then_with(|| self.port.cmp(&other.port))
            .then_with(|| self.transport.code().cmp(&other.transport.code()))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.port == other.port
            && self.transport == other.transport
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.port.hash(state);
        self.transport.hash(state);
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{};transport={} (rank {}, weight {})",
            self.address, self.port, self.transport, self.rank, self.weight
        )
    }
}

/// Dotted hosts whose segments are all numeric on both sides (and equally
/// many) compare as integers, everything else compares segment by segment
/// from the right, so `b.example.com` sorts next to `a.example.com`.
fn compare_hosts(left: &str, right: &str) -> Ordering {
    let left_parts: Vec<&str> = left.split('.').collect();
    let right_parts: Vec<&str> = right.split('.').collect();

    if left_parts.len() == right_parts.len() {
        let left_numbers = numeric_segments(&left_parts);
        let right_numbers = numeric_segments(&right_parts);
        if let (Some(l), Some(r)) = (left_numbers, right_numbers) {
            return l.cmp(&r).then_with(|| left.cmp(right));
        }
    }

    left_parts
        .iter()
        .rev()
        .cmp(right_parts.iter().rev())
        .then_with(|| left.cmp(right))
}

fn numeric_segments(parts: &[&str]) -> Option<Vec<u64>> {
    parts.iter().map(|part| part.parse::<u64>().ok()).collect()
}
