use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::warn;

use crate::common::error::ValidationError;
use crate::common::types::{LbType, Transport};
use crate::proxy::candidate::Candidate;

/// A named logical destination (trunk) and the hops that serve it.
///
/// Candidates are kept deduplicated by identity and sorted with
/// [`Candidate::compare`]. Groups are values: updates go through
/// [`CandidateGroup::with_candidates`] and produce a new group.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGroup {
    name: String,
    network_name: String,
    lb_type: LbType,
    candidates: Vec<Candidate>,
    policy_ref: Option<String>,
    q_value: f32,
    weight: u32,
}

impl CandidateGroup {
    pub fn builder(name: impl Into<String>) -> CandidateGroupBuilder {
        CandidateGroupBuilder {
            name: name.into(),
            network_name: String::new(),
            lb_type: LbType::default(),
            candidates: Vec::new(),
            policy_ref: None,
            q_value: 1.0,
            weight: 100,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn lb_type(&self) -> LbType {
        self.lb_type
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn policy_ref(&self) -> Option<&str> {
        self.policy_ref.as_deref()
    }

    pub fn q_value(&self) -> f32 {
        self.q_value
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Copy of this group with its candidate list replaced.
    pub fn with_candidates(&self, candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: normalize(&self.name, candidates),
            ..self.clone()
        }
    }

    /// Order among sibling groups: q-value descending, weight descending,
    /// then name ascending.
    ///
    /// This is the reverse polarity of [`Candidate::compare`], where the
    /// smaller rank wins.
    pub fn compare(&self, other: &Self) -> Ordering {
        other
            .q_value
            .total_cmp(&self.q_value)
            .then_with(|| other.weight.cmp(&self.weight))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Sorts sibling groups of one trunk by preference.
pub fn order_groups(mut groups: Vec<CandidateGroup>) -> Vec<CandidateGroup> {
    groups.sort_by(CandidateGroup::compare);
    groups
}

#[derive(Debug)]
pub struct CandidateGroupBuilder {
    name: String,
    network_name: String,
    lb_type: LbType,
    candidates: Vec<Candidate>,
    policy_ref: Option<String>,
    q_value: f32,
    weight: u32,
}

impl CandidateGroupBuilder {
    pub fn network(mut self, network_name: impl Into<String>) -> Self {
        self.network_name = network_name.into();
        self
    }

    pub fn lb_type(mut self, lb_type: LbType) -> Self {
        self.lb_type = lb_type;
        self
    }

    pub fn candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn candidates(mut self, candidates: impl IntoIterator<Item = Candidate>) -> Self {
        self.candidates.extend(candidates);
        self
    }

    pub fn policy(mut self, policy_ref: impl Into<String>) -> Self {
        self.policy_ref = Some(policy_ref.into());
        self
    }

    pub fn q_value(mut self, q_value: f32) -> Self {
        self.q_value = q_value;
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn build(self) -> Result<CandidateGroup, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingGroupName);
        }
        if !(0.0..=1.0).contains(&self.q_value) {
            return Err(ValidationError::InvalidQValue {
                group: name,
                value: self.q_value.to_string(),
            });
        }

        let candidates = normalize(&name, self.candidates);
        let policy_ref = self.policy_ref.filter(|policy| !policy.trim().is_empty());

        Ok(CandidateGroup {
            name,
            network_name: self.network_name,
            lb_type: self.lb_type,
            candidates,
            policy_ref,
            q_value: self.q_value,
            weight: self.weight,
        })
    }
}

/// Drops duplicate identities (first occurrence wins) and sorts the rest.
fn normalize(group: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut unique = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if seen.contains(&candidate) {
            warn!(
                group,
                candidate = %candidate,
                "ignoring duplicate server group element"
            );
            continue;
        }
        seen.insert(candidate.clone());
        unique.push(candidate);
    }

    unique.sort_by(Candidate::compare);
    unique
}

/// A group whose candidates come from DNS each time it is used.
///
/// The template carries everything but the candidate list; resolution fills
/// that in on a fresh copy.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicGroup {
    pub template: CandidateGroup,
    pub host: String,
    pub port: Option<u16>,
    pub transport: Transport,
}

impl DynamicGroup {
    pub fn new(
        template: CandidateGroup,
        host: impl Into<String>,
        port: Option<u16>,
        transport: Transport,
    ) -> Result<Self, ValidationError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(ValidationError::MissingHost(template.name.clone()));
        }

        Ok(Self {
            template: template.with_candidates(Vec::new()),
            host,
            port,
            transport,
        })
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }
}
