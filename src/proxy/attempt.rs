use async_trait::async_trait;
use tracing::{debug, info};

use crate::common::error::ResolveError;
use crate::proxy::candidate::Candidate;
use crate::proxy::group::CandidateGroup;
use crate::proxy::load_balancer::Selector;
use crate::proxy::registry::Registry;
use crate::proxy::resolver::GroupResolver;

/// Result of sending a request to one next hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopOutcome {
    Success,
    /// Final failure response, or the code the transport layer maps a
    /// timeout or connection error to (408, 503, ...).
    Failure(u16),
}

/// Sends the request to a candidate. Timeouts are its business.
#[async_trait]
pub trait NextHopSender: Send + Sync {
    async fn send(&self, candidate: &Candidate) -> HopOutcome;
}

/// Health view (circuit breaker, OPTIONS ping) keyed by
/// [`Candidate::group_membership_key`].
pub trait Liveness: Send + Sync {
    fn is_up(&self, membership_key: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUp;

impl Liveness for AlwaysUp {
    fn is_up(&self, _membership_key: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Start,
    HasGroup,
    Trying,
    TerminalSuccess,
    TerminalFailure,
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Succeeded {
        candidate: Candidate,
        tried: Vec<Candidate>,
    },
    /// Every eligible candidate failed, a failure was not retryable, or
    /// there was nothing to try (`tried` is empty).
    Failed {
        last_code: Option<u16>,
        tried: Vec<Candidate>,
    },
}

/// Drives one call attempt: resolve the group, then send to candidates
/// until one succeeds, a failure is not retryable, or none are left.
pub struct CallAttempt<'a> {
    registry: &'a Registry,
    resolver: &'a GroupResolver,
    liveness: &'a dyn Liveness,
    key: Option<String>,
    state: AttemptState,
}

impl<'a> CallAttempt<'a> {
    pub fn new(registry: &'a Registry, resolver: &'a GroupResolver) -> Self {
        Self {
            registry,
            resolver,
            liveness: &AlwaysUp,
            key: None,
            state: AttemptState::Start,
        }
    }

    pub fn with_liveness(mut self, liveness: &'a dyn Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    /// Correlation key (e.g. the Call-ID) handed to the selector.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub async fn run(
        &mut self,
        group_name: &str,
        sender: &dyn NextHopSender,
    ) -> Result<AttemptOutcome, ResolveError> {
        let group = match self.resolver.group(self.registry, group_name, None).await {
            Ok(group) => group,
            Err(e) => {
                self.state = AttemptState::TerminalFailure;
                return Err(e);
            }
        };

        Ok(self.run_group(&group, sender).await)
    }

    pub async fn run_group(
        &mut self,
        group: &CandidateGroup,
        sender: &dyn NextHopSender,
    ) -> AttemptOutcome {
        self.state = AttemptState::HasGroup;

        let mut selector = Selector::of(group);
        if let Some(key) = &self.key {
            selector.set_key(key.as_str());
        }

        let mut tried = Vec::new();
        let mut last_code = None;

        while let Some(candidate) = selector.next() {
            if !self.liveness.is_up(candidate.group_membership_key()) {
                debug!(group = %group.name(), candidate = %candidate, "skipping hop marked down");
                continue;
            }

            self.state = AttemptState::Trying;
            tried.push(candidate.clone());

            match sender.send(&candidate).await {
                HopOutcome::Success => {
                    self.state = AttemptState::TerminalSuccess;
                    return AttemptOutcome::Succeeded { candidate, tried };
                }
                HopOutcome::Failure(code) => {
                    last_code = Some(code);
                    if !self.registry.is_retryable(group.name(), code) {
                        info!(group = %group.name(), candidate = %candidate, code, "failure is not retryable");
                        break;
                    }
                }
            }
        }

        self.state = AttemptState::TerminalFailure;
        AttemptOutcome::Failed { last_code, tried }
    }
}
