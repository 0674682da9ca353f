//! Next-hop selection and failover for outbound requests.
//!
//! A [`CandidateGroup`] comes from the [`Registry`] (static) or from a
//! [`GroupResolver`] (DNS). A fresh [`Selector`] is built over it for every
//! call attempt, and [`Registry::is_retryable`] decides whether a failed
//! hop may be followed by the next one. [`CallAttempt`] strings these
//! together.

pub mod attempt;
pub mod candidate;
pub mod dns;
pub mod failover;
pub mod group;
pub mod load_balancer;
pub mod registry;
pub mod resolver;

pub use attempt::{AlwaysUp, AttemptOutcome, AttemptState, CallAttempt, HopOutcome, Liveness, NextHopSender};
pub use candidate::Candidate;
pub use dns::DnsLocator;
pub use failover::{FailoverPolicy, GLOBAL_POLICY};
pub use group::{order_groups, CandidateGroup, DynamicGroup};
pub use load_balancer::Selector;
pub use registry::Registry;
pub use resolver::{Destination, GroupResolver, Hop, Locator, LookupStrategy, Resolution};
