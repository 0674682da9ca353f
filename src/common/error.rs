use thiserror::Error;

use crate::common::types::Transport;

/// A candidate, group or policy that cannot be built from its definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("candidate has no address")]
    MissingAddress,

    #[error("candidate {0} has no port")]
    MissingPort(String),

    #[error("unknown transport {0:?}")]
    UnknownTransport(String),

    #[error("unknown load balancing type {0:?}")]
    UnknownLbType(String),

    #[error("unknown server group kind {0:?}")]
    UnknownGroupKind(String),

    #[error("server group {0} is defined more than once")]
    DuplicateGroup(String),

    #[error("server group has no name")]
    MissingGroupName,

    #[error("server group {group} has q-value {value} outside [0.0, 1.0]")]
    InvalidQValue { group: String, value: String },

    #[error("static server group {0} has no elements")]
    EmptyGroup(String),

    #[error("dynamic server group {0} has no host")]
    MissingHost(String),

    #[error("failover policy has no name")]
    MissingPolicyName,

    #[error("failover policy {0} has no response codes")]
    EmptyPolicy(String),

    #[error("failover policy {name} has codes [{min}, {max}] outside (400, 600)")]
    PolicyOutOfRange { name: String, min: u16, max: u16 },
}

/// Dynamic resolution asked for something this engine cannot look up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("transport {0} is not supported for DNS resolution")]
    UnsupportedTransport(Transport),
}

/// Failure reported by the DNS locator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("DNS lookup for {0} timed out")]
    Timeout(String),

    #[error("host {0} not found")]
    HostNotFound(String),

    #[error("DNS lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error("DNS resolution of {0} returned no usable hops")]
    EmptyResolution(String),

    #[error("no server group named {0}")]
    UnknownGroup(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("configuration watch error: {0}")]
    Watch(#[from] notify::Error),
}
