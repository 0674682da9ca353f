use std::fmt;
use std::str::FromStr;

use crate::common::error::ValidationError;

/// Rank given to a candidate when the configuration does not set one.
pub const DEFAULT_RANK: u32 = 10;

/// Weight given to a candidate when the configuration does not set one.
pub const DEFAULT_WEIGHT: u32 = 100;

/// SIP transport of a next hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Sctp,
}

impl Transport {
    pub fn is_reliable(&self) -> bool {
        !matches!(self, Transport::Udp)
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Transport::Tls => 5061,
            Transport::Udp | Transport::Tcp | Transport::Sctp => 5060,
        }
    }

    /// Numeric code used as the last tie-break when ordering candidates.
    pub fn code(&self) -> u8 {
        match self {
            Transport::Udp => 1,
            Transport::Tcp => 2,
            Transport::Tls => 3,
            Transport::Sctp => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
            Transport::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "tls" => Ok(Transport::Tls),
            "sctp" => Ok(Transport::Sctp),
            _ => Err(ValidationError::UnknownTransport(s.to_string())),
        }
    }
}

/// Load-balancing discipline applied by a [`crate::proxy::Selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LbType {
    /// Uniform random pick inside the best-ranked tier.
    #[default]
    HighestPreference,
    /// Weighted random pick inside the best-ranked tier.
    Weight,
    /// Same draw as `Weight`, used for hunt groups.
    Hunt,
    /// One random pick over every candidate, no retries.
    Once,
    /// Deterministic pick inside the tier keyed by a correlation id.
    MsId,
}

impl LbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbType::HighestPreference => "highest-preference",
            LbType::Weight => "weight",
            LbType::Hunt => "hunt",
            LbType::Once => "once",
            LbType::MsId => "ms-id",
        }
    }
}

impl fmt::Display for LbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LbType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "highest-preference" => Ok(LbType::HighestPreference),
            "weight" | "weighted" => Ok(LbType::Weight),
            "hunt" => Ok(LbType::Hunt),
            "once" => Ok(LbType::Once),
            "ms-id" | "hash" => Ok(LbType::MsId),
            _ => Err(ValidationError::UnknownLbType(s.to_string())),
        }
    }
}
