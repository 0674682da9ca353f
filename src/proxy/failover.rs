use std::collections::BTreeSet;

use crate::common::error::ValidationError;

/// Policy name used when a group does not reference one.
pub const GLOBAL_POLICY: &str = "global";

/// Named set of response codes that justify trying the next candidate.
///
/// Only codes strictly between 400 and 600 are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverPolicy {
    name: String,
    failover_response_codes: BTreeSet<u16>,
}

impl FailoverPolicy {
    pub fn new(
        name: impl Into<String>,
        codes: impl IntoIterator<Item = u16>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingPolicyName);
        }

        let failover_response_codes: BTreeSet<u16> = codes.into_iter().collect();
        let (Some(&min), Some(&max)) = (
            failover_response_codes.first(),
            failover_response_codes.last(),
        ) else {
            return Err(ValidationError::EmptyPolicy(name));
        };

        if min <= 400 || max >= 600 {
            return Err(ValidationError::PolicyOutOfRange { name, min, max });
        }

        Ok(Self {
            name,
            failover_response_codes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failover_response_codes(&self) -> &BTreeSet<u16> {
        &self.failover_response_codes
    }

    pub fn should_failover(&self, code: u16) -> bool {
        self.failover_response_codes.contains(&code)
    }
}
