use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::configuration::Settings;
use crate::proxy::failover::{FailoverPolicy, GLOBAL_POLICY};
use crate::proxy::group::{CandidateGroup, DynamicGroup};

type Map<T> = HashMap<String, Arc<T>>;

/// Shared, read-mostly view of the configured groups and policies.
///
/// Readers get lock-free snapshots. Writers replace a whole map at once, so
/// a reader sees either the old or the new configuration, never a mix.
#[derive(Debug, Default)]
pub struct Registry {
    static_groups: ArcSwap<Map<CandidateGroup>>,
    dynamic_groups: ArcSwap<Map<DynamicGroup>>,
    policies: ArcSwap<Map<FailoverPolicy>>,
}

impl Registry {
    pub fn new(settings: &Settings) -> Self {
        let registry = Self::default();
        registry.reload(settings);
        registry
    }

    #[tracing::instrument(name = "Reload registry", skip_all)]
    pub fn reload(&self, settings: &Settings) {
        let static_groups: Map<CandidateGroup> = settings
            .server_groups
            .iter()
            .map(|group| (group.name().to_string(), Arc::new(group.clone())))
            .collect();
        let dynamic_groups: Map<DynamicGroup> = settings
            .dynamic_groups
            .iter()
            .map(|group| (group.name().to_string(), Arc::new(group.clone())))
            .collect();
        let policies: Map<FailoverPolicy> = settings
            .failover_policies
            .iter()
            .map(|policy| (policy.name().to_string(), Arc::new(policy.clone())))
            .collect();

        info!(
            static_groups = static_groups.len(),
            dynamic_groups = dynamic_groups.len(),
            policies = policies.len(),
            "registry updated"
        );

        self.static_groups.store(Arc::new(static_groups));
        self.dynamic_groups.store(Arc::new(dynamic_groups));
        self.policies.store(Arc::new(policies));
    }

    pub fn static_group(&self, name: &str) -> Option<Arc<CandidateGroup>> {
        self.static_groups.load().get(name).cloned()
    }

    pub fn dynamic_group(&self, name: &str) -> Option<Arc<DynamicGroup>> {
        self.dynamic_groups.load().get(name).cloned()
    }

    /// Adds or replaces one dynamic group without disturbing the others.
    pub fn register_dynamic(&self, group: DynamicGroup) {
        let group = Arc::new(group);
        self.dynamic_groups.rcu(|current| {
            let mut next = Map::clone(current);
            next.insert(group.name().to_string(), Arc::clone(&group));
            next
        });
    }

    pub fn policy(&self, name: &str) -> Option<Arc<FailoverPolicy>> {
        self.policies.load().get(name).cloned()
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .static_groups
            .load()
            .keys()
            .chain(self.dynamic_groups.load().keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Policy name governing `group`, falling back to the global policy.
    pub fn policy_name(&self, group: &str) -> String {
        let policy_ref = match self.static_group(group) {
            Some(group) => group.policy_ref().map(str::to_string),
            None => self
                .dynamic_group(group)
                .and_then(|group| group.template.policy_ref().map(str::to_string)),
        };

        policy_ref.unwrap_or_else(|| GLOBAL_POLICY.to_string())
    }

    /// Whether a failure with `code` on `group` should move on to the next
    /// candidate. Unknown policies never allow failover.
    pub fn is_retryable(&self, group: &str, code: u16) -> bool {
        let policy_name = self.policy_name(group);
        let retryable = self
            .policy(&policy_name)
            .is_some_and(|policy| policy.should_failover(code));

        debug!(group, policy = %policy_name, code, retryable, "failover decision");
        retryable
    }
}
