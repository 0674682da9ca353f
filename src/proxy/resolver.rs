use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info_span, warn, Instrument};

use crate::common::error::{ConfigurationError, DnsError, ResolveError, ValidationError};
use crate::common::types::Transport;
use crate::proxy::candidate::Candidate;
use crate::proxy::group::{CandidateGroup, DynamicGroup};
use crate::proxy::registry::Registry;

/// Which record families the locator should try, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    TlsThenTcp,
    TcpThenTls,
    Udp,
}

impl TryFrom<Transport> for LookupStrategy {
    type Error = ConfigurationError;

    fn try_from(transport: Transport) -> Result<Self, Self::Error> {
        match transport {
            Transport::Tls => Ok(LookupStrategy::TlsThenTcp),
            Transport::Tcp => Ok(LookupStrategy::TcpThenTls),
            Transport::Udp => Ok(LookupStrategy::Udp),
            other => Err(ConfigurationError::UnsupportedTransport(other)),
        }
    }
}

/// What the locator is asked to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: Option<u16>,
    pub strategy: LookupStrategy,
    pub user_context: Option<String>,
}

/// One resolved record before it becomes a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub host: String,
    pub ip: String,
    pub transport: Transport,
    pub port: u16,
    pub priority: u32,
    pub weight: u32,
}

impl Hop {
    /// Prefers the resolved IP as the address; falls back to the host name.
    pub fn to_candidate(&self) -> Result<Candidate, ValidationError> {
        let address = if self.ip.is_empty() { &self.host } else { &self.ip };
        Ok(Candidate::new(address.as_str(), self.port, self.transport)?
            .with_rank(self.priority)
            .with_weight(self.weight))
    }
}

/// DNS lookup service (SRV/A) that turns a destination into hops.
#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self, destination: &Destination) -> Result<Vec<Hop>, DnsError>;
}

/// Future produced by [`GroupResolver::resolve`]. Dropping it cancels the
/// lookup.
pub type Resolution = Pin<Box<dyn Future<Output = Result<CandidateGroup, ResolveError>> + Send>>;

/// Builds candidate lists for groups, from configuration or DNS.
#[derive(Clone)]
pub struct GroupResolver {
    locator: Arc<dyn Locator>,
}

impl GroupResolver {
    pub fn new(locator: Arc<dyn Locator>) -> Self {
        Self { locator }
    }

    /// Starts resolving `hostname` into a copy of `group`.
    ///
    /// Transports DNS cannot serve are rejected here, before any lookup is
    /// issued. Locator errors reach the caller unchanged. Hops that do not
    /// make a valid candidate are skipped; an answer left without any is
    /// [`ResolveError::EmptyResolution`].
    pub fn resolve(
        &self,
        group: &CandidateGroup,
        hostname: &str,
        port: Option<u16>,
        transport: Transport,
        user_context: Option<&str>,
    ) -> Result<Resolution, ConfigurationError> {
        let strategy = LookupStrategy::try_from(transport)?;
        let destination = Destination {
            host: hostname.to_string(),
            port,
            strategy,
            user_context: user_context.map(str::to_string),
        };

        let locator = Arc::clone(&self.locator);
        let template = group.clone();
        let span = info_span!("resolve", group = %template.name(), host = %destination.host);

        Ok(Box::pin(
            complete_resolution(locator, destination, template).instrument(span),
        ))
    }

    pub fn resolve_dynamic(
        &self,
        group: &DynamicGroup,
        user_context: Option<&str>,
    ) -> Result<Resolution, ConfigurationError> {
        self.resolve(
            &group.template,
            &group.host,
            group.port,
            group.transport,
            user_context,
        )
    }

    /// Candidate group for `name`: the configured one if static, a fresh
    /// resolution if dynamic.
    pub async fn group(
        &self,
        registry: &Registry,
        name: &str,
        user_context: Option<&str>,
    ) -> Result<CandidateGroup, ResolveError> {
        if let Some(group) = registry.static_group(name) {
            return Ok(CandidateGroup::clone(&group));
        }

        let dynamic = registry
            .dynamic_group(name)
            .ok_or_else(|| ResolveError::UnknownGroup(name.to_string()))?;
        self.resolve_dynamic(&dynamic, user_context)?.await
    }
}

async fn complete_resolution(
    locator: Arc<dyn Locator>,
    destination: Destination,
    template: CandidateGroup,
) -> Result<CandidateGroup, ResolveError> {
    let hops = locator.locate(&destination).await?;

    let candidates = hops
        .iter()
        .filter_map(|hop| match hop.to_candidate() {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                warn!(host = %hop.host, ip = %hop.ip, port = hop.port, error = %e, "skipping unusable hop");
                None
            }
        })
        .collect::<Vec<_>>();

    if candidates.is_empty() {
        return Err(ResolveError::EmptyResolution(destination.host));
    }

    debug!(hops = candidates.len(), "resolved server group");
    Ok(template.with_candidates(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::LbType;
    use crate::configuration::Settings;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedLocator {
        answer: Result<Vec<Hop>, DnsError>,
        calls: AtomicUsize,
        last: Mutex<Option<Destination>>,
    }

    impl FixedLocator {
        fn new(answer: Result<Vec<Hop>, DnsError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Locator for FixedLocator {
        async fn locate(&self, destination: &Destination) -> Result<Vec<Hop>, DnsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(destination.clone());
            self.answer.clone()
        }
    }

    fn hop(ip: &str, port: u16, transport: Transport, priority: u32, weight: u32) -> Hop {
        Hop {
            host: "sip.example.com".into(),
            ip: ip.into(),
            transport,
            port,
            priority,
            weight,
        }
    }

    fn template() -> CandidateGroup {
        CandidateGroup::builder("cloud")
            .network("net-cc")
            .lb_type(LbType::Weight)
            .policy("carrier")
            .q_value(0.8)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn maps_hops_into_candidates() {
        let locator = FixedLocator::new(Ok(vec![hop("2.2.2.2", 5061, Transport::Tls, 1, 1)]));
        let resolver = GroupResolver::new(locator.clone());
        let group = template();

        let resolved = resolver
            .resolve(&group, "sip.example.com", Some(5061), Transport::Tls, None)
            .unwrap()
            .await
            .unwrap();

        let candidates = resolved.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].address(), "2.2.2.2");
        assert_eq!(candidates[0].rank(), 1);
        assert_eq!(candidates[0].weight(), 1);
        assert_eq!(candidates[0].transport(), Transport::Tls);
        assert_eq!(candidates[0].port(), 5061);

        assert_eq!(resolved.name(), group.name());
        assert_eq!(resolved.network_name(), "net-cc");
        assert_eq!(resolved.lb_type(), LbType::Weight);
        assert_eq!(resolved.policy_ref(), Some("carrier"));
        assert!(group.candidates().is_empty());
    }

    #[tokio::test]
    async fn transport_picks_lookup_strategy() {
        let locator = FixedLocator::new(Ok(vec![hop("2.2.2.2", 5060, Transport::Tcp, 1, 1)]));
        let resolver = GroupResolver::new(locator.clone());

        for (transport, strategy) in [
            (Transport::Tls, LookupStrategy::TlsThenTcp),
            (Transport::Tcp, LookupStrategy::TcpThenTls),
            (Transport::Udp, LookupStrategy::Udp),
        ] {
            resolver
                .resolve(&template(), "sip.example.com", None, transport, Some("alice"))
                .unwrap()
                .await
                .unwrap();

            let last = locator.last.lock().unwrap().clone().unwrap();
            assert_eq!(last.strategy, strategy);
            assert_eq!(last.user_context.as_deref(), Some("alice"));
        }
    }

    #[test]
    fn unsupported_transport_fails_before_lookup() {
        let locator = FixedLocator::new(Ok(vec![]));
        let resolver = GroupResolver::new(locator.clone());

        let result = resolver.resolve(&template(), "sip.example.com", None, Transport::Sctp, None);

        assert!(matches!(
            result,
            Err(ConfigurationError::UnsupportedTransport(Transport::Sctp))
        ));
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dns_errors_pass_through_unchanged() {
        let locator = FixedLocator::new(Err(DnsError::HostNotFound("nowhere.invalid".into())));
        let resolver = GroupResolver::new(locator);

        let err = resolver
            .resolve(&template(), "nowhere.invalid", None, Transport::Udp, None)
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::Dns(DnsError::HostNotFound(ref host)) if host == "nowhere.invalid"
        ));
    }

    #[tokio::test]
    async fn empty_answer_is_an_error() {
        let resolver = GroupResolver::new(FixedLocator::new(Ok(vec![])));

        let err = resolver
            .resolve(&template(), "sip.example.com", None, Transport::Udp, None)
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::EmptyResolution(_)));
    }

    #[tokio::test]
    async fn hop_without_ip_uses_host_name() {
        let mut unresolved = hop("", 5060, Transport::Udp, 5, 10);
        unresolved.host = "gw.example.com".into();
        let resolver = GroupResolver::new(FixedLocator::new(Ok(vec![unresolved])));

        let resolved = resolver
            .resolve(&template(), "sip.example.com", None, Transport::Udp, None)
            .unwrap()
            .await
            .unwrap();

        assert_eq!(resolved.candidates()[0].address(), "gw.example.com");
    }

    #[tokio::test]
    async fn named_lookup_covers_static_dynamic_and_unknown() {
        let settings = Settings {
            server_groups: vec![CandidateGroup::builder("pstn")
                .candidate(Candidate::new("10.0.0.1", 5060, Transport::Udp).unwrap())
                .build()
                .unwrap()],
            dynamic_groups: vec![DynamicGroup::new(template(), "sip.example.com", None, Transport::Tls)
                .unwrap()],
            failover_policies: vec![],
        };
        let registry = Registry::new(&settings);
        let locator = FixedLocator::new(Ok(vec![hop("3.3.3.3", 5061, Transport::Tls, 1, 1)]));
        let resolver = GroupResolver::new(locator.clone());

        let pstn = resolver.group(&registry, "pstn", None).await.unwrap();
        assert_eq!(pstn.candidates()[0].address(), "10.0.0.1");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);

        let cloud = resolver.group(&registry, "cloud", None).await.unwrap();
        assert_eq!(cloud.candidates()[0].address(), "3.3.3.3");

        assert!(matches!(
            resolver.group(&registry, "nope", None).await,
            Err(ResolveError::UnknownGroup(_))
        ));
    }

    #[tokio::test]
    async fn unusable_hops_are_skipped() {
        let resolver = GroupResolver::new(FixedLocator::new(Ok(vec![
            hop("2.2.2.2", 0, Transport::Udp, 1, 1),
            hop("3.3.3.3", 5060, Transport::Udp, 2, 1),
        ])));

        let resolved = resolver
            .resolve(&template(), "sip.example.com", None, Transport::Udp, None)
            .unwrap()
            .await
            .unwrap();

        assert_eq!(resolved.candidates().len(), 1);
        assert_eq!(resolved.candidates()[0].address(), "3.3.3.3");
    }

    #[tokio::test]
    async fn answer_of_only_unusable_hops_is_empty() {
        let mut nameless = hop("", 5060, Transport::Udp, 1, 1);
        nameless.host = String::new();
        let resolver = GroupResolver::new(FixedLocator::new(Ok(vec![
            hop("2.2.2.2", 0, Transport::Udp, 1, 1),
            nameless,
        ])));

        let err = resolver
            .resolve(&template(), "sip.example.com", None, Transport::Udp, None)
            .unwrap()
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::EmptyResolution(ref host) if host == "sip.example.com"));
    }

    /// Never answers; records when the pending lookup is torn down.
    struct StalledLocator {
        dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Locator for StalledLocator {
        async fn locate(&self, _destination: &Destination) -> Result<Vec<Hop>, DnsError> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            std::future::pending::<()>().await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn dropping_a_pending_resolution_cancels_it() {
        let settings = Settings {
            server_groups: vec![CandidateGroup::builder("pstn")
                .candidate(Candidate::new("10.0.0.1", 5060, Transport::Udp).unwrap())
                .build()
                .unwrap()],
            dynamic_groups: vec![DynamicGroup::new(template(), "sip.example.com", None, Transport::Tls)
                .unwrap()],
            failover_policies: vec![],
        };
        let registry = Registry::new(&settings);
        let dropped = Arc::new(AtomicBool::new(false));
        let resolver = GroupResolver::new(Arc::new(StalledLocator {
            dropped: Arc::clone(&dropped),
        }));

        let dynamic = registry.dynamic_group("cloud").unwrap();
        let resolution = resolver.resolve_dynamic(&dynamic, None).unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), resolution).await;

        assert!(waited.is_err());
        assert!(dropped.load(Ordering::SeqCst));

        let dynamic = registry.dynamic_group("cloud").unwrap();
        assert!(dynamic.template.candidates().is_empty());
        assert_eq!(registry.static_group("pstn").unwrap().candidates().len(), 1);
        assert_eq!(registry.group_names().len(), 2);
    }
}
