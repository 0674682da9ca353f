use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError as HickoryError, ResolveErrorKind};
use hickory_resolver::proto::rr::rdata::SRV;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, warn};

use crate::common::error::DnsError;
use crate::common::types::{Transport, DEFAULT_RANK, DEFAULT_WEIGHT};
use crate::proxy::resolver::{Destination, Hop, Locator, LookupStrategy};

/// SRV service names to query, in order, for each strategy.
pub fn srv_families(strategy: LookupStrategy) -> &'static [(&'static str, Transport)] {
    match strategy {
        LookupStrategy::TlsThenTcp => &[("_sips._tcp", Transport::Tls), ("_sip._tcp", Transport::Tcp)],
        LookupStrategy::TcpThenTls => &[("_sip._tcp", Transport::Tcp), ("_sips._tcp", Transport::Tls)],
        LookupStrategy::Udp => &[("_sip._udp", Transport::Udp)],
    }
}

/// Locator doing SIP server location over DNS (RFC 3263 style).
///
/// Without an explicit port the SRV families of the strategy are queried in
/// order and the first family with records wins; each record keeps its
/// priority and weight. With an explicit port, or when no family has SRV
/// records, the host's A/AAAA records are used with the default rank and
/// weight. IP literals are returned as they are.
pub struct DnsLocator {
    resolver: TokioAsyncResolver,
}

impl DnsLocator {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }

    async fn srv_hops(
        &self,
        host: &str,
        service: &str,
        transport: Transport,
    ) -> Result<Vec<Hop>, DnsError> {
        let name = format!("{service}.{host}");
        let records = match self.resolver.srv_lookup(name.as_str()).await {
            Ok(records) => records,
            Err(e) if is_empty_answer(&e) => return Ok(Vec::new()),
            Err(e) => return Err(dns_error(host, &e)),
        };

        let mut hops = Vec::new();
        for srv in records.iter() {
            let Some(target) = srv_target(srv) else {
                continue;
            };

            match self.resolver.lookup_ip(target.as_str()).await {
                Ok(ips) => hops.extend(ips.iter().map(|ip| srv_hop(srv, &target, ip, transport))),
                Err(e) => warn!(srv = %name, target = %target, error = %e, "skipping SRV target"),
            }
        }

        Ok(hops)
    }

    async fn address_hops(
        &self,
        host: &str,
        port: u16,
        transport: Transport,
    ) -> Result<Vec<Hop>, DnsError> {
        let ips = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| dns_error(host, &e))?;

        Ok(ips
            .iter()
            .map(|ip| address_hop(host, ip, port, transport))
            .collect())
    }
}

impl Default for DnsLocator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Locator for DnsLocator {
    async fn locate(&self, destination: &Destination) -> Result<Vec<Hop>, DnsError> {
        let families = srv_families(destination.strategy);
        let primary = families[0].1;
        let host = destination.host.as_str();

        if let Some(ip) = ip_literal(host) {
            let port = destination.port.unwrap_or_else(|| primary.default_port());
            return Ok(vec![address_hop(host, ip, port, primary)]);
        }

        if destination.port.is_none() {
            for &(service, transport) in families {
                let hops = self.srv_hops(host, service, transport).await?;
                if !hops.is_empty() {
                    debug!(host, service, hops = hops.len(), "located by SRV");
                    return Ok(hops);
                }
            }
            debug!(host, "no SRV records, falling back to address records");
        }

        let port = destination.port.unwrap_or_else(|| primary.default_port());
        self.address_hops(host, port, primary).await
    }
}

fn ip_literal(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[').trim_end_matches(']').parse().ok()
}

/// Target host of an SRV record, or `None` for the "." no-service marker.
fn srv_target(srv: &SRV) -> Option<String> {
    let target = srv.target().to_utf8();
    let target = target.trim_end_matches('.');
    (!target.is_empty()).then(|| target.to_string())
}

fn srv_hop(srv: &SRV, target: &str, ip: IpAddr, transport: Transport) -> Hop {
    Hop {
        host: target.to_string(),
        ip: ip.to_string(),
        transport,
        port: srv.port(),
        priority: u32::from(srv.priority()),
        weight: u32::from(srv.weight()),
    }
}

fn address_hop(host: &str, ip: IpAddr, port: u16, transport: Transport) -> Hop {
    Hop {
        host: host.to_string(),
        ip: ip.to_string(),
        transport,
        port,
        priority: DEFAULT_RANK,
        weight: DEFAULT_WEIGHT,
    }
}

fn is_empty_answer(error: &HickoryError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

fn dns_error(host: &str, error: &HickoryError) -> DnsError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DnsError::HostNotFound(host.to_string()),
        ResolveErrorKind::Timeout => DnsError::Timeout(host.to_string()),
        _ => DnsError::Lookup(format!("{host}: {error}")),
    }
}
