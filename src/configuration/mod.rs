use config::{Config, Environment, File, FileFormat};
use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use tracing::{debug, error, info, warn};

use crate::common::error::{SettingsError, ValidationError};
use crate::common::types::{LbType, Transport, DEFAULT_RANK, DEFAULT_WEIGHT};
use crate::proxy::candidate::Candidate;
use crate::proxy::failover::FailoverPolicy;
use crate::proxy::group::{CandidateGroup, DynamicGroup};

#[derive(Debug, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub server_groups: Vec<RawServerGroup>,
    #[serde(default)]
    pub failover_policies: Vec<RawPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct RawServerGroup {
    pub name: String,
    #[serde(default)]
    pub network: String,
    pub kind: Option<String>,
    pub lb_type: Option<String>,
    pub policy: Option<String>,
    pub q_value: Option<f32>,
    pub weight: Option<u32>,
    #[serde(default)]
    pub elements: Vec<RawElement>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawElement {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<String>,
    pub rank: Option<u32>,
    pub weight: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RawPolicy {
    pub name: String,
    #[serde(default)]
    pub codes: Vec<u16>,
}

/// Validated routing configuration.
///
/// Invalid groups and policies never make it in here: they are logged and
/// skipped while the rest of the configuration loads.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server_groups: Vec<CandidateGroup>,
    pub dynamic_groups: Vec<DynamicGroup>,
    pub failover_policies: Vec<FailoverPolicy>,
}

impl Settings {
    pub fn new() -> Result<Self, SettingsError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let builder = Config::builder()
            .add_source(File::with_name(&run_mode).required(false))
            .add_source(File::with_name("config").required(run_mode == "production"))
            .add_source(Environment::with_prefix("DHRUVA").separator("__"))
            .build()?;

        Ok(Self::from_raw(builder.try_deserialize()?))
    }

    /// Settings from one file (format taken from its extension) with the
    /// `DHRUVA__*` environment layered on top.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("DHRUVA").separator("__"))
            .build()?;

        Ok(Self::from_raw(builder.try_deserialize()?))
    }

    pub fn from_toml(document: &str) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?;

        Ok(Self::from_raw(builder.try_deserialize()?))
    }

    pub fn from_raw(raw: RawSettings) -> Self {
        let mut settings = Settings::default();
        let mut names = HashSet::new();

        for raw_group in raw.server_groups {
            let name = raw_group.name.clone();
            if !names.insert(name.clone()) {
                let e = ValidationError::DuplicateGroup(name);
                warn!(error = %e, "skipping server group");
                continue;
            }

            match raw_group.into_group() {
                Ok(LoadedGroup::Static(group)) => settings.server_groups.push(group),
                Ok(LoadedGroup::Dynamic(group)) => settings.dynamic_groups.push(group),
                Err(e) => {
                    names.remove(&name);
                    warn!(group = %name, error = %e, "skipping server group");
                }
            }
        }

        for raw_policy in raw.failover_policies {
            match FailoverPolicy::new(raw_policy.name.clone(), raw_policy.codes) {
                Ok(policy) => settings.failover_policies.push(policy),
                Err(e) => warn!(policy = %raw_policy.name, error = %e, "skipping failover policy"),
            }
        }

        debug!(
            static_groups = settings.server_groups.len(),
            dynamic_groups = settings.dynamic_groups.len(),
            policies = settings.failover_policies.len(),
            "configuration loaded"
        );

        settings
    }

    /// Reloads settings from `path` whenever it changes.
    ///
    /// The watcher stops when dropped, so the caller has to hold on to it
    /// for as long as updates are wanted.
    pub fn watch_config(
        path: impl AsRef<Path>,
    ) -> Result<(RecommendedWatcher, Receiver<Settings>), SettingsError> {
        let (tx, rx) = channel();
        let path = path.as_ref();
        let source = path.to_path_buf();

        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                match Settings::from_path(&source) {
                    Ok(new_settings) => {
                        info!("configuration file changed, reloading");
                        if tx.send(new_settings).is_err() {
                            debug!("configuration receiver dropped");
                        }
                    }
                    Err(e) => error!(error = %e, "error reloading configuration"),
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "configuration watch error"),
        })?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;

        Ok((watcher, rx))
    }
}

enum LoadedGroup {
    Static(CandidateGroup),
    Dynamic(DynamicGroup),
}

impl RawServerGroup {
    fn into_group(self) -> Result<LoadedGroup, ValidationError> {
        let mut builder = CandidateGroup::builder(self.name.as_str()).network(self.network);
        if let Some(lb_type) = self.lb_type {
            builder = builder.lb_type(lb_type.parse::<LbType>()?);
        }
        if let Some(policy) = self.policy {
            builder = builder.policy(policy);
        }
        if let Some(q_value) = self.q_value {
            builder = builder.q_value(q_value);
        }
        if let Some(weight) = self.weight {
            builder = builder.weight(weight);
        }

        match self.kind.as_deref().unwrap_or("static") {
            "static" => {
                if self.elements.is_empty() {
                    return Err(ValidationError::EmptyGroup(self.name));
                }
                let candidates = self
                    .elements
                    .into_iter()
                    .map(RawElement::into_candidate)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LoadedGroup::Static(builder.candidates(candidates).build()?))
            }
            "dynamic" => {
                let transport = parse_transport(self.transport.as_deref())?;
                let template = builder.build()?;
                let host = self.host.unwrap_or_default();
                Ok(LoadedGroup::Dynamic(DynamicGroup::new(
                    template, host, self.port, transport,
                )?))
            }
            other => Err(ValidationError::UnknownGroupKind(other.to_string())),
        }
    }
}

impl RawElement {
    fn into_candidate(self) -> Result<Candidate, ValidationError> {
        let address = self.address.ok_or(ValidationError::MissingAddress)?;
        let port = self
            .port
            .ok_or_else(|| ValidationError::MissingPort(address.clone()))?;
        let transport = parse_transport(self.transport.as_deref())?;

        Ok(Candidate::new(address, port, transport)?
            .with_rank(self.rank.unwrap_or(DEFAULT_RANK))
            .with_weight(self.weight.unwrap_or(DEFAULT_WEIGHT)))
    }
}

fn parse_transport(transport: Option<&str>) -> Result<Transport, ValidationError> {
    transport.map_or(Ok(Transport::Udp), str::parse)
}
