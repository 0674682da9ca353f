use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::Result;
use tracing::{info, warn};

use dhruva::configuration::Settings;
use dhruva::proxy::{DnsLocator, GroupResolver, Registry};
use dhruva::utils::tracing::init_tracing;

const CONFIG_FILE: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let settings = Settings::new()?;
    let registry = Arc::new(Registry::new(&settings));
    let resolver = GroupResolver::new(Arc::new(DnsLocator::default()));

    for group in &settings.server_groups {
        info!(
            group = %group.name(),
            lb_type = %group.lb_type(),
            elements = group.candidates().len(),
            policy = %registry.policy_name(group.name()),
            "static server group"
        );
    }

    for group in &settings.dynamic_groups {
        match resolver.resolve_dynamic(group, None) {
            Ok(resolution) => match resolution.await {
                Ok(resolved) => info!(
                    group = %group.name(),
                    host = %group.host,
                    elements = resolved.candidates().len(),
                    "dynamic server group resolves"
                ),
                Err(e) => warn!(group = %group.name(), host = %group.host, error = %e, "dynamic server group does not resolve"),
            },
            Err(e) => warn!(group = %group.name(), error = %e, "dynamic server group cannot be resolved"),
        }
    }

    let _watcher = if Path::new(CONFIG_FILE).exists() {
        let (watcher, updates) = Settings::watch_config(CONFIG_FILE)?;
        let registry = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || {
            for new_settings in updates {
                registry.reload(&new_settings);
            }
        });
        Some(watcher)
    } else {
        warn!("{} not found, configuration will not be reloaded", CONFIG_FILE);
        None
    };

    info!(groups = ?registry.group_names(), "dhruva routing engine ready");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}
