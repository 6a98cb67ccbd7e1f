//! kube-icinga maintenance entry point.
//!
//! Loads `.env` and the YAML config, checks that the configured check command
//! exists, then removes every managed object when `cleanup` is enabled.

use anyhow::{Context, Result};
use kube_icinga::logging::init_tracing;
use kube_icinga::{load_config, HttpIcingaClient, Icinga};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let config = load_config().await.context("Failed to load configuration")?;
    init_tracing(&config.log_level);
    info!("kube-icinga starting, monitoring API at {}", config.icinga.url);

    let client = HttpIcingaClient::new(&config.icinga).context("Failed to create Icinga client")?;
    let icinga = Icinga::new(Arc::new(client));

    if let Some(command) = &config.check_command {
        let found = icinga
            .has_check_command(command)
            .await
            .context("Failed to query check commands")?;
        if found {
            info!("check command {command} is available");
        } else {
            warn!("check command {command} is not defined on monitoring, checks relying on it will fail");
        }
    }

    if config.cleanup {
        let report = icinga.cleanup().await.context("Cleanup failed")?;
        info!(
            "cleanup removed {} of {} managed objects",
            report.total_deleted(),
            report.total_listed()
        );
    } else {
        info!("cleanup disabled, nothing to do");
    }

    Ok(())
}
