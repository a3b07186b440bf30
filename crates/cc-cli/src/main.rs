//! `conformance` binary

use anyhow::Context;
use cc_cli::{run, Cli};
use cc_core::{ConformanceServices, TracingNotifier};
use cc_gateway::{AzureDevOpsClient, ConnectionConfig, StaticHost};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = ConnectionConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_overrides();
    tracing::debug!(organization = %config.organization, project = %config.project, "connecting");

    let client = Arc::new(AzureDevOpsClient::new(config)?);
    let project = client
        .get_project()
        .await
        .context("looking up the configured project")?;
    let host = Arc::new(StaticHost::new(Some(project), client.config().work_item_base()));

    let services = ConformanceServices::new(
        client.clone(),
        client,
        host.clone(),
        Arc::new(TracingNotifier),
    );

    let mut stdout = std::io::stdout().lock();
    run(cli.command, &services, &host, &mut stdout).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
