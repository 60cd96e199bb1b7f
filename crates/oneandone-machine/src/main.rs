mod cli;
mod store;

use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;
use oneandone_driver::{CloudApi, Driver, KeyGenerator, ServerHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::store::{MachineRecord, MachineStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = MachineStore::new(
        cli.storage_path
            .clone()
            .unwrap_or_else(MachineStore::default_root),
    );
    tracing::debug!(root = %store.root().display(), "using machine store");

    match cli.command {
        Command::Create { name, options } => {
            let dir = store.prepare(&name)?;
            let config = options.into_config(&name, &cli.api_key, store.key_path(&name));
            let handle = create(&store, &dir, Driver::new(config)).await?;
            println!("{}", handle.ip().unwrap_or_default());
        }
        Command::State { name } => {
            let driver = attach(&store, &name, &cli.api_key)?;
            let query = driver.state().await;
            println!("{}", query.state);
            if let Some(err) = query.error {
                return Err(err.into());
            }
        }
        Command::Start { name } => attach(&store, &name, &cli.api_key)?.start().await?,
        Command::Stop { name } => attach(&store, &name, &cli.api_key)?.stop().await?,
        Command::Restart { name } => attach(&store, &name, &cli.api_key)?.restart().await?,
        Command::Kill { name } => attach(&store, &name, &cli.api_key)?.kill().await?,
        Command::Rm { name } => {
            attach(&store, &name, &cli.api_key)?.remove().await?;
            store.remove(&name)?;
            info!(machine = %name, "removed");
        }
        Command::Ip { name } => {
            let record = store.load(&name)?;
            let Some(ip) = record.ip_address else {
                bail!("machine '{name}' has no IP address");
            };
            println!("{ip}");
        }
        Command::Url { name } => {
            let url = attach(&store, &name, &cli.api_key)?.url().await?;
            println!("{url}");
        }
        Command::Inspect { name } => {
            let record = store.load(&name)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

/// Validate and create a machine, then record it in `store`.
///
/// When creation fails before the provider accepted a server, the machine
/// directory reserved in `dir` is discarded again.
async fn create<A: CloudApi, K: KeyGenerator>(
    store: &MachineStore,
    dir: &Path,
    mut driver: Driver<A, K>,
) -> anyhow::Result<ServerHandle> {
    let name = driver.config().machine_name.clone();
    let result = provision(store, &mut driver).await;

    if result.is_err() && !store.exists(&name) {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!(
                machine = %name,
                path = %dir.display(),
                error = %e,
                "failed to clean up machine directory"
            );
        }
    }

    result
}

async fn provision<A: CloudApi, K: KeyGenerator>(
    store: &MachineStore,
    driver: &mut Driver<A, K>,
) -> anyhow::Result<ServerHandle> {
    let name = driver.config().machine_name.clone();

    driver.validate().await?;

    let result = driver.create().await;

    // Keep a record of anything that made it to the provider so `rm` can
    // clean it up.
    if let Some(server_id) = driver.server_id() {
        let record = MachineRecord {
            name: name.clone(),
            driver: driver.driver_name().to_string(),
            server_id: server_id.to_string(),
            ip_address: driver.ip().ok().map(str::to_string),
            firewall_policy_id: driver.identity().firewall_policy_id.clone(),
            host: driver.config().clone(),
        };
        store
            .save(&record)
            .with_context(|| format!("saving record for machine '{name}'"))?;
    }

    let handle = result.with_context(|| format!("creating machine '{name}'"))?;

    if driver.config().ssh_password().is_none() && driver.password().is_some() {
        warn!(machine = %name, "root password was generated by 1&1, see the cloud panel");
    }

    info!(
        machine = %name,
        server_id = %handle.id,
        ip = handle.ip().unwrap_or_default(),
        "machine created"
    );
    Ok(handle)
}

/// A driver bound to a machine from the store.
fn attach(store: &MachineStore, name: &str, api_key: &str) -> anyhow::Result<Driver> {
    let record = store.load(name)?;
    if api_key.is_empty() {
        bail!("--oneandone-api-key (or ONEANDONE_API_KEY) is required");
    }

    let mut config = record.host;
    config.api_key = api_key.to_string();
    Ok(Driver::new(config).restore(record.server_id, record.ip_address))
}
