//! tenantdb command-line tool
//!
//! Loads a tenants file, resolves the connection key of each tenant and
//! opens their connections through the lifecycle manager.
//!
//! ```bash
//! tenantdb --config tenants.toml keys
//! tenantdb --config tenants.toml connect --tenant tenant_a
//! ```

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tenantdb_connection::{ConnectionLifecycleManager, LifecycleHost, TenantConnectionModule};
use tenantdb_core::{
    Connection, ConnectionConfig, ConnectionKeyResolver, DriverRegistry, InMemoryModelRegistry,
    TenantsFile,
};
use tenantdb_driver_sqlite::SqliteDriver;

#[derive(Parser)]
#[command(name = "tenantdb")]
#[command(about = "Manage per-tenant database connections", long_about = None)]
#[command(version)]
struct Cli {
    /// Tenants file (.toml or .json)
    #[arg(short, long, env = "TENANTDB_CONFIG", value_name = "PATH")]
    config: PathBuf,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write JSON logs under the local data directory
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the connection key and token of every tenant
    Keys {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open, initialize and close tenant connections
    Connect {
        /// Only connect tenants with this key (can be repeated)
        #[arg(short, long, value_name = "KEY")]
        tenant: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(
        logging::LoggingConfig::for_verbosity(cli.verbose).with_json_logs(cli.log_json),
    )?;

    let tenants = TenantsFile::load(&cli.config)
        .await
        .with_context(|| format!("failed to load tenants file {}", cli.config.display()))?;
    tracing::debug!(
        tenants = tenants.tenants.len(),
        models = tenants.models.len(),
        "tenants file loaded"
    );

    match cli.command {
        Commands::Keys { json } => print_keys(&tenants, json),
        Commands::Connect { tenant } => connect(tenants, &tenant).await,
    }
}

fn print_keys(tenants: &TenantsFile, json: bool) -> anyhow::Result<()> {
    if json {
        let entries: Vec<serde_json::Value> = tenants
            .tenants
            .iter()
            .map(|config| {
                serde_json::json!({
                    "key": ConnectionKeyResolver::resolve(config).as_str(),
                    "token": ConnectionKeyResolver::connection_token(config),
                    "connection": ConnectionKeyResolver::connection_name(config),
                    "dialect": config.dialect,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for config in &tenants.tenants {
        println!(
            "{}\t{}\t{}\t{}",
            ConnectionKeyResolver::resolve(config),
            ConnectionKeyResolver::connection_token(config),
            ConnectionKeyResolver::connection_name(config),
            config.dialect
        );
    }
    Ok(())
}

fn selected<'a>(tenants: &'a TenantsFile, filter: &[String]) -> Vec<&'a ConnectionConfig> {
    tenants
        .tenants
        .iter()
        .filter(|config| {
            filter.is_empty()
                || filter
                    .iter()
                    .any(|key| ConnectionKeyResolver::resolve(config).as_str() == key)
        })
        .collect()
}

async fn connect(tenants: TenantsFile, filter: &[String]) -> anyhow::Result<()> {
    let configs = selected(&tenants, filter);
    if configs.is_empty() {
        bail!("no tenant matches {:?}", filter);
    }

    let drivers = Arc::new(DriverRegistry::new().with_driver(Arc::new(SqliteDriver::new())));
    let models = Arc::new(InMemoryModelRegistry::new());
    tenants.register_models(&models);
    let manager = Arc::new(ConnectionLifecycleManager::new(drivers, models));

    let mut modules = Vec::with_capacity(configs.len());
    for config in configs {
        let key = ConnectionKeyResolver::resolve(config);
        let module = TenantConnectionModule::for_root(manager.clone(), config.clone())
            .await
            .with_context(|| format!("failed to connect tenant '{}'", key))?;
        let connection = module.connection();
        println!(
            "{}\t{}\t{}\t{} model(s)",
            module.key(),
            module.token(),
            connection.driver_name(),
            connection.models().len()
        );
        modules.push(module);
    }

    for module in &modules {
        module.on_shutdown().await;
    }
    manager.close_all().await;
    Ok(())
}
