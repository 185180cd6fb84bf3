//! cloudconf command line
//!
//! `cloudconf fetch` asks a running config server for an application's
//! environment; `cloudconf resolve` resolves one locally from a server
//! configuration file using directory-tree backends.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cloudconf_core::config::{
    build_resolver, default_client_config_path, default_server_config_path, load_client_config,
    load_server_config, BackendClients,
};
use cloudconf_core::observation::{SharedObservationHandler, TracingObservationHandler};
use cloudconf_core::{ApplicationRequest, ConfigClient, Environment, SharedLogger, TracingLogger};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cloudconf", version, about = "Fetch and resolve centralized configuration")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the full environment as JSON instead of flattened properties
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an environment from a config server
    Fetch(FetchArgs),
    /// Resolve an environment locally from a server configuration file
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Client configuration file
    #[arg(long, env = "CLOUDCONF_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Application name
    #[arg(long)]
    name: Option<String>,

    /// Comma-separated active profiles
    #[arg(long)]
    profile: Option<String>,

    /// Label, or comma-separated labels tried in order
    #[arg(long)]
    label: Option<String>,

    /// Config server URI; repeat for failover
    #[arg(long = "uri")]
    uris: Vec<String>,

    /// Fail instead of continuing without remote configuration
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Args)]
struct ResolveArgs {
    /// Server configuration file
    #[arg(long, env = "CLOUDCONF_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Application name(s), comma-separated
    application: String,

    /// Comma-separated profiles
    #[arg(default_value = "default")]
    profiles: String,

    /// Label
    label: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let environment = match cli.command {
        Command::Fetch(args) => fetch(args).await?,
        Command::Resolve(args) => Some(resolve(args).await?),
    };

    match environment {
        Some(environment) => print_environment(&environment, cli.json)?,
        None => info!("no remote configuration located"),
    }
    Ok(())
}

async fn fetch(args: FetchArgs) -> Result<Option<Environment>> {
    let path = args.config.unwrap_or_else(default_client_config_path);
    debug!("loading client configuration from {}", path.display());
    let mut properties = load_client_config(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if let Some(name) = args.name {
        properties = properties.with_name(name);
    }
    if let Some(profile) = args.profile {
        properties = properties.with_profile(profile);
    }
    if let Some(label) = args.label {
        properties = properties.with_label(label);
    }
    if !args.uris.is_empty() {
        properties = properties.with_uris(args.uris);
    }
    if args.fail_fast {
        properties = properties.with_fail_fast(true);
    }

    let logger: SharedLogger = Arc::new(TracingLogger::new("cloudconf-client"));
    let client = ConfigClient::from_properties(properties)?.with_logger(logger);
    Ok(client.load().await?)
}

async fn resolve(args: ResolveArgs) -> Result<Environment> {
    let path = args.config.unwrap_or_else(default_server_config_path);
    debug!("loading server configuration from {}", path.display());
    let config =
        load_server_config(&path).with_context(|| format!("failed to load {}", path.display()))?;

    let logger: SharedLogger = Arc::new(TracingLogger::new("cloudconf-server"));
    let handlers: Vec<SharedObservationHandler> = vec![Arc::new(TracingObservationHandler)];
    let resolver = build_resolver(&config, &BackendClients::new(), logger, handlers)?;

    let request = ApplicationRequest::parse(&args.application, &args.profiles, args.label.as_deref());
    Ok(resolver.resolve_all(&request).await?)
}

fn print_environment(environment: &Environment, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(environment)?);
        return Ok(());
    }
    for (key, value) in environment.flatten() {
        println!("{}={}", key, value);
    }
    Ok(())
}
