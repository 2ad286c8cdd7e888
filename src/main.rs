#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use echorelay::config::Config;
use echorelay::delivery::HttpDeliveryClient;
use echorelay::dispatcher::Dispatcher;
use echorelay::registry::{create_store, ConnectionStore};
use echorelay::ConnectionCommands;

/// `echorelay` - routes durable-log change events to live agent connections.
#[derive(Parser, Debug)]
#[command(name = "echorelay")]
#[command(version)]
#[command(about = "Real-time message relay for agent connections.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the invocation gateway
    #[command(long_about = "\
Start the invocation gateway.

Binds an HTTP listener and processes invocation events: connection \
lifecycle events from the duplex-channel transport and change-log \
batches from the durable log.

Examples:
  echorelay serve
  echorelay serve --host 0.0.0.0 --port 9000")]
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect and manage the connection registry
    Connections {
        #[command(subcommand)]
        command: ConnectionCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            let store: Arc<dyn ConnectionStore> =
                Arc::from(create_store(&config.registry, &config.workspace_dir)?);
            let delivery = Arc::new(HttpDeliveryClient::new(&config.delivery));
            let dispatcher = Arc::new(Dispatcher::new(store, delivery));

            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            echorelay::gateway::serve(dispatcher, &host, port).await
        }
        Commands::Connections { command } => handle_connections_command(command, &config).await,
    }
}

/// Handle `echorelay connections <subcommand>` CLI commands.
async fn handle_connections_command(command: ConnectionCommands, config: &Config) -> Result<()> {
    let store = create_store(&config.registry, &config.workspace_dir)?;
    match command {
        ConnectionCommands::List { agent } => {
            let records = match agent.as_deref() {
                Some(agent_id) => store.get_by_agent(agent_id).await?,
                None => store.list().await?,
            };
            if records.is_empty() {
                println!("No live connections.");
                return Ok(());
            }
            println!("Live connections ({}):\n", records.len());
            for record in &records {
                println!("- {} [{}]", record.connection_id, record.agent_id);
                println!("    {}", record.endpoint_url);
            }
        }
        ConnectionCommands::Clear { connection_id, yes } => {
            if let Some(connection_id) = connection_id {
                if !yes {
                    eprintln!("Use --yes to confirm deletion of connection '{connection_id}'.");
                    return Ok(());
                }
                store.delete(&connection_id).await?;
                println!("✓ Deleted connection: {connection_id}");
            } else {
                let records = store.list().await?;
                if records.is_empty() {
                    println!("No connections to clear.");
                    return Ok(());
                }
                if !yes {
                    eprintln!(
                        "Use --yes to confirm deletion of {} connections.",
                        records.len()
                    );
                    return Ok(());
                }
                for record in &records {
                    store.delete(&record.connection_id).await?;
                }
                println!("✓ Cleared {} connections.", records.len());
            }
        }
    }
    Ok(())
}
