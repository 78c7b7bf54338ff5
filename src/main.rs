mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use output::{CliOutput, QuietOutput, UserOutput};
use std::sync::Arc;
use tunnel_manager::backend::EndpointOptions;
use tunnel_manager::{Error as TunnelError, Parser as ConfigParser, TunnelManager};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(tunnel_error) = e.downcast_ref::<TunnelError>() {
            eprintln!("Error: {}", tunnel_error);
            if let Some(suggestion) = tunnel_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out: Arc<dyn UserOutput> = if cli.quiet {
        Arc::new(QuietOutput)
    } else {
        Arc::new(CliOutput)
    };

    match cli.command {
        Commands::Services => commands::run_services(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }
        Commands::Start {
            service,
            environment,
            reader,
            broker,
            timeout,
        } => {
            let manager = load_manager(cli.config.as_deref())?;
            let endpoint = EndpointOptions { reader, broker };
            commands::run_start(&manager, &service, &environment, endpoint, timeout, out).await?;
        }
        Commands::Stop {
            service,
            environment,
            all,
        } => {
            let manager = load_manager(cli.config.as_deref())?;
            if all {
                commands::run_stop_all(&manager, out.as_ref()).await?;
            } else {
                // clap enforces both positionals unless --all
                let (Some(service), Some(environment)) = (service, environment) else {
                    anyhow::bail!("stop needs <SERVICE> <ENVIRONMENT> or --all");
                };
                commands::run_stop(&manager, &service, &environment, out.as_ref()).await?;
            }
        }
        Commands::List { json } => {
            let manager = load_manager(cli.config.as_deref())?;
            commands::run_list(&manager, json).await?;
        }
        Commands::Cleanup => {
            let manager = load_manager(cli.config.as_deref())?;
            commands::run_cleanup(&manager, out.as_ref()).await?;
        }
    }

    Ok(())
}

/// Config is only read by commands that talk to the cluster.
fn load_manager(config: Option<&std::path::Path>) -> anyhow::Result<TunnelManager> {
    let config = ConfigParser::new().load(config)?;
    let manager = TunnelManager::from_config(config)?;
    tracing::debug!("using registry {}", manager.registry().location());
    Ok(manager)
}

/// `--verbose` wins over `RUST_LOG`; otherwise `RUST_LOG`, then `warn`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
