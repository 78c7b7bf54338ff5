use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tunnel")]
#[command(about = "Open temporary tunnels to private backends through Kubernetes relay pods")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to $TUNNEL_CONFIG or ~/.tunnel/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logs (kubectl invocations, state transitions)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress and status messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a tunnel and hold it until Ctrl+C
    Start {
        /// Service to reach (db, redis, kafka, opensearch or an alias)
        service: String,

        /// Environment name from the config (e.g. dev, staging)
        environment: String,

        /// Database: connect to the read replica
        #[arg(long)]
        reader: bool,

        /// Kafka: zero-based broker index
        #[arg(long, value_name = "N")]
        broker: Option<usize>,

        /// How long to wait for the relay pod (e.g. 90s, 2m)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },
    /// Stop a tunnel, or every tunnel with --all
    Stop {
        /// Service of the tunnel to stop
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        service: Option<String>,

        /// Environment of the tunnel to stop
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        environment: Option<String>,

        /// Stop every tracked tunnel
        #[arg(long)]
        all: bool,
    },
    /// List tracked tunnels with live pod status
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget tunnels whose relay pod no longer exists
    Cleanup,
    /// List supported services and their aliases
    Services,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
