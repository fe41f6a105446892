mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use config::{default_config_path, ClusterConfig};

#[derive(Parser, Debug)]
#[command(name = "kthw")]
#[command(about = "Bootstrap a Kubernetes cluster on plain servers", long_about = None)]
struct Args {
    /// Cluster configuration file
    #[arg(long, env = "KTHW_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log the output of every remote command
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Certificate authority and client certificates
    Pki {
        #[command(subcommand)]
        command: PkiCommand,
    },
    /// WireGuard mesh configuration
    Mesh {
        #[command(subcommand)]
        command: MeshCommand,
    },
    /// Wait until every server finished cloud-init
    WaitForBoot,
    /// Install cluster components over ssh
    Install {
        #[command(subcommand)]
        target: InstallTarget,
    },
}

#[derive(Subcommand, Debug)]
enum PkiCommand {
    /// Generate and persist the cluster CA
    InitCa,
    /// Issue a client certificate signed by the CA
    Issue {
        #[arg(value_enum)]
        role: ClientRole,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ClientRole {
    Admin,
    EtcdClient,
}

#[derive(Subcommand, Debug)]
enum MeshCommand {
    /// Write one wg0 config per server without touching any host
    Render {
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum InstallTarget {
    Network,
    Etcd,
    Controller,
    /// Join one worker to the cluster
    Worker {
        name: String,
    },
    /// Boot wait, network, etcd, controller and workers
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut cfg = ClusterConfig::load(&args.config)?;

    match args.command {
        Command::Pki { command } => match command {
            PkiCommand::InitCa => commands::init_ca(&cfg),
            PkiCommand::Issue { role } => commands::issue(&cfg, role),
        },
        Command::Mesh {
            command: MeshCommand::Render { out_dir },
        } => commands::render_mesh(&cfg, &out_dir),
        Command::WaitForBoot => commands::wait_for_boot(&cfg).await,
        Command::Install { target } => {
            commands::install(&mut cfg, &args.config, target, args.verbose).await
        }
    }
}
