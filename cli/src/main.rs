//! KBridge CLI - Resilient port forwarding to Kubernetes pods
//!
//! Picks a running pod by label, name, or service, forwards a local port
//! to it, and reconnects when the tunnel drops.

mod commands;
mod logging;
mod ui;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use kbridge_core::kubernetes::KubectlError;
use kbridge_core::{Config, ConfigStore};

use commands::config::ConfigAction;
use commands::pod::PodArgs;
use commands::service::ServiceArgs;
use ui::Printer;

#[derive(Parser)]
#[command(name = "kbridge")]
#[command(author, version, about = "Resilient port forwarding to Kubernetes pods")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the kubeconfig file to use
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Port forward to a pod selected by labels or name
    ///
    /// If multiple running pods match, you will be prompted to select one.
    Pod(PodArgs),

    /// Port forward to a service
    ///
    /// Forwards to the first running pod behind the service. If no name is
    /// provided, lists all services in the namespace.
    #[command(alias = "svc")]
    Service(ServiceArgs),

    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Cli {
    /// Flags override the stored configuration for this run only.
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let printer = Printer::new();
    let code = match run(cli, printer).await {
        Ok(()) => 0,
        Err(err) if is_cancelled(&err) => 0,
        Err(err) => {
            printer.error(&err);
            if let Some(hint) = hint_for(&err) {
                eprintln!("{}", printer.gray(hint));
            }
            1
        }
    };

    // A prompt may still be blocked on stdin; exiting here does not wait for it.
    process::exit(code);
}

async fn run(cli: Cli, printer: Printer) -> anyhow::Result<()> {
    let store = ConfigStore::new()?;
    let stored = store.load().await?;
    let config = cli.apply_overrides(stored);

    match cli.command {
        Commands::Pod(args) => commands::pod::run(&config, args, printer).await,
        Commands::Service(args) => commands::service::run(&config, args, printer).await,
        Commands::Config { action } => {
            commands::config::run(&store, action.unwrap_or(ConfigAction::Show), printer).await
        }
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<kbridge_core::Error>()
        .is_some_and(kbridge_core::Error::is_cancelled)
}

/// Next step for failures the operator can fix locally.
fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    let kubectl = match err.downcast_ref::<kbridge_core::Error>() {
        Some(kbridge_core::Error::Resolution(e)) => e,
        Some(_) => return None,
        None => err.downcast_ref::<KubectlError>()?,
    };

    match kubectl {
        KubectlError::KubectlNotFound => {
            Some("Install kubectl or run `kbridge config set kubectl-path <path>`.")
        }
        e if e.is_cluster_not_connected() => {
            Some("Check that the cluster is reachable and --context/--kubeconfig point at it.")
        }
        _ => None,
    }
}
