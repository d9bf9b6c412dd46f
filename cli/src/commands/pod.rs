//! Pod command - forward to a pod chosen by labels or name.

use anyhow::Result;
use clap::Args;
use kbridge_core::{allocate_local_port, Config, ForwardOptions, Label, SelectorSpec};

use super::{build_controller, forward, shutdown_on_ctrl_c};
use crate::ui::Printer;

#[derive(Args, Debug)]
pub struct PodArgs {
    /// Labels to filter pods (can be specified multiple times)
    #[arg(
        short = 'l',
        long = "label",
        value_name = "KEY=VALUE",
        required_unless_present = "name",
        conflicts_with = "name"
    )]
    pub labels: Vec<Label>,

    /// Exact pod name instead of labels
    #[arg(long)]
    pub name: Option<String>,

    /// The namespace where the pod is located
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Local port to forward from (random if not specified)
    #[arg(short = 'L', long)]
    pub local_port: Option<u16>,

    /// Remote port to forward to
    #[arg(short = 'p', long = "port", default_value_t = 80)]
    pub port: u16,
}

impl PodArgs {
    /// Builds the invocation's options. The local port is fixed here for every retry.
    pub fn into_options(self, config: &Config) -> Result<ForwardOptions> {
        let namespace = self
            .namespace
            .unwrap_or_else(|| config.default_namespace.clone());

        let selector = match self.name {
            Some(name) => SelectorSpec::name(namespace, name),
            None => SelectorSpec::labels(namespace, self.labels),
        };

        let local_port = match self.local_port {
            Some(port) => port,
            None => allocate_local_port()?,
        };

        Ok(ForwardOptions::new(selector, local_port, self.port))
    }
}

pub async fn run(config: &Config, args: PodArgs, printer: Printer) -> Result<()> {
    let controller = build_controller(config, printer)?;
    let options = args.into_options(config)?;
    let shutdown = shutdown_on_ctrl_c();

    forward(&controller, &options, &shutdown).await
}
