//! Subcommand implementations.

pub mod config;
pub mod pod;
pub mod service;

use std::future::Future;

use anyhow::Result;
use kbridge_core::kubernetes::KubectlError;
use kbridge_core::{
    Config, ControllerOutcome, Error, ForwardOptions, KubectlPortForwarder, KubernetesDiscovery,
    ResilienceController,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ui::{Printer, TerminalPrompter};

/// Controller wired to kubectl and the terminal.
pub type CliController =
    ResilienceController<KubernetesDiscovery, KubectlPortForwarder, TerminalPrompter, Printer>;

pub fn build_controller(config: &Config, printer: Printer) -> Result<CliController> {
    let discovery = KubernetesDiscovery::from_config(config);
    if !discovery.is_kubectl_available() {
        return Err(KubectlError::KubectlNotFound.into());
    }
    debug!(kubectl = ?discovery.kubectl_path(), "using kubectl");

    Ok(ResilienceController::new(
        discovery.clone(),
        KubectlPortForwarder::new(discovery),
        TerminalPrompter::new(printer),
        printer,
    ))
}

/// Returns a token cancelled on the first Ctrl+C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            trigger.cancel();
        }
    });
    token
}

/// Runs `fut`, resolving to `Error::Cancelled` if `shutdown` fires first.
pub async fn until_cancelled<T>(
    shutdown: &CancellationToken,
    fut: impl Future<Output = kbridge_core::Result<T>>,
) -> kbridge_core::Result<T> {
    tokio::select! {
        biased;

        _ = shutdown.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Checks the selector once, then keeps the tunnel up until Ctrl+C.
pub async fn forward(
    controller: &CliController,
    options: &ForwardOptions,
    shutdown: &CancellationToken,
) -> Result<()> {
    until_cancelled(shutdown, controller.preflight(options)).await?;

    match controller.run(options, shutdown).await? {
        ControllerOutcome::Succeeded => Ok(()),
        ControllerOutcome::Cancelled => Err(Error::Cancelled.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_until_cancelled() {
        let shutdown = CancellationToken::new();
        assert_eq!(until_cancelled(&shutdown, async { Ok(7) }).await.unwrap(), 7);

        shutdown.cancel();
        let err = until_cancelled(&shutdown, std::future::pending::<kbridge_core::Result<()>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_build_controller_uses_configured_kubectl() {
        let config = Config {
            kubectl_path: Some("/opt/kube/bin/kubectl".into()),
            ..Config::default()
        };

        let controller = build_controller(&config, Printer::plain()).unwrap();
        assert_eq!(
            controller.lister().kubectl_path().map(|p| p.to_string_lossy().into_owned()),
            Some("/opt/kube/bin/kubectl".to_string())
        );
        assert_eq!(controller.policy().max_retries, 5);
    }
}
