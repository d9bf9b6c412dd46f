//! Kubernetes discovery using kubectl commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::errors::{KubectlError, Result};
use super::models::{KubernetesService, PodItem, PodListResponse, ServiceItem, ServiceListResponse};
use crate::config::Config;
use crate::domain::Target;
use crate::ports::TargetLister;

/// Default paths to search for kubectl before falling back to `PATH`.
const KUBECTL_PATHS: &[&str] = &[
    "/opt/homebrew/bin/kubectl", // Apple Silicon
    "/usr/local/bin/kubectl",    // Intel Mac / Homebrew
    "/usr/bin/kubectl",          // System
];

/// Timeout for kubectl discovery commands.
const KUBECTL_TIMEOUT: Duration = Duration::from_secs(15);

/// Server-side timeout passed to kubectl itself.
const REQUEST_TIMEOUT_ARG: &str = "--request-timeout=10s";

/// Kubernetes discovery service. Every call hits the control plane; nothing is cached.
#[derive(Debug, Clone, Default)]
pub struct KubernetesDiscovery {
    kubectl_path: Option<PathBuf>,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl KubernetesDiscovery {
    /// Creates a new KubernetesDiscovery, searching for kubectl.
    pub fn new() -> Self {
        Self {
            kubectl_path: find_kubectl(),
            kubeconfig: None,
            context: None,
        }
    }

    /// Creates a discovery service from user configuration.
    ///
    /// A configured kubectl path wins over the search.
    pub fn from_config(config: &Config) -> Self {
        Self {
            kubectl_path: config.kubectl_path.clone().or_else(find_kubectl),
            kubeconfig: config.kubeconfig.clone(),
            context: config.context.clone(),
        }
    }

    /// Creates a new KubernetesDiscovery with a custom kubectl path.
    pub fn with_path(kubectl_path: Option<PathBuf>) -> Self {
        Self {
            kubectl_path,
            kubeconfig: None,
            context: None,
        }
    }

    /// Returns the kubectl path if found.
    pub fn kubectl_path(&self) -> Option<&PathBuf> {
        self.kubectl_path.as_ref()
    }

    /// Returns true if kubectl is available.
    pub fn is_kubectl_available(&self) -> bool {
        self.kubectl_path.is_some()
    }

    /// Builds a kubectl command carrying the configured kubeconfig and context.
    pub fn kubectl_command(&self) -> Result<Command> {
        let kubectl_path = self
            .kubectl_path
            .as_ref()
            .ok_or(KubectlError::KubectlNotFound)?;

        let mut command = Command::new(kubectl_path);
        command.args(self.global_args());
        Ok(command)
    }

    /// Global flags shared by every kubectl invocation.
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        if let Some(context) = &self.context {
            args.push(format!("--context={}", context));
        }
        args
    }

    /// Fetches pods matching a label selector.
    pub async fn fetch_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Target>> {
        let mut args = vec!["get", "pods", "-n", namespace, "-o", "json", REQUEST_TIMEOUT_ARG];
        if !label_selector.is_empty() {
            args.extend(["-l", label_selector]);
        }

        let output = self.execute_kubectl(&args).await?;
        let response: PodListResponse = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        Ok(response.into_targets(namespace))
    }

    /// Fetches a single pod by name.
    pub async fn fetch_pod(&self, namespace: &str, name: &str) -> Result<Target> {
        let output = self
            .execute_kubectl(&["get", "pod", name, "-n", namespace, "-o", "json", REQUEST_TIMEOUT_ARG])
            .await?;

        let item: PodItem = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        Ok(item.into_target(namespace))
    }

    /// Fetches a single service by name.
    pub async fn fetch_service(&self, namespace: &str, name: &str) -> Result<KubernetesService> {
        let output = self
            .execute_kubectl(&[
                "get",
                "service",
                name,
                "-n",
                namespace,
                "-o",
                "json",
                REQUEST_TIMEOUT_ARG,
            ])
            .await?;

        let item: ServiceItem = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        Ok(item.into_service(namespace))
    }

    /// Fetches services in a specific namespace.
    pub async fn fetch_services(&self, namespace: &str) -> Result<Vec<KubernetesService>> {
        let output = self
            .execute_kubectl(&[
                "get",
                "services",
                "-n",
                namespace,
                "-o",
                "json",
                REQUEST_TIMEOUT_ARG,
            ])
            .await?;

        let response: ServiceListResponse = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        let mut services = response.into_services(namespace);
        services.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(services)
    }

    /// Executes a kubectl command and returns the output.
    async fn execute_kubectl(&self, args: &[&str]) -> Result<String> {
        let mut command = self.kubectl_command()?;
        command.args(args);
        debug!(?args, "running kubectl");

        let result = timeout(KUBECTL_TIMEOUT, async {
            let output = command.output().await?;

            Ok::<_, std::io::Error>((output.status, output.stdout, output.stderr))
        })
        .await;

        match result {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    String::from_utf8(stdout)
                        .map_err(|e| KubectlError::ParsingFailed(e.to_string()))
                } else {
                    let stderr_str = String::from_utf8_lossy(&stderr);
                    Err(KubectlError::from_kubectl_error(&stderr_str))
                }
            }
            Ok(Err(e)) => Err(KubectlError::Io(e)),
            Err(_) => Err(KubectlError::Timeout),
        }
    }
}

impl TargetLister for KubernetesDiscovery {
    async fn list_targets(&self, namespace: &str, label_selector: &str) -> Result<Vec<Target>> {
        self.fetch_pods(namespace, label_selector).await
    }

    async fn get_target(&self, namespace: &str, name: &str) -> Result<Target> {
        self.fetch_pod(namespace, name).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<KubernetesService> {
        self.fetch_service(namespace, name).await
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<KubernetesService>> {
        self.fetch_services(namespace).await
    }
}

/// Finds kubectl in the well-known locations, then on `PATH`.
fn find_kubectl() -> Option<PathBuf> {
    find_executable(KUBECTL_PATHS).or_else(|| {
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join("kubectl"))
            .find(|candidate| candidate.is_file())
    })
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}
