//! Errors raised by kubectl-backed operations.

use thiserror::Error;

/// Result type alias for kubectl operations.
pub type Result<T> = std::result::Result<T, KubectlError>;

/// Stderr fragments that mean the cluster could not be reached at all.
const CLUSTER_UNREACHABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "no configuration has been provided",
    "dial tcp",
    "unable to connect to the server",
    "i/o timeout",
    "no such host",
];

/// Errors from invoking kubectl against the control plane.
#[derive(Error, Debug)]
pub enum KubectlError {
    /// kubectl binary could not be located.
    #[error("kubectl not found; install it or set kubectlPath in the config")]
    KubectlNotFound,

    /// kubectl did not answer in time.
    #[error("kubectl timed out")]
    Timeout,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The cluster could not be reached (network or kubeconfig problem).
    #[error("cluster not reachable: {0}")]
    ClusterNotConnected(String),

    /// kubectl exited with an error not covered above.
    #[error("kubectl failed: {0}")]
    CommandFailed(String),

    /// kubectl output could not be parsed.
    #[error("failed to parse kubectl output: {0}")]
    ParsingFailed(String),

    /// I/O error while running kubectl.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubectlError {
    /// Classifies kubectl stderr output into an error variant.
    pub fn from_kubectl_error(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        if CLUSTER_UNREACHABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::ClusterNotConnected(message)
        } else if lower.contains("(notfound)") || lower.contains("not found") {
            Self::NotFound(message)
        } else {
            Self::CommandFailed(message)
        }
    }

    /// Whether the error means the cluster itself is unreachable.
    pub fn is_cluster_not_connected(&self) -> bool {
        matches!(self, Self::ClusterNotConnected(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = KubectlError::from_kubectl_error(
            "Error from server (NotFound): pods \"api-0\" not found\n",
        );
        assert!(err.is_not_found());
        assert!(!err.is_cluster_not_connected());
    }

    #[test]
    fn test_other_errors_are_command_failures() {
        let err = KubectlError::from_kubectl_error("Error from server (Forbidden): pods is forbidden");
        assert!(matches!(err, KubectlError::CommandFailed(_)));
    }
}
