//! Error types for the kbridge-core library.

use thiserror::Error;

use crate::kubernetes::errors::KubectlError;

/// Result type alias for kbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, selecting, and tunnelling to a target.
#[derive(Error, Debug)]
pub enum Error {
    /// Listing or fetching from the control plane failed.
    #[error("failed to resolve targets: {0}")]
    Resolution(#[from] KubectlError),

    /// The service fronts something other than pods (e.g. an external name).
    #[error("service {service} has no selector")]
    NoSelector { service: String },

    /// Resolution produced no usable targets.
    #[error("no pods found for {selector}")]
    NoTargets { selector: String },

    /// Candidates exist but none are running.
    #[error("no running pods found for {selector}")]
    NoRunningTargets { selector: String },

    /// No services exist to choose from.
    #[error("no services found in namespace {namespace}")]
    NoServices { namespace: String },

    /// The chosen service exposes no ports.
    #[error("service {service} has no ports defined")]
    NoPorts { service: String },

    /// The operator quit an interactive prompt.
    #[error("selection cancelled")]
    Cancelled,

    /// The tunnel failed during setup or while running.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Every retry failed; carries the last underlying cause.
    #[error("max retries ({max_retries}) exceeded, last error: {source}")]
    RetriesExhausted {
        max_retries: u32,
        #[source]
        source: Box<Error>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the operator explicitly opted out. Never retried, never a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure of one tunnel session, split by whether it ever became ready.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("port forward failed: {0}")]
    NeverReady(#[source] TransportError),

    #[error("port forward lost: {0}")]
    Lost(#[source] TransportError),
}

impl SessionError {
    pub fn transport(&self) -> &TransportError {
        match self {
            Self::NeverReady(err) | Self::Lost(err) => err,
        }
    }
}

/// Errors from the forwarding transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport could not be started.
    #[error("failed to start port-forward: {0}")]
    Spawn(String),

    /// The transport exited on its own.
    #[error("port-forward exited ({status}): {detail}")]
    Exited { status: String, detail: String },

    /// The local port is already taken by something else.
    #[error("local port {0} is already in use")]
    PortInUse(u16),

    /// The forwarding loop ended without reporting an error.
    #[error("port-forward closed unexpectedly")]
    Closed,

    /// The forwarding task panicked or was aborted.
    #[error("port-forward task aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_names_last_cause() {
        let err = Error::RetriesExhausted {
            max_retries: 5,
            source: Box::new(Error::NoRunningTargets {
                selector: "labels [app=foo] in namespace default".to_string(),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("max retries (5) exceeded"));
        assert!(message.contains("no running pods found"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_only_operator_quit_counts_as_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Session(SessionError::Lost(TransportError::Closed)).is_cancelled());
    }
}
