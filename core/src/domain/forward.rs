//! Forwarding domain models: options, per-attempt specs, and outcomes.

use std::time::Duration;

use super::{SelectorSpec, Target};
use crate::error::SessionError;

/// Immutable options for one invocation, built once before the first attempt.
///
/// The local port is fixed here and reused by every retry so the tunnel keeps
/// the same local address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOptions {
    pub selector: SelectorSpec,
    pub local_port: u16,
    pub remote_port: u16,
}

impl ForwardOptions {
    pub fn new(selector: SelectorSpec, local_port: u16, remote_port: u16) -> Self {
        Self {
            selector,
            local_port,
            remote_port,
        }
    }

    /// Pairs these options with the target chosen for one attempt.
    pub fn for_target(&self, target: Target) -> ForwardSpec {
        ForwardSpec {
            target,
            local_port: self.local_port,
            remote_port: self.remote_port,
        }
    }
}

/// One resolved target paired with its local and remote ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardSpec {
    pub target: Target,
    pub local_port: u16,
    pub remote_port: u16,
}

impl ForwardSpec {
    /// Returns the kubectl port mapping, e.g. "8080:80".
    pub fn port_mapping(&self) -> String {
        format!("{}:{}", self.local_port, self.remote_port)
    }

    /// Returns the local URL clients should use.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.local_port)
    }
}

/// Terminal state of one tunnel session attempt.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Stopped on operator request. The only outcome that is not retried.
    CleanStop,
    /// The tunnel came up and later failed.
    ReadyThenFailed(SessionError),
    /// The tunnel failed before it was ever ready.
    NeverReadyFailed(SessionError),
}

impl SessionOutcome {
    /// Consumes the outcome, returning the failure if there was one.
    pub fn into_error(self) -> Option<SessionError> {
        match self {
            Self::CleanStop => None,
            Self::ReadyThenFailed(err) | Self::NeverReadyFailed(err) => Some(err),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Progress notifications for the operator-facing UI.
#[derive(Debug, Clone)]
pub enum TunnelEvent {
    /// A target was chosen for the current attempt.
    TargetSelected { target: Target },
    /// The tunnel is established and listening locally.
    Ready { spec: ForwardSpec },
    /// An attempt failed and another will follow after `delay`.
    Retrying {
        attempt: u32,
        max_retries: u32,
        delay: Duration,
        reason: String,
    },
    /// The tunnel was stopped on operator request.
    Stopped,
}

impl TunnelEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TargetSelected { .. } => "target_selected",
            Self::Ready { .. } => "ready",
            Self::Retrying { .. } => "retrying",
            Self::Stopped => "stopped",
        }
    }
}
